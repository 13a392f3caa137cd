//! VLAN ID type with fabric validation rules.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// VLAN identifier accepted for a fabric anycast gateway.
///
/// Catalyst Center reserves VLAN 1, VLAN 4094, and the legacy
/// token-ring/FDDI range 1002-1005, so the usable range is 2-4093
/// minus that block.
///
/// # Examples
///
/// ```
/// use ccc_types::VlanId;
///
/// let vlan = VlanId::new(100).unwrap();
/// assert_eq!(vlan.as_u16(), 100);
///
/// assert!(VlanId::new(1).is_err());
/// assert!(VlanId::new(1003).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    /// Minimum valid VLAN ID.
    pub const MIN: u16 = 2;

    /// Maximum valid VLAN ID.
    pub const MAX: u16 = 4093;

    /// Reserved legacy range.
    pub const RESERVED: std::ops::RangeInclusive<u16> = 1002..=1005;

    /// Creates a new VLAN ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the VLAN ID is outside 2-4093 or inside 1002-1005.
    pub fn new(id: u16) -> Result<Self, ParseError> {
        if (Self::MIN..=Self::MAX).contains(&id) && !Self::RESERVED.contains(&id) {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id))
        }
    }

    /// Returns the VLAN ID as a u16.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u16 = s.trim().parse().map_err(|_| ParseError::InvalidVlanId(0))?;
        VlanId::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}
