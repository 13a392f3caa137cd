//! Management address parsing for `ip_address` style playbook fields.

use crate::ParseError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Parses a device management address. Surrounding whitespace is ignored;
/// anything with a colon is read as IPv6.
pub fn parse_management_ip(s: &str) -> Result<IpAddr, ParseError> {
    let s = s.trim();
    let parsed = if s.contains(':') {
        s.parse::<Ipv6Addr>().map(IpAddr::V6)
    } else {
        s.parse::<Ipv4Addr>().map(IpAddr::V4)
    };
    parsed.map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
}

/// Dotted-quad IPv4 only.
pub fn is_valid_ipv4(s: &str) -> bool {
    matches!(parse_management_ip(s), Ok(IpAddr::V4(_)))
}

pub fn is_valid_ipv6(s: &str) -> bool {
    matches!(parse_management_ip(s), Ok(IpAddr::V6(_)))
}

pub fn is_valid_ip(s: &str) -> bool {
    parse_management_ip(s).is_ok()
}
