//! Common Catalyst Center types for declarative workflow orchestration.
//!
//! This crate provides type-safe representations of the primitives that
//! every workflow module and the orchestration core pass around:
//!
//! - [`CccVersion`]: dotted controller release numbers with numeric ordering
//! - [`parse_management_ip`]: IPv4 and IPv6 management addresses
//! - [`Uuid`] helpers: identifier validation for CCC object ids
//! - [`SiteHierarchy`]: `Global/Area/Building/Floor` site names
//! - [`VlanId`]: VLAN identifiers accepted by fabric anycast gateways

mod ids;
mod ip;
mod site;
mod version;
mod vlan;

pub use ids::{is_valid_uuid, Uuid};
pub use ip::{is_valid_ip, is_valid_ipv4, is_valid_ipv6, parse_management_ip};
pub use site::SiteHierarchy;
pub use version::{compare_versions, CccVersion, VersionRange};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid controller version: {0}")]
    InvalidVersion(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("invalid site hierarchy: {0}")]
    InvalidSiteHierarchy(String),

    #[error("invalid VLAN ID: {0} (must be 2-4093, excluding 1002-1005)")]
    InvalidVlanId(u16),
}
