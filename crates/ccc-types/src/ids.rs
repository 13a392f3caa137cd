//! Catalyst Center object identifier helpers.

pub use uuid::Uuid;

/// Returns true if `s` is a hyphenated UUID as issued by Catalyst Center
/// for sites, devices, fabrics, and tasks.
pub fn is_valid_uuid(s: &str) -> bool {
    s.len() == 36 && Uuid::parse_str(s).is_ok()
}
