//! Concrete generator modules.

pub mod sda_fabric_virtual_networks;

use crate::generator::PlaybookGenerator;

/// Every generator module shipped with the crate.
pub fn generators() -> Vec<PlaybookGenerator> {
    vec![PlaybookGenerator::new(sda_fabric_virtual_networks::catalog())]
}
