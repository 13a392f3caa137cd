//! Declarative Catalyst Center workflow modules
//!
//! Each module turns a list of config blocks into controller calls through
//! the shared pipeline in `ccc_orch_common`:
//!
//! ```text
//! [config] ──> validate ──> version gate ──> per block: want ──> have ──> diff ──> [verify]
//! ```
//!
//! # Modules
//!
//! - [`ise_radius_integration`]: AAA and Cisco ISE servers (`merged`, `deleted`)
//! - [`network_compliance`]: batched compliance runs (`merged`)
//! - [`rma`]: faulty device replacement (`replaced`)
//! - [`sda_fabric_virtual_networks`]: layer 3 virtual networks and anycast
//!   gateways (`merged`, `deleted`)
//!
//! The brownfield generators from `ccc_playbook_gen` are registered next to
//! them in [`registry`].

pub mod ise_radius_integration;
pub mod network_compliance;
pub mod registry;
pub mod rma;
pub mod sda_fabric_virtual_networks;
