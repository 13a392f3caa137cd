//! Layer 3 virtual networks and anycast gateways on SDA fabrics.
//!
//! One config block may carry both object kinds:
//!
//! ```yaml
//! config:
//! - virtual_networks:
//!   - vn_name: VN_CORP
//!     fabric_site_locations:
//!     - site_name_hierarchy: Global/USA/SJC
//!       fabric_type: fabric_site
//!   anycast_gateways:
//!   - vn_name: VN_CORP
//!     fabric_site_location:
//!       site_name_hierarchy: Global/USA/SJC
//!     ip_pool_name: POOL_1
//!     vlan_name: VLAN_1021
//! ```
//!
//! `merged` adds virtual networks before gateways; `deleted` removes
//! gateways first. A virtual network named under `deleted` with
//! locations only leaves those fabric sites; without locations it is
//! deleted outright. Gateway attributes fixed at creation (VLAN, traffic
//! type, pool type, critical pool) are checked for every gateway before
//! anything is changed.
//!
//! The `sda_fabric_virtual_networks_playbook_generator` output is a valid
//! block for this module.

mod types;
mod workflow;

pub use types::{
    AnycastGatewayRecord, AnycastGatewayWant, ChangeSummary, FabricLocation, FabricVnHave, FabricVnWant,
    VirtualNetworkRecord, VirtualNetworkWant, GATEWAY_IMMUTABLE_FIELDS, GATEWAY_MUTABLE_FIELDS,
};
pub use workflow::{schema, FabricVirtualNetworks, MODULE_NAME};
