//! AAA and Cisco ISE authentication and policy servers.
//!
//! ```yaml
//! config:
//! - authentication_policy_server:
//!   - server_type: ISE
//!     server_ip_address: 10.0.0.2
//!     shared_secret: "..."
//!     role: primary
//!     cisco_ise_dtos:
//!     - user_name: admin
//!       password: "..."
//!       fqdn: ise.example.com
//!       ip_address: 10.0.0.2
//!       subscriber_name: pxgrid_client
//! ```
//!
//! Servers are matched by IP address. The server type, encryption
//! scheme, ports and role of an existing server cannot change. Secrets
//! are never returned by the controller, so a change to `shared_secret`
//! alone does not trigger an update. A new ISE server is polled until its integration is
//! active, accepting the server certificate when `trusted_server` is set.

mod types;
mod workflow;

pub use types::{
    AuthServerRecord, AuthServerWant, ServerChange, ServerType, ISE_DTO_FIELDS, ISE_PAYLOAD_FIELDS,
    SERVER_COMPARE_FIELDS, SERVER_IMMUTABLE_FIELDS, SERVER_PAYLOAD_FIELDS,
};
pub use workflow::{schema, IseRadiusIntegration, MODULE_NAME};
