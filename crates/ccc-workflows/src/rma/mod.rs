//! Return material authorization for a failed device.
//!
//! ```yaml
//! state: replaced
//! config:
//! - faulty_device_ip_address: 10.0.0.1
//!   replacement_device_serial_number: FOC2345X0AB
//! ```
//!
//! The faulty device is found in the inventory by name, IP address or
//! serial number; the replacement must be waiting in Plug and Play and
//! share the faulty device's platform. The device is marked for
//! replacement, polled until `READY-FOR-REPLACEMENT`, and the replacement
//! workflow deployed. When readiness or deployment fails outright after
//! this run marked the device, the mark is released again. A device whose
//! replacement already completed is left alone.

mod types;
mod workflow;

pub use types::{PnpDevice, ReplacementRecord, ReplacementStatus, RmaHave, RmaOutcome, RmaWant};
pub use workflow::{schema, Rma, MODULE_NAME};
