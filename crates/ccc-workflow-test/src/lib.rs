//! Test infrastructure for Catalyst Center workflows
//!
//! Provides:
//! - [`MockCcc`]: a scripted controller with a call log
//! - Fixture builders for devices, sites and fabrics
//! - Run helpers wiring the mock and a virtual clock into a [`RunContext`]
//! - Verification helpers over calls and results
//!
//! [`RunContext`]: ccc_orch_common::RunContext

pub mod fixtures;
mod mock;
mod verification;

pub use fixtures::*;
pub use mock::{MockCcc, RecordedCall, TaskScript};
pub use verification::*;
