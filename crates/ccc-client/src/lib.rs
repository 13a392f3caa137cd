//! Catalyst Center REST client contract.
//!
//! The orchestration core never builds URLs itself. It talks to the
//! controller through the [`CccApi`] trait, which exposes exactly the three
//! capabilities the workflows need:
//!
//! - [`CccApi::invoke`]: a synchronous REST call addressed by SDK-style
//!   `(family, function)` names
//! - [`CccApi::get_task_details`]: the legacy `/task/{id}` polling shape
//! - [`CccApi::get_tasks_by_id`]: the newer `/tasks/{id}` polling shape
//!
//! # Architecture
//!
//! - [`types`]: narrow response DTOs (task handles, task details, task records)
//! - [`error`]: transport, HTTP, and decode errors
//! - [`api`]: the trait plus the reqwest-backed [`HttpClient`]
//!
//! # Example
//!
//! ```ignore
//! use ccc_client::{CccApi, ClientConfig, HttpClient};
//! use serde_json::json;
//!
//! let client = HttpClient::new(ClientConfig::new("10.0.0.10", "admin", "secret"))?;
//! let sites = client
//!     .invoke("site_design", "get_sites", &json!({"nameHierarchy": "Global/USA"}), false)
//!     .await?;
//! ```

pub mod api;
pub mod error;
pub mod types;

pub use api::{CccApi, ClientConfig, HttpClient, Route, RouteTable};
pub use error::{CccError, CccResult};
pub use types::{TaskDetails, TaskId, TaskRecord, TaskRecordStatus};
