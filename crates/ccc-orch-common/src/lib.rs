//! Declarative orchestration core for Catalyst Center workflows.
//!
//! Every workflow module is built from the same parts:
//!
//! - [`schema`]: the block validator (`validate -> (validated, invalid_params)`)
//! - [`Workflow`]: the `get_want -> get_have -> get_diff -> verify_diff` stages
//! - [`WorkflowRunner`]: drives those stages and assembles the [`RunResult`]
//! - [`TaskPoller`]: bounded polling of controller task handles
//! - [`BatchDriver`]: device-list operations split into retried batches
//! - [`paginate`]: offset/limit iteration over list endpoints
//! - [`Lookups`]: per-run site, device and fabric resolution
//!
//! # Example
//!
//! ```ignore
//! use ccc_orch_common::{ModuleRunner, RunContext, WorkflowRunner};
//!
//! let runner = WorkflowRunner::new(MyWorkflow::new());
//! let mut ctx = RunContext::new(client, args);
//! let result = runner.run(&mut ctx).await;
//! println!("{}", serde_json::to_string(&result)?);
//! ```

pub mod audit;
pub mod batch;
pub mod clock;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod lookup;
pub mod paginate;
pub mod result;
pub mod runner;
pub mod schema;
pub mod task;
pub mod workflow;

pub use audit::{AuditCategory, AuditOutcome, AuditRecord};
pub use batch::{BatchDescriptor, BatchDriver, BatchOperation, BatchReport};
pub use clock::{Clock, TokioClock, VirtualClock};
pub use config::{LogLevel, ModuleArgs};
pub use context::RunContext;
pub use diff::{changed_fields, drop_nulls, requires_update, values_equal};
pub use error::{ErrorKind, OrchError, OrchResult};
pub use lookup::{DeviceInfo, DeviceQuery, FabricInfo, FabricType, Lookups, SiteInfo};
pub use paginate::{paginate, PageOptions};
pub use result::{RunResult, RunStatus};
pub use runner::{ModuleRunner, WorkflowRunner};
pub use schema::{validate, ArgSpec, FieldSpec, FieldType, Format, SchemaError, NO_LOG_PLACEHOLDER};
pub use task::{PollFlavour, PollSettings, PredicateTable, TaskOutcome, TaskPoller, TaskState};
pub use workflow::{ModuleDescriptor, State, Workflow};
