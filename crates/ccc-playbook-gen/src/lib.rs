//! Brownfield playbook generation.
//!
//! A generator reads the current Catalyst Center configuration of one
//! domain and writes it out as a playbook that the matching workflow module
//! replays under `state: merged` without changes. This is how an existing
//! deployment is captured for disaster recovery or copied to another
//! controller.
//!
//! # Architecture
//!
//! ```text
//! request ──► filters ──► Component::fetch ──► global filters
//!                                   │
//!            ResolutionTable ───────┤ (prefetched once)
//!                                   ▼
//!                             TempSpec::apply ──► emit (YAML)
//! ```
//!
//! - [`filters`]: request schema derived from the catalog, filter selection
//! - [`component`]: the [`Component`] trait and fetch helpers
//! - [`temp_spec`]: declarative remapping with named transforms
//! - [`resolve`]: fabric id to site name resolution
//! - [`emit`]: YAML rendering and file output
//! - [`generator`]: [`PlaybookGenerator`], a [`Workflow`](ccc_orch_common::Workflow)
//! - [`catalog`]: the shipped generator modules

pub mod catalog;
pub mod component;
pub mod emit;
pub mod filters;
pub mod generator;
pub mod resolve;
pub mod temp_spec;

pub use component::{fetch_all, query_params, Component};
pub use emit::{default_file_name, render_yaml, write_playbook};
pub use filters::{request_spec, GenerationRequest};
pub use generator::{playbook_document, Catalog, PlaybookGenerator, RenderedComponent};
pub use resolve::{ResolutionTable, ResolvedFabric};
pub use temp_spec::{NamedTransform, TempField, TempSpec, TempType};
