//! The workflow trait and module descriptor.

use crate::context::RunContext;
use crate::error::{OrchError, OrchResult};
use crate::schema::ArgSpec;
use async_trait::async_trait;
use ccc_types::CccVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Desired-state mode of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Merged,
    Deleted,
    Replaced,
    Query,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Merged => "merged",
            State::Deleted => "deleted",
            State::Replaced => "replaced",
            State::Query => "query",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = OrchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merged" => Ok(State::Merged),
            "deleted" => Ok(State::Deleted),
            "replaced" => Ok(State::Replaced),
            "query" => Ok(State::Query),
            other => Err(OrchError::invalid_input(format!("state: unknown state '{}'", other))),
        }
    }
}

/// Static description of a workflow module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: &'static str,
    /// Supported states; the first is the default.
    pub states: Vec<State>,
    /// Schema of one config block.
    pub schema: ArgSpec,
    pub min_version: CccVersion,
}

impl ModuleDescriptor {
    pub fn new(name: &'static str, states: Vec<State>, schema: ArgSpec, min_version: CccVersion) -> Self {
        Self {
            name,
            states,
            schema,
            min_version,
        }
    }

    pub fn default_state(&self) -> Option<State> {
        self.states.first().copied()
    }

    pub fn supports(&self, state: State) -> bool {
        self.states.contains(&state)
    }
}

/// A declarative workflow: translate a config block into desired state,
/// fetch current state, and converge.
///
/// The runner calls, per block:
///
/// ```text
/// get_want -> get_have -> get_diff(state) -> [get_have -> verify_diff(state)]
/// ```
///
/// The bracketed stages run only with `config_verify`. Any `Err` stops the
/// run; nothing after it executes.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Desired state for one block, in controller terms.
    type Want: Send + Sync;
    /// Current controller state relevant to a `Want`.
    type Have: Send + Sync;

    fn descriptor(&self) -> &ModuleDescriptor;

    fn name(&self) -> &str {
        self.descriptor().name
    }

    /// Translates a validated block; performs cross-field checks.
    async fn get_want(&self, ctx: &mut RunContext, block: &Value, state: State) -> OrchResult<Self::Want>;

    async fn get_have(&self, ctx: &mut RunContext, want: &Self::Want, state: State) -> OrchResult<Self::Have>;

    async fn get_diff_merged(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Err(self.unsupported(State::Merged))
    }

    async fn get_diff_deleted(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Err(self.unsupported(State::Deleted))
    }

    async fn get_diff_replaced(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Err(self.unsupported(State::Replaced))
    }

    async fn get_diff_query(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Err(self.unsupported(State::Query))
    }

    async fn verify_diff_merged(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Ok(())
    }

    async fn verify_diff_deleted(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Ok(())
    }

    async fn verify_diff_replaced(&self, _ctx: &mut RunContext, _want: &Self::Want, _have: &Self::Have) -> OrchResult<()> {
        Ok(())
    }

    async fn get_diff(&self, ctx: &mut RunContext, state: State, want: &Self::Want, have: &Self::Have) -> OrchResult<()> {
        match state {
            State::Merged => self.get_diff_merged(ctx, want, have).await,
            State::Deleted => self.get_diff_deleted(ctx, want, have).await,
            State::Replaced => self.get_diff_replaced(ctx, want, have).await,
            State::Query => self.get_diff_query(ctx, want, have).await,
        }
    }

    async fn verify_diff(&self, ctx: &mut RunContext, state: State, want: &Self::Want, have: &Self::Have) -> OrchResult<()> {
        match state {
            State::Merged => self.verify_diff_merged(ctx, want, have).await,
            State::Deleted => self.verify_diff_deleted(ctx, want, have).await,
            State::Replaced => self.verify_diff_replaced(ctx, want, have).await,
            State::Query => Ok(()),
        }
    }

    fn unsupported(&self, state: State) -> OrchError {
        OrchError::internal(format!("{} does not implement state '{}'", self.name(), state))
    }
}
