//! Drives a [`Workflow`] through its stages and assembles the result.

use crate::context::RunContext;
use crate::error::{OrchError, OrchResult};
use crate::result::{RunResult, RunStatus};
use crate::workflow::{ModuleDescriptor, State, Workflow};
use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;
use tracing::{error, info, instrument};

/// A module as the host sees it: a descriptor and a run entry point.
#[async_trait]
pub trait ModuleRunner: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Runs every config block and returns the structured result.
    ///
    /// Never returns an error: failures are folded into the result.
    async fn run(&self, ctx: &mut RunContext) -> RunResult;
}

/// Runs one workflow.
///
/// Order: argument checks, block schema validation, version gate, then
/// each config block in turn. The first error ends the run.
pub struct WorkflowRunner<W> {
    workflow: W,
}

impl<W: Workflow> WorkflowRunner<W> {
    pub fn new(workflow: W) -> Self {
        Self { workflow }
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    async fn execute(&self, ctx: &mut RunContext) -> OrchResult<()> {
        let state = self.check_arguments(ctx)?;
        let blocks = self.validate_input(ctx)?;
        self.check_version(ctx).await?;

        for (index, block) in blocks.iter().enumerate() {
            info!(block = index, state = %state, "Processing config block");
            let want = self.workflow.get_want(ctx, block, state).await?;
            let have = self.workflow.get_have(ctx, &want, state).await?;
            self.workflow.get_diff(ctx, state, &want, &have).await?;

            if ctx.args.config_verify && state != State::Query {
                info!(block = index, "Verifying applied configuration");
                let have = self.workflow.get_have(ctx, &want, state).await?;
                self.workflow.verify_diff(ctx, state, &want, &have).await?;
            }
        }
        Ok(())
    }

    /// Resolves `state` and rejects an empty `config`.
    fn check_arguments(&self, ctx: &RunContext) -> OrchResult<State> {
        let desc = self.workflow.descriptor();
        let state = match ctx.args.state.as_deref() {
            Some(raw) => raw.parse::<State>()?,
            None => desc
                .default_state()
                .ok_or_else(|| OrchError::internal(format!("{} declares no states", desc.name)))?,
        };
        if !desc.supports(state) {
            return Err(OrchError::invalid_input(format!(
                "state: value '{}' is not one of [{}]",
                state,
                desc.states.iter().map(State::as_str).join(", ")
            )));
        }
        if ctx.args.config.is_empty() {
            return Err(OrchError::invalid_input("config: missing required parameter"));
        }
        Ok(state)
    }

    fn validate_input(&self, ctx: &mut RunContext) -> OrchResult<Vec<Value>> {
        let schema = &self.workflow.descriptor().schema;
        schema.check()?;
        let (validated, invalid) = schema.validate(&ctx.args.config);
        if !invalid.is_empty() {
            return Err(OrchError::invalid_input(invalid.join("; ")));
        }
        info!(blocks = validated.len(), "Configuration validated");
        ctx.validated_config = validated.clone();
        Ok(validated)
    }

    async fn check_version(&self, ctx: &mut RunContext) -> OrchResult<()> {
        let desc = self.workflow.descriptor();
        let actual = ctx.probe_version().await?;
        if actual < desc.min_version {
            return Err(OrchError::VersionUnsupported {
                module: desc.name.to_string(),
                required: desc.min_version.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<W: Workflow> ModuleRunner for WorkflowRunner<W> {
    fn descriptor(&self) -> &ModuleDescriptor {
        self.workflow.descriptor()
    }

    #[instrument(skip_all, fields(module = self.workflow.name()))]
    async fn run(&self, ctx: &mut RunContext) -> RunResult {
        let desc = self.workflow.descriptor();
        ctx.bind_module(desc.name, &desc.schema);

        match self.execute(ctx).await {
            Ok(()) => {
                ctx.status = if ctx.result.changed {
                    RunStatus::Success
                } else {
                    RunStatus::Ok
                };
                if ctx.result.msg_text().is_empty() {
                    let msg = if ctx.result.changed {
                        "Changes applied successfully"
                    } else {
                        "Catalyst Center is already in the desired state"
                    };
                    ctx.result.set_msg(msg);
                }
                ctx.msg = ctx.result.msg_text();
                info!(status = %ctx.status, changed = ctx.result.changed, "Run finished");
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Run failed");
                ctx.fail(&e);
            }
        }
        ctx.result.clone()
    }
}
