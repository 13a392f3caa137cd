//! ccc-workflow - runs one declarative module against Catalyst Center
//!
//! Reads the module arguments from a YAML file, runs the named module and
//! prints its result as JSON. Exits non-zero when the result is failed.

use anyhow::{bail, Context};
use ccc_client::HttpClient;
use ccc_orch_common::{ModuleArgs, OrchError, RunContext, RunResult};
use ccc_workflows::registry;
use clap::Parser;
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{error, info, Level};

/// Declarative Catalyst Center workflow runner
#[derive(Parser, Debug)]
#[command(name = "ccc-workflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Module to run
    #[arg(short = 'm', long, required_unless_present = "list")]
    module: Option<String>,

    /// YAML file holding the module arguments
    #[arg(short = 'p', long, required_unless_present = "list")]
    params: Option<PathBuf>,

    /// List the available modules and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.list {
        for name in registry::names() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    let result = match run(&args).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Module could not start");
            let mut result = RunResult::default();
            result.record_error(&OrchError::invalid_input(format!("{:#}", e)));
            result
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("failed to encode result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if result.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(args: &Args) -> anyhow::Result<RunResult> {
    let (Some(name), Some(params)) = (&args.module, &args.params) else {
        bail!("--module and --params are required");
    };
    let module = registry::find(name)
        .with_context(|| format!("unknown module '{}' (known: {})", name, registry::names().join(", ")))?;

    let module_args = load_args(params)?;
    init_logging(&module_args)?;
    info!(module = name.as_str(), host = %module_args.host, "Starting module");

    let client = HttpClient::new(module_args.client_config()).context("building the Catalyst Center client")?;
    let mut ctx = RunContext::new(Arc::new(client), module_args);
    Ok(module.run(&mut ctx).await)
}

/// Reads, validates and decodes the module arguments.
fn load_args(path: &Path) -> anyhow::Result<ModuleArgs> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc: Value = serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let (validated, invalid) = ModuleArgs::common_spec().validate(&[doc]);
    if !invalid.is_empty() {
        bail!("{}", invalid.join("; "));
    }
    let Some(doc) = validated.into_iter().next() else {
        bail!("{} holds no arguments", path.display());
    };
    Ok(ModuleArgs::from_value(doc)?)
}

/// Installs the subscriber. Without `log` only warnings and errors reach
/// stderr; with it, events at `log_level` go to `log_file_path`.
fn init_logging(args: &ModuleArgs) -> anyhow::Result<()> {
    if !args.log {
        tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(args.log_append)
        .truncate(!args.log_append)
        .open(&args.log_file_path)
        .with_context(|| format!("opening log file {}", args.log_file_path))?;
    tracing_subscriber::fmt()
        .with_max_level(args.log_level.as_tracing_level())
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
