//! Entry point for MaskRCNN training jobs.
//!
//! The launcher picks the training script from the harness-provided framework
//! parameters, extends the interpreter's module search path with the MaskRCNN
//! sources, and runs the interpreter with every argument it was given. Its
//! own exit code is the training process's exit code.
//!
//! Standard output carries a single `entry point cmd is ...` line before the
//! training process starts; diagnostics go to stderr through `tracing`.

pub mod config;
pub mod environment;
mod error;
pub mod launch;
pub mod training_entry;

use std::ffi::OsString;

pub use config::LauncherConfig;
pub use environment::LaunchEnvironment;
pub use error::LaunchError;
pub use error::Result;
pub use launch::LaunchPlan;
pub use training_entry::TrainingEntry;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Runs the launcher against the current process environment.
pub fn run_main<I>(forwarded: I) -> Result<i32>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    run_with_env(&LaunchEnvironment::capture(), forwarded)
}

/// Resolves config, prints the command line, and (unless this is a dry run)
/// runs the training process to completion. Returns the exit code to report.
pub fn run_with_env<I>(env: &LaunchEnvironment, forwarded: I) -> Result<i32>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let config = LauncherConfig::load(env)?;
    let plan = LaunchPlan::build(&config, env, forwarded)?;
    info!(
        entry = %plan.entry,
        interpreter = %config.interpreter.display(),
        "selected training entry point"
    );

    print_command(&plan);

    if config.dry_run {
        info!("dry run requested; not starting the training process");
        return Ok(0);
    }

    let status = launch::run(&plan)?;
    if !status.success() {
        warn!(%status, "training process exited unsuccessfully");
    }
    Ok(launch::exit_code(status))
}

#[allow(clippy::print_stdout)]
fn print_command(plan: &LaunchPlan) {
    println!("entry point cmd is {}", plan.display_command());
}
