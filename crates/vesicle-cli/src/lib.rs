//! Shared plumbing for the four stage binaries.
//!
//! Each binary takes the job parameter file as its only positional
//! argument, runs one stage from `vesicle-io`, and exits non-zero only
//! when the stage could not start (bad parameters, unreadable input
//! directory). Per-micrograph failures are logged by the stage and do
//! not change the exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use vesicle_io::{CancelToken, Config, RunOptions, StageReport};

/// Arguments every stage accepts.
#[derive(Debug, Args)]
pub struct Common {
    /// Path to the job parameter file (INI).
    pub parameters: PathBuf,

    /// Recompute micrographs whose output already exists.
    #[arg(long)]
    pub force: bool,
}

impl Common {
    /// Load and validate the parameter file.
    ///
    /// # Errors
    ///
    /// Returns the underlying `ConfigError` with the file path attached.
    pub fn load(&self) -> anyhow::Result<Config> {
        Config::load(&self.parameters)
            .with_context(|| format!("invalid parameters in {}", self.parameters.display()))
    }

    /// Run options with a Ctrl-C handler wired to the cancel token.
    ///
    /// An interrupt lets running micrographs finish and starts no new
    /// ones.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        let cancel = CancelToken::new();
        let on_interrupt = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            log::warn!("interrupted, waiting for running micrographs to finish");
            on_interrupt.cancel();
        }) {
            log::warn!("cannot install interrupt handler: {e}");
        }
        RunOptions {
            force: self.force,
            cancel,
        }
    }
}

/// Initialize `env_logger` from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Map a stage result to the process exit code.
#[must_use]
pub fn finish(result: anyhow::Result<StageReport>) -> ExitCode {
    match result {
        Ok(report) => {
            if report.cancelled > 0 {
                log::warn!("{} micrographs not started", report.cancelled);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
