//! `svcload` CLI subcommands.
//!
//! Provides `run` (execute a load test), `init` (generate starter config)
//! and `profiles` (list the built-in user classes).

mod init;
mod profiles;
mod run;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use svcload::profiles::Profile;

/// Load test commands for the e-commerce services.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test against a service or the API gateway
    ///
    /// Uses .svcload/loadtest.toml (or a custom config path), or just a
    /// built-in profile when no config exists. Reports results to the
    /// terminal and writes a JSON report to .svcload/reports/.
    Run(RunArgs),

    /// Generate a starter loadtest config file
    ///
    /// Creates .svcload/loadtest.toml. With --profile the file runs that
    /// built-in profile, otherwise it lists gateway steps to edit.
    Init {
        /// Built-in profile the config should run
        #[arg(long, value_enum)]
        profile: Option<Profile>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// List the built-in profiles and their scenarios
    Profiles,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Target base URL, e.g. http://localhost:8080
    pub url: String,

    /// Path to config file (default: auto-discover .svcload/loadtest.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Built-in profile to run (overrides config)
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,

    /// Number of virtual users (overrides config)
    #[arg(long)]
    pub vus: Option<u32>,

    /// Test duration in seconds (overrides config)
    #[arg(long)]
    pub duration: Option<u64>,

    /// Ramp-up period in seconds (overrides config)
    #[arg(long)]
    pub ramp_up: Option<u64>,

    /// Total scenario executions before the run stops
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Seed for reproducible scenario selection (overrides config)
    #[arg(long, env = "SVCLOAD_SEED")]
    pub seed: Option<u64>,

    /// Disable JSON report output
    #[arg(long)]
    pub no_report: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Command {
    /// Execute the selected subcommand.
    pub fn execute(self) -> Result<()> {
        match self {
            Command::Run(args) => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(args))
            },
            Command::Init { profile, force } => {
                let cwd = std::env::current_dir()?;
                init::execute_init(&cwd, profile, force)
            },
            Command::Profiles => {
                profiles::execute_profiles();
                Ok(())
            },
        }
    }
}
