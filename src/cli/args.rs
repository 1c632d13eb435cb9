//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for framepilot-cli.

use clap::Parser;
use std::path::PathBuf;

/// Framepilot CLI - run the frame controller against a scripted or piped host
#[derive(Parser, Debug, Clone)]
#[command(name = "framepilot-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Scenario file (JSON) describing the simulated host session
    #[arg(conflicts_with = "stdio")]
    pub scenario: Option<PathBuf>,

    /// Speak the host wire protocol over stdin/stdout instead of simulating
    #[arg(long)]
    pub stdio: bool,

    /// Frame title (overrides settings and FRAMEPILOT_TITLE)
    #[arg(short = 't', long)]
    pub title: Option<String>,

    /// Seconds to wait for each host response (overrides settings)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip wallet provider discovery
    #[arg(long)]
    pub no_discovery: bool,

    /// Output events as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Only print the final frame state
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// Check the scenario path up front so errors point at the argument.
    pub fn resolve_scenario(&self) -> anyhow::Result<Option<PathBuf>> {
        let Some(path) = &self.scenario else {
            return Ok(None);
        };

        let canonical = path.canonicalize().map_err(|e| {
            anyhow::anyhow!(
                "Scenario '{}' does not exist or is not accessible: {}",
                path.display(),
                e
            )
        })?;

        if !canonical.is_file() {
            anyhow::bail!("Scenario '{}' is not a file", canonical.display());
        }

        Ok(Some(canonical))
    }
}
