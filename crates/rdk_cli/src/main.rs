//! Kinematogram CLI
//!
//! Run trials headless, validate configurations, print JSON schemas.

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use rdk_cli::RunOverrides;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "rdk")]
#[command(about = "Run and validate kinematogram trials", long_about = None)]
struct Cli {
    /// Debug-level log output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Run a trial on a virtual clock and write the result
    Run {
        /// Trial request or bare configuration (JSON)
        #[arg(long)]
        r#in: PathBuf,

        /// Output JSON file path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Scripted key press as KEY@MS, repeatable
        #[arg(long = "key")]
        keys: Vec<String>,

        /// Display refresh rate in Hz
        #[arg(long)]
        refresh_hz: Option<f64>,

        /// Hard stop for trials without a duration
        #[arg(long)]
        max_duration_ms: Option<f64>,

        /// Include every rendered frame in the output
        #[arg(long, default_value = "false")]
        frames: bool,
    },

    /// Validate a configuration and print its resolved form
    Validate {
        /// Trial request or bare configuration (JSON)
        #[arg(long)]
        r#in: PathBuf,
    },

    /// Print the JSON schema for configurations
    Schema {
        /// Schema for the full run request instead of the bare configuration
        #[arg(long, default_value = "false")]
        request: bool,

        /// Output JSON file path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { r#in, out, keys, refresh_hz, max_duration_ms, frames } => {
            let keys = keys.iter().map(|k| rdk_cli::parse_key_spec(k)).collect::<Result<_>>()?;
            let overrides =
                RunOverrides { keys, refresh_hz, max_duration_ms, include_frames: frames };
            let output = rdk_cli::run_file(&r#in, overrides)?;
            rdk_cli::write_json(out.as_deref(), &output)?;
        }

        Commands::Validate { r#in } => {
            let resolved = rdk_cli::validate_file(&r#in)?;
            tracing::info!(
                apertures = resolved.apertures.len(),
                seed = resolved.seed,
                "configuration is valid"
            );
            rdk_cli::write_json(None, &resolved)?;
        }

        Commands::Schema { request, out } => {
            let schema = if request {
                rdk_core::trial_request_schema()
            } else {
                rdk_core::trial_config_schema()
            };
            rdk_cli::write_json(out.as_deref(), &schema)?;
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("rdk CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
