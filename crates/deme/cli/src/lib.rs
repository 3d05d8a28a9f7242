//! DEME CLI - Command-line interface for judgment aggregation
//!
//! This CLI lets operators:
//! - List and inspect governance profiles
//! - Run the judges over a file of options
//! - Govern a decision and read its audit trail
//! - Check a decision against the transform catalog

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use deme_service::{DemeService, ServiceConfig};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{check, evaluate, profiles, transforms};
pub use output::OutputFormat;

/// DEME CLI application
#[derive(Parser)]
#[command(name = "deme")]
#[command(about = "DEME - judgment aggregation and invariance verification", long_about = None)]
#[command(version)]
struct Cli {
    /// Service configuration file (TOML)
    #[arg(short, long, env = "DEME_CONFIG")]
    config: Option<PathBuf>,

    /// Additional directory of profile documents (repeatable)
    #[arg(long = "profiles-dir", value_name = "DIR")]
    profiles_dirs: Vec<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table", global = true)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Inspect governance profiles
    Profiles {
        #[command(subcommand)]
        command: profiles::ProfileCommands,
    },

    /// List the transform catalog
    Transforms {
        /// Catalog document (TOML); the standard catalog when omitted
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Run every judge over the options
    Evaluate(OptionsArgs),

    /// Evaluate and govern a decision
    Decide(OptionsArgs),

    /// Check the decision against each transform in the catalog
    Check {
        #[command(flatten)]
        args: OptionsArgs,

        /// Catalog document (TOML); the standard catalog when omitted
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

/// Profile and options file shared by the decision commands
#[derive(Args, Debug, Clone)]
pub struct OptionsArgs {
    /// Governance profile id
    #[arg(short, long, default_value = "balanced")]
    pub profile: String,

    /// Options file: JSON or YAML list of fact records or option inputs
    pub options: PathBuf,
}

/// Run using the current process arguments.
pub async fn run() -> Result<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Logs go to stderr so machine-readable output stays clean.
    let filter = if cli.verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();

    let service = build_service(cli.config.as_ref(), &cli.profiles_dirs)?;

    match cli.command {
        Commands::Profiles { command } => profiles::execute(command, &service, cli.output),
        Commands::Transforms { catalog } => transforms::execute(catalog.as_deref(), cli.output),
        Commands::Evaluate(args) => evaluate::evaluate(&args, &service, cli.output).await,
        Commands::Decide(args) => evaluate::decide(&args, &service, cli.output).await,
        Commands::Check { args, catalog } => {
            check::execute(&args, catalog.as_deref(), &service, cli.output)
        }
    }
}

fn build_service(config: Option<&PathBuf>, extra_dirs: &[PathBuf]) -> Result<DemeService> {
    let mut config = match config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    config.profile_dirs.extend(extra_dirs.iter().cloned());
    debug!(
        profile_dirs = config.profile_dirs.len(),
        builtins = config.include_builtin_profiles,
        "starting service"
    );
    DemeService::from_config(config).context("starting service")
}
