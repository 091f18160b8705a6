//! # mschema CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mschema_cli::check::{run_check, CheckArgs};
use mschema_cli::compile::{run_compile, CompileArgs};
use mschema_cli::config::CliConfig;

/// Exit code for load, config, and schema compilation failures.
const EXIT_ERROR: u8 = 2;

/// Check YAML and JSON documents against declarative shape schemas.
#[derive(Parser, Debug)]
#[command(name = "mschema", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file with named predicates and types.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match a data document against a schema.
    Check(CheckArgs),

    /// Compile a schema and report schema errors.
    Compile(CompileArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "mschema CLI starting");

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Check(args) => run_check(args, &config),
        Commands::Compile(args) => run_compile(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
