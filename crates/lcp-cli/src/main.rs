//! # lcp CLI entry point
//!
//! Parses arguments, installs logging, loads configuration and dispatches
//! to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use lcp_cli::compliance::{run_compliance, ComplianceArgs};
use lcp_cli::config::Config;
use lcp_cli::encrypt::{run_encrypt, EncryptArgs};
use lcp_cli::license::{
    run_canonicalize, run_sign, run_verify, CanonicalizeArgs, SignArgs, VerifyArgs,
};
use lcp_cli::logging;
use lcp_cli::status::{run_status, StatusArgs};

/// License server core toolchain.
///
/// Encrypts publications, signs and verifies licenses, and administers
/// license statuses.
#[derive(Parser, Debug)]
#[command(name = "lcp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to the YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt publication packages.
    Encrypt(EncryptArgs),

    /// Print the canonical form of a JSON document.
    Canonicalize(CanonicalizeArgs),

    /// Sign a license document.
    Sign(SignArgs),

    /// Verify the signature of a license document.
    Verify(VerifyArgs),

    /// License status administration.
    Status(StatusArgs),

    /// Report compliance test progress to the status server.
    Compliance(ComplianceArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{e}");
                return ExitCode::from(1);
            }
        },
        None => Config::default(),
    };

    let result = match &cli.command {
        Commands::Encrypt(args) => run_encrypt(args, &config).await,
        Commands::Canonicalize(args) => run_canonicalize(args),
        Commands::Sign(args) => run_sign(args, &config),
        Commands::Verify(args) => run_verify(args, &config),
        Commands::Status(args) => run_status(args, &config).await,
        Commands::Compliance(args) => run_compliance(args, &config).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
