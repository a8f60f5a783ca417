//! # docseal CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docseal_cli::inspect::{run_inspect, InspectArgs};
use docseal_cli::keys::{
    run_check_signature, run_keygen, run_sign, CheckSignatureArgs, KeygenArgs, SignArgs,
};

/// docseal operator tooling: keys, signatures and artifact marks.
#[derive(Parser, Debug)]
#[command(name = "docseal", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an RSA signing key pair.
    Keygen(KeygenArgs),

    /// Print the signature the server would record for a file.
    Sign(SignArgs),

    /// Check a recorded signature against the original file.
    CheckSignature(CheckSignatureArgs),

    /// Print the identifier and signature embedded in a signed artifact.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Sign(args) => run_sign(args),
        Commands::CheckSignature(args) => run_check_signature(args),
        Commands::Inspect(args) => run_inspect(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
