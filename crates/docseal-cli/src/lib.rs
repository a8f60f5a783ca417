//! # docseal-cli
//!
//! Offline operator tooling. Each subcommand module exposes an `Args`
//! struct for clap and a `run_*` function returning the process exit code.

pub mod inspect;
pub mod keys;
