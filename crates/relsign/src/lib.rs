//! # relsign
//!
//! Detached OpenPGP signatures for release artifacts.
//!
//! This crate provides both the `relsign` binary and a library exposing its
//! CLI structure and logging setup. The signing pipeline itself lives in
//! `relsign-crypto`.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions and handlers
//! - [`logging`] - `tracing` subscriber setup
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use relsign::cli::Cli;
//!
//! let cli = Cli::parse();
//! println!("Verbose level: {}", cli.verbose);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod logging;

pub use logging::{
    init_logging, log_security_event, new_correlation_id, redact_sensitive, verbosity_to_level,
    LogConfig, LogError, LogFormat, LogGuard, LogLevel,
};
