//! # CLI Module
//!
//! Command-line interface for relsign.
//!
//! ## Module Structure
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//! - [`passphrase`] - Passphrase sources for the signing key
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use relsign::cli::{Cli, Commands};
//!
//! let cli = Cli::parse();
//!
//! match cli.command {
//!     Commands::Sign(args) => {
//!         // Handle sign command
//!     }
//!     Commands::Config { action } => {
//!         // Handle config command
//!     }
//! }
//! ```

pub mod args;
pub mod commands;
pub mod passphrase;

pub use args::{Cli, Commands, ConfigAction, DigestArg, SignArgs};
