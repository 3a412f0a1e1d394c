//! # CLI Command Handlers
//!
//! ## Module Structure
//!
//! - [`sign`] - Sign a file with a detached signature
//! - [`config`] - Configuration display
//! - [`exit_codes`] - Process exit codes
//!
//! ## Error Handling
//!
//! Each handler returns its own error enum. `main` prints the error to stderr
//! and exits with the code the error maps to.

pub mod config;
pub mod exit_codes;
pub mod sign;

pub use config::{load_effective_config, ConfigCommand, ConfigCommandError};
pub use sign::{SignCommand, SignCommandError};
