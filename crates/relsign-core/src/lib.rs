//! # relsign-core
//!
//! Types, configuration and errors shared by the relsign crates.
//!
//! ## Modules
//!
//! - [`error`] - [`SigningFailure`] and its [`FailureKind`], plus [`ConfigError`]
//! - [`types`] - digest and output format selectors, key identifiers
//! - [`config`] - the `config.toml` schema
//! - [`config_loader`] - reading and writing `~/.relsign/config.toml`

pub mod config;
pub mod config_loader;
pub mod error;
pub mod types;

pub use config::{Config, ConfigBuilder, SigningConfig, DEFAULT_IDENTITY};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, FailureKind, SignResult, SigningFailure};
pub use types::{DigestAlgorithm, Fingerprint, KeyId, SignatureFormat};
