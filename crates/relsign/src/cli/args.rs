//! # CLI Argument Definitions
//!
//! The command-line interface structure, using clap derive macros.
//!
//! - `relsign sign -i INPUT -o OUTPUT -k KEY [-u USER]` - Sign a file
//! - `relsign config [show|path|init]` - View or create the configuration
//!
//! Path arguments expand a leading `~`, so values taken from the environment
//! (such as `OUT`) or quoted on the command line behave like shell paths.
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file
//! - `--log-file <PATH>` - Also log to a daily-rolling file
//! - `--log-format <FORMAT>` - `pretty`, `json` or `compact`

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use relsign_core::config_loader::expand_path;
use relsign_core::types::DigestAlgorithm;

use crate::logging::LogFormat;

/// Detached OpenPGP signatures for release artifacts.
#[derive(Debug, Parser)]
#[command(name = "relsign")]
#[command(author, version, about = "Detached OpenPGP signatures for release artifacts")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    ///
    /// Logging goes to stderr and is quiet by default:
    /// - `-v` - Show info messages
    /// - `-vv` - Show debug messages
    /// - `-vvv` - Show trace messages
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.relsign/config.toml`. A missing default file means
    /// built-in defaults; a missing explicit file is an error.
    #[arg(short, long, global = true, value_name = "PATH", value_parser = expand_path)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, value_name = "PATH", value_parser = expand_path)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign a file, writing a detached signature
    ///
    /// The passphrase is read from `RELSIGN_PASSPHRASE`, then `GPG_PASSWORD`,
    /// then `--passphrase-file`, and finally prompted for on the terminal.
    Sign(SignArgs),

    /// View or create configuration
    ///
    /// Without a subcommand, prints the effective configuration.
    Config {
        /// Configuration action to perform
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Arguments for `relsign sign`.
#[derive(Debug, Clone, Args)]
pub struct SignArgs {
    /// File to sign
    #[arg(short, long, value_name = "INPUT", value_parser = expand_path)]
    pub input: PathBuf,

    /// Where to write the signature
    #[arg(short, long, env = "OUT", value_name = "OUTPUT", value_parser = expand_path)]
    pub output: PathBuf,

    /// ASCII-armored private key bundle
    #[arg(short, long, value_name = "KEY", value_parser = expand_path)]
    pub key: PathBuf,

    /// Identity to sign as: a full user ID or its email address
    ///
    /// Defaults to `signing.identity` from the config file.
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Digest algorithm
    ///
    /// Defaults to `signing.digest` from the config file.
    #[arg(long, value_enum, value_name = "DIGEST")]
    pub digest: Option<DigestArg>,

    /// Write a binary signature instead of ASCII armor
    #[arg(long)]
    pub binary: bool,

    /// Read the passphrase from the first line of this file
    #[arg(long, value_name = "PATH", value_parser = expand_path)]
    pub passphrase_file: Option<PathBuf>,
}

/// Configuration-related actions.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file
    ///
    /// Without settings, writes the commented defaults.
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,

        /// Identity to sign as by default
        #[arg(short, long, value_name = "USER")]
        user: Option<String>,

        /// Default digest algorithm
        #[arg(long, value_enum, value_name = "DIGEST")]
        digest: Option<DigestArg>,

        /// Write binary signatures by default
        #[arg(long)]
        binary: bool,
    },
}

/// Digest algorithm choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DigestArg {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl From<DigestArg> for DigestAlgorithm {
    fn from(arg: DigestArg) -> Self {
        match arg {
            DigestArg::Sha256 => Self::Sha256,
            DigestArg::Sha384 => Self::Sha384,
            DigestArg::Sha512 => Self::Sha512,
        }
    }
}
