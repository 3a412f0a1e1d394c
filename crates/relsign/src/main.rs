//! # relsign
//!
//! Detached OpenPGP signatures for release artifacts.
//!
//! ## Usage
//!
//! ```bash
//! # Sign a release archive with an ASCII-armored signature
//! relsign sign -i please.tar.gz -o please.tar.gz.asc -k release_key.asc
//!
//! # Non-interactive, as in CI
//! RELSIGN_PASSPHRASE=... relsign sign -i app -o app.sig -k key.asc --binary
//!
//! # Show the effective configuration
//! relsign config
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Configuration, passphrase or logging error |
//! | 2 | Invalid command line |
//! | 3-9 | Signing failure, see `relsign::cli::commands::exit_codes` |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;

use clap::Parser;
use relsign::cli::commands::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use relsign::cli::commands::{ConfigCommand, SignCommand};
use relsign::cli::{Cli, Commands};
use relsign::logging::{
    init_logging, new_correlation_id, verbosity_to_level, LogConfig, LogError, LogFormat, LogGuard,
};
use relsign::with_correlation_id;

/// Set up logging from the global flags.
///
/// # Errors
///
/// Returns [`LogError`] if logging initialization fails.
fn setup_logging(
    verbose: u8,
    format: LogFormat,
    file_path: Option<PathBuf>,
) -> Result<LogGuard, LogError> {
    let config = LogConfig {
        level: verbosity_to_level(verbose),
        format,
        file_path,
        correlation_ids: true,
    };
    init_logging(&config)
}

/// Main entry point for relsign.
fn main() {
    let cli = Cli::parse();

    let code = {
        let _guard = match setup_logging(cli.verbose, cli.log_format, cli.log_file.clone()) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Failed to initialize logging: {e}");
                std::process::exit(EXIT_ERROR);
            }
        };

        let correlation_id = new_correlation_id();
        with_correlation_id!(correlation_id, "relsign").in_scope(|| dispatch(cli))
    };

    if code != EXIT_SUCCESS {
        std::process::exit(code);
    }
}

/// Run the selected command and map its result to an exit code.
fn dispatch(cli: Cli) -> i32 {
    match cli.command {
        Commands::Sign(args) => {
            let cmd = SignCommand::new(args, cli.config);
            match cmd.run() {
                Ok(outcome) => {
                    tracing::info!(
                        output = %outcome.output.display(),
                        key_id = %outcome.key_id,
                        "signature written"
                    );
                    EXIT_SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    e.exit_code()
                }
            }
        }
        Commands::Config { action } => {
            let cmd = ConfigCommand::new(action, cli.config);
            match cmd.run() {
                Ok(()) => EXIT_SUCCESS,
                Err(e) => {
                    eprintln!("Error: {e}");
                    EXIT_ERROR
                }
            }
        }
    }
}
