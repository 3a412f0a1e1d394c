//! # Sign Command
//!
//! Implementation of `relsign sign`.
//!
//! ## Usage
//!
//! ```text
//! relsign sign -i dist/please.tar.gz -o dist/please.tar.gz.asc -k release.asc
//! relsign sign -i in -o in.sig -k key.asc -u ops@please.build --digest sha512 --binary
//! ```
//!
//! Settings are resolved as: command-line flag, then `config.toml`, then the
//! built-in default. On success nothing is printed; the signature file is the
//! only output.

use std::path::PathBuf;

use relsign_core::config::Config;
use relsign_core::error::{ConfigError, SigningFailure};
use relsign_core::types::SignatureFormat;
use relsign_crypto::pipeline::{ReleaseSigner, SignOutcome, SignRequest, SignerConfig};
use zeroize::Zeroizing;

use crate::cli::args::SignArgs;
use crate::cli::commands::config::load_effective_config;
use crate::cli::commands::exit_codes::EXIT_ERROR;
use crate::cli::passphrase::{read_passphrase, PassphraseError, PassphraseSource};
use crate::logging::{log_security_event, redact_sensitive};

// ============================================================================
// SignCommandError
// ============================================================================

/// Errors that can occur when running `relsign sign`.
#[derive(Debug, thiserror::Error)]
pub enum SignCommandError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Passphrase could not be obtained.
    #[error(transparent)]
    Passphrase(#[from] PassphraseError),

    /// The signing pipeline failed.
    #[error(transparent)]
    Signing(#[from] SigningFailure),
}

impl SignCommandError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Signing(failure) => failure.kind().exit_code(),
            Self::Config(_) | Self::Passphrase(_) => EXIT_ERROR,
        }
    }
}

// ============================================================================
// SignCommand
// ============================================================================

/// The `relsign sign` command handler.
///
/// # Example
///
/// ```no_run
/// use relsign::cli::args::SignArgs;
/// use relsign::cli::commands::SignCommand;
///
/// # fn example(args: SignArgs) {
/// let cmd = SignCommand::new(args, None);
/// if let Err(e) = cmd.run() {
///     eprintln!("Error: {e}");
///     std::process::exit(e.exit_code());
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SignCommand {
    /// Parsed `sign` arguments.
    pub args: SignArgs,
    /// Explicit `--config` path, if any.
    pub config_path: Option<PathBuf>,
}

impl SignCommand {
    /// Create a new `SignCommand`.
    #[must_use]
    pub const fn new(args: SignArgs, config_path: Option<PathBuf>) -> Self {
        Self { args, config_path }
    }

    /// Run the sign command.
    ///
    /// 1. Loads the configuration
    /// 2. Reads the passphrase
    /// 3. Runs the signing pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the passphrase
    /// cannot be read, or any pipeline stage fails.
    pub fn run(&self) -> Result<SignOutcome, SignCommandError> {
        let config = load_effective_config(self.config_path.as_deref())?;
        let signer_config = self.signer_config(&config);

        let (passphrase, source) =
            read_passphrase(self.args.passphrase_file.as_deref(), &signer_config.identity)?;
        log_security_event(
            "passphrase_read",
            &passphrase_event_details(source, &signer_config.identity),
        );

        self.sign_with(signer_config, passphrase)
    }

    /// Run the pipeline with an already obtained passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`SignCommandError::Signing`] if any pipeline stage fails.
    pub fn run_with_passphrase(
        &self,
        config: &Config,
        passphrase: Zeroizing<String>,
    ) -> Result<SignOutcome, SignCommandError> {
        self.sign_with(self.signer_config(config), passphrase)
    }

    /// The effective signer settings: flags over `config`.
    #[must_use]
    pub fn signer_config(&self, config: &Config) -> SignerConfig {
        let mut signer_config = SignerConfig::from(&config.signing);
        if let Some(ref user) = self.args.user {
            signer_config.identity.clone_from(user);
        }
        if let Some(digest) = self.args.digest {
            signer_config.digest = digest.into();
        }
        if self.args.binary {
            signer_config.format = SignatureFormat::Binary;
        }
        signer_config
    }

    fn sign_with(
        &self,
        signer_config: SignerConfig,
        passphrase: Zeroizing<String>,
    ) -> Result<SignOutcome, SignCommandError> {
        let request = SignRequest::new(
            self.args.input.clone(),
            self.args.output.clone(),
            self.args.key.clone(),
            passphrase,
        );

        Ok(ReleaseSigner::new(signer_config).sign(&request)?)
    }
}

/// Details for the `passphrase_read` security event; the identity is redacted.
fn passphrase_event_details(source: PassphraseSource, identity: &str) -> String {
    format!("source: {source}, identity: {}", redact_sensitive(identity))
}
