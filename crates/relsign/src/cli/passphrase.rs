//! # Passphrase Input
//!
//! The passphrase for the signing key is taken from the first available
//! source:
//!
//! 1. `RELSIGN_PASSPHRASE` environment variable
//! 2. `GPG_PASSWORD` environment variable (kept for existing CI setups)
//! 3. the first line of `--passphrase-file`
//! 4. a hidden prompt on the terminal, via `rpassword`
//!
//! Both environment variables are removed from the process environment as
//! soon as one of them has been read. The passphrase is never accepted on
//! the command line.
//!
//! ## Security Warning
//!
//! Environment variables may be visible to other processes on the same system
//! (e.g. via `/proc/<pid>/environ` on Linux). Prefer a passphrase file with
//! restrictive permissions, or the prompt, on shared machines.

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

/// Primary environment variable for non-interactive use.
pub(crate) const ENV_VAR: &str = "RELSIGN_PASSPHRASE";

/// Legacy environment variable, read when [`ENV_VAR`] is unset.
pub(crate) const LEGACY_ENV_VAR: &str = "GPG_PASSWORD";

/// Errors that can occur during passphrase input.
#[derive(Debug, thiserror::Error)]
pub enum PassphraseError {
    /// The selected source held an empty passphrase.
    #[error("passphrase from {source_name} is empty")]
    Empty {
        /// Where the passphrase came from.
        source_name: String,
    },

    /// User cancelled the prompt (EOF or empty input).
    #[error("passphrase input cancelled")]
    Cancelled,

    /// The passphrase file could not be read.
    #[error("failed to read passphrase file {}: {source}", path.display())]
    File {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error reading from the terminal.
    #[error("failed to read passphrase: {0}")]
    Io(#[from] std::io::Error),
}

impl PassphraseError {
    /// Create a [`PassphraseError::Empty`].
    #[must_use]
    pub fn empty(source_name: impl Into<String>) -> Self {
        Self::Empty {
            source_name: source_name.into(),
        }
    }
}

/// Where a passphrase came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseSource {
    /// `RELSIGN_PASSPHRASE`.
    Env,
    /// `GPG_PASSWORD`.
    LegacyEnv,
    /// `--passphrase-file`.
    File,
    /// Terminal prompt.
    Prompt,
}

impl std::fmt::Display for PassphraseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => f.write_str(ENV_VAR),
            Self::LegacyEnv => f.write_str(LEGACY_ENV_VAR),
            Self::File => f.write_str("passphrase file"),
            Self::Prompt => f.write_str("prompt"),
        }
    }
}

/// Read the signing key passphrase.
///
/// `prompt_label` is shown in the interactive prompt (usually the identity).
///
/// # Errors
///
/// Returns [`PassphraseError`] if:
/// - The chosen source is empty
/// - The passphrase file cannot be read
/// - The interactive prompt fails or is cancelled
pub fn read_passphrase(
    passphrase_file: Option<&Path>,
    prompt_label: &str,
) -> Result<(Zeroizing<String>, PassphraseSource), PassphraseError> {
    if let Some((value, source)) = take_from_env() {
        if value.is_empty() {
            return Err(PassphraseError::empty(source.to_string()));
        }
        return Ok((value, source));
    }

    if let Some(path) = passphrase_file {
        let value = read_passphrase_file(path)?;
        return Ok((value, PassphraseSource::File));
    }

    let value = prompt(&format!("Enter passphrase for {prompt_label}: "))?;
    if value.is_empty() {
        return Err(PassphraseError::Cancelled);
    }
    Ok((value, PassphraseSource::Prompt))
}

/// Reads `RELSIGN_PASSPHRASE`, then `GPG_PASSWORD`, and clears both.
fn take_from_env() -> Option<(Zeroizing<String>, PassphraseSource)> {
    let found = std::env::var(ENV_VAR)
        .ok()
        .map(|v| (Zeroizing::new(v), PassphraseSource::Env))
        .or_else(|| {
            std::env::var(LEGACY_ENV_VAR)
                .ok()
                .map(|v| (Zeroizing::new(v), PassphraseSource::LegacyEnv))
        });
    if found.is_some() {
        clear_env_var(ENV_VAR);
        clear_env_var(LEGACY_ENV_VAR);
    }
    found
}

/// First line of `path`, without its line terminator.
fn read_passphrase_file(path: &Path) -> Result<Zeroizing<String>, PassphraseError> {
    let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
        PassphraseError::File {
            path: path.to_path_buf(),
            source,
        }
    })?);
    let first = contents.lines().next().unwrap_or_default();
    if first.is_empty() {
        return Err(PassphraseError::empty(format!("{}", path.display())));
    }
    Ok(Zeroizing::new(first.to_string()))
}

/// Prompt on the terminal, mapping EOF to [`PassphraseError::Cancelled`].
fn prompt(text: &str) -> Result<Zeroizing<String>, PassphraseError> {
    rpassword::prompt_password(text).map(Zeroizing::new).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            PassphraseError::Cancelled
        } else {
            PassphraseError::Io(e)
        }
    })
}

/// Clear an environment variable so child processes don't inherit it.
///
/// On Linux, `/proc/<pid>/environ` still shows the initial environment.
fn clear_env_var(var: &str) {
    // single-threaded at this point
    std::env::remove_var(var);
}
