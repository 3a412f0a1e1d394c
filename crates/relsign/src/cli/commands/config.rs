//! # Config Command
//!
//! Implementation of `relsign config`.
//!
//! ## Usage
//!
//! ```text
//! relsign config           # Display the effective configuration
//! relsign config show      # Same as above
//! relsign config path      # Show the configuration file path
//! relsign config init      # Write the commented default configuration
//! relsign config init -u ops@please.build --digest sha512 --force
//! ```

use std::path::{Path, PathBuf};

use relsign_core::config::Config;
use relsign_core::config_loader::{load_config, ConfigLoader};
use relsign_core::error::ConfigError;
use relsign_core::types::SignatureFormat;

use crate::cli::args::{ConfigAction, DigestArg};

// ============================================================================
// ConfigCommandError
// ============================================================================

/// Errors that can occur during config command execution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigCommandError {
    /// Failed to load, render or write configuration.
    #[error("Configuration error: {0}")]
    LoadError(#[source] ConfigError),

    /// `config init` found an existing file and --force was not given.
    #[error("Configuration already exists at {}. Use --force to overwrite.", .0.display())]
    AlreadyExists(PathBuf),
}

impl From<ConfigError> for ConfigCommandError {
    fn from(err: ConfigError) -> Self {
        Self::LoadError(err)
    }
}

// ============================================================================
// Config resolution
// ============================================================================

/// Path of the configuration file in effect.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if no explicit path is given and
/// the home directory cannot be determined.
pub fn effective_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    Ok(config_loader(explicit)?.config_path())
}

fn config_loader(explicit: Option<&Path>) -> Result<ConfigLoader, ConfigError> {
    match explicit {
        Some(path) => Ok(ConfigLoader::with_config_file(path.to_path_buf())),
        None => ConfigLoader::new(),
    }
}

/// Loads the configuration in effect.
///
/// An explicit path must exist. The default `~/.relsign/config.toml` may be
/// missing, in which case built-in defaults apply.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_effective_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            ConfigLoader::with_config_file(path.to_path_buf()).load_required()
        }
        None => load_config(),
    }
}

// ============================================================================
// ConfigCommand
// ============================================================================

/// The `relsign config` command handler.
#[derive(Debug, Clone)]
pub struct ConfigCommand {
    /// The action to perform (None = show config).
    pub action: Option<ConfigAction>,
    /// Explicit `--config` path, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigCommand {
    /// Create a new `ConfigCommand`.
    #[must_use]
    pub const fn new(action: Option<ConfigAction>, config_path: Option<PathBuf>) -> Self {
        Self {
            action,
            config_path,
        }
    }

    /// Run the config command, printing to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or written.
    pub fn run(&self) -> Result<(), ConfigCommandError> {
        print!("{}", self.render()?);
        Ok(())
    }

    /// The text [`run`](Self::run) prints.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or written.
    pub fn render(&self) -> Result<String, ConfigCommandError> {
        match &self.action {
            None | Some(ConfigAction::Show) => {
                let config = load_effective_config(self.config_path.as_deref())?;
                Ok(config.to_toml()?)
            }
            Some(ConfigAction::Path) => {
                let path = effective_config_path(self.config_path.as_deref())?;
                Ok(format!("{}\n", path.display()))
            }
            Some(ConfigAction::Init {
                force,
                user,
                digest,
                binary,
            }) => {
                let path = self.init(*force, user.as_deref(), *digest, *binary)?;
                Ok(format!("Wrote {}\n", path.display()))
            }
        }
    }

    /// Writes the configuration file, returning its path.
    ///
    /// Without any setting the commented defaults are written; otherwise the
    /// defaults with the given settings applied.
    fn init(
        &self,
        force: bool,
        user: Option<&str>,
        digest: Option<DigestArg>,
        binary: bool,
    ) -> Result<PathBuf, ConfigCommandError> {
        let loader = config_loader(self.config_path.as_deref())?;
        let path = loader.config_path();
        if loader.exists() && !force {
            return Err(ConfigCommandError::AlreadyExists(path));
        }

        if user.is_none() && digest.is_none() && !binary {
            loader.write_default()?;
        } else {
            let mut builder = Config::builder();
            if let Some(user) = user {
                builder = builder.identity(user);
            }
            if let Some(digest) = digest {
                builder = builder.digest(digest.into());
            }
            if binary {
                builder = builder.format(SignatureFormat::Binary);
            }
            loader.save(&builder.build())?;
        }

        tracing::info!(path = %path.display(), "configuration written");
        Ok(path)
    }
}
