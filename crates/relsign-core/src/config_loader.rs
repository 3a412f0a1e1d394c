//! Loading and saving `~/.relsign/config.toml`.
//!
//! A missing configuration file is not an error for [`ConfigLoader::load`]:
//! the defaults from [`Config::default`] are used instead.
//!
//! ```no_run
//! use relsign_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("failed to create loader");
//! if !loader.exists() {
//!     loader.write_default().expect("failed to write default config");
//! }
//! let config = loader.load().expect("failed to load config");
//! println!("signing as {}", config.signing.identity);
//! ```

use crate::config::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// The configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// The base directory name within the home directory.
const BASE_DIR_NAME: &str = ".relsign";

/// Reads and writes the configuration file below a base directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for relsign files (default: ~/.relsign).
    base_dir: PathBuf,
    /// The configuration file, normally `config.toml` in `base_dir`.
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader rooted at `~/.relsign`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self::with_base_dir(default_base_dir()?))
    }

    /// Creates a loader rooted at a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        let config_path = base_dir.join(CONFIG_FILE_NAME);
        Self {
            base_dir,
            config_path,
        }
    }

    /// Creates a loader for an explicitly named configuration file.
    ///
    /// The file's directory becomes the base directory.
    #[must_use]
    pub fn with_config_file(config_path: PathBuf) -> Self {
        let base_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            base_dir,
            config_path,
        }
    }

    /// Path of the configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// The base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads the configuration, returning defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] if the file contains invalid TOML.
    /// Returns [`ConfigError::Io`] if there's an I/O error reading the file.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Ok(Config::default());
        }

        load_file(&config_path)
    }

    /// Loads the configuration, failing if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the configuration file doesn't exist,
    /// otherwise the same errors as [`load`](Self::load).
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Err(ConfigError::file_not_found(
                config_path.display().to_string(),
            ));
        }

        load_file(&config_path)
    }

    /// Validates and saves the configuration, creating the base directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if validation fails,
    /// [`ConfigError::SerializeFailed`] if serialization fails and
    /// [`ConfigError::Io`] on write failures.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.ensure_base_dir()?;

        let config_path = self.config_path();
        let toml_str = config.to_toml()?;

        fs::write(&config_path, toml_str).map_err(|e| {
            ConfigError::io(
                format!("failed to write configuration to {}", config_path.display()),
                e,
            )
        })
    }

    /// Writes the commented default configuration from [`Config::default_toml`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if there's an I/O error writing the file.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;

        let config_path = self.config_path();
        fs::write(&config_path, Config::default_toml()).map_err(|e| {
            ConfigError::io(
                format!(
                    "failed to write default configuration to {}",
                    config_path.display()
                ),
                e,
            )
        })
    }

    /// Whether the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    fn ensure_base_dir(&self) -> Result<(), ConfigError> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir).map_err(|e| {
                ConfigError::io(
                    format!(
                        "failed to create base directory {}",
                        self.base_dir.display()
                    ),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

/// Loads and validates a configuration file at an explicit path.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if the file is missing,
/// [`ConfigError::ParseFailed`] for invalid TOML, [`ConfigError::InvalidValue`]
/// if validation fails, and [`ConfigError::Io`] for other read errors.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::file_not_found(path.display().to_string())
        } else {
            ConfigError::io(format!("failed to read {}", path.display()), e)
        }
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| {
        ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display()))
    })?;

    config.validate()?;
    Ok(config)
}

/// Expands a leading `~` to the home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path starts with `~` and
/// the home directory cannot be determined.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
        Ok(home.join(rest))
    } else if path == "~" {
        dirs::home_dir().ok_or_else(ConfigError::no_home_directory)
    } else {
        Ok(PathBuf::from(path))
    }
}

/// The default base directory, `~/.relsign`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
    Ok(home.join(BASE_DIR_NAME))
}

/// Loads the configuration from the default location.
///
/// # Errors
///
/// See [`ConfigLoader::new`] and [`ConfigLoader::load`].
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new()?.load()
}
