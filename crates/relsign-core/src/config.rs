//! Configuration types for relsign.
//!
//! The configuration file lives at `~/.relsign/config.toml` and holds the
//! defaults a signing run falls back to when the command line does not say
//! otherwise. Every field is optional in the file.
//!
//! # Example
//!
//! ```toml
//! [signing]
//! identity = "releases@please.build"
//! digest = "sha256"
//! format = "armored"
//! ```

use crate::error::ConfigError;
use crate::types::{DigestAlgorithm, SignatureFormat};
use serde::{Deserialize, Serialize};

/// Identity used when neither the command line nor the config file names one.
pub const DEFAULT_IDENTITY: &str = "releases@please.build";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Signing defaults.
    #[serde(default)]
    pub signing: SigningConfig,
}

fn default_identity() -> String {
    DEFAULT_IDENTITY.to_string()
}

/// The `[signing]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// User ID or email address selecting the signing entity.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Digest algorithm for document signatures.
    #[serde(default)]
    pub digest: DigestAlgorithm,

    /// Output encoding of the signature file.
    #[serde(default)]
    pub format: SignatureFormat,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            digest: DigestAlgorithm::default(),
            format: SignatureFormat::default(),
        }
    }
}

impl Config {
    /// Creates a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `signing.identity` is empty or
    /// only whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use relsign_core::config::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.signing.identity = "  ".to_string();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing.identity.trim().is_empty() {
            return Err(ConfigError::invalid_value("signing.identity", "<empty>"));
        }
        Ok(())
    }

    /// The default configuration as a commented TOML document.
    #[must_use]
    pub fn default_toml() -> String {
        format!(
            r#"# relsign configuration

[signing]
# User ID, or the email address inside <...>, of the key entity to sign with
identity = "{DEFAULT_IDENTITY}"

# Document digest: sha256, sha384 or sha512
digest = "sha256"

# Signature file encoding: armored or binary
format = "armored"
"#
        )
    }

    /// Serializes the configuration as pretty-printed TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeFailed`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::serialize_failed(e.to_string()))
    }

    /// Starts a [`ConfigBuilder`].
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`].
///
/// ```
/// use relsign_core::config::Config;
/// use relsign_core::types::DigestAlgorithm;
///
/// let config = Config::builder()
///     .identity("ops@example.com")
///     .digest(DigestAlgorithm::Sha512)
///     .build();
/// assert_eq!(config.signing.identity, "ops@example.com");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Starts from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signing identity.
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.config.signing.identity = identity.into();
        self
    }

    /// Sets the digest algorithm.
    #[must_use]
    pub const fn digest(mut self, digest: DigestAlgorithm) -> Self {
        self.config.signing.digest = digest;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub const fn format(mut self, format: SignatureFormat) -> Self {
        self.config.signing.format = format;
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
