//! Error types for relsign.
//!
//! Two families live here:
//!
//! - [`SigningFailure`] - every way a single signing run can fail, one variant
//!   per pipeline failure kind
//! - [`ConfigError`] - configuration loading and validation failures
//!
//! Each [`SigningFailure`] maps to a [`FailureKind`], which carries the stable
//! exit code used by the command line front end and tells callers whether
//! retrying with different input could help.
//!
//! # Example
//!
//! ```rust
//! use relsign_core::error::{FailureKind, SigningFailure};
//!
//! let err = SigningFailure::identity_not_found("releases@please.build");
//! assert_eq!(err.kind(), FailureKind::IdentityNotFound);
//! assert_eq!(err.kind().exit_code(), 4);
//! assert!(!err.is_retryable());
//! ```

use std::fmt;

// ============================================================================
// FailureKind
// ============================================================================

/// Category of a [`SigningFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The key bundle could not be read or parsed.
    KeyParse,
    /// No entity in the bundle carries the requested identity.
    IdentityNotFound,
    /// The matched entity has no key that can sign.
    NoSigningKey,
    /// The passphrase did not decrypt the key.
    IncorrectPassphrase,
    /// The key is protected with a scheme that is not implemented.
    UnsupportedCipher,
    /// Hashing the input or producing the signature failed.
    Signing,
    /// The signature could not be persisted.
    Write,
}

impl FailureKind {
    /// All kinds, in exit code order.
    pub const ALL: [Self; 7] = [
        Self::KeyParse,
        Self::IdentityNotFound,
        Self::NoSigningKey,
        Self::IncorrectPassphrase,
        Self::UnsupportedCipher,
        Self::Signing,
        Self::Write,
    ];

    /// Process exit code reported for this kind.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::KeyParse => 3,
            Self::IdentityNotFound => 4,
            Self::NoSigningKey => 5,
            Self::IncorrectPassphrase => 6,
            Self::UnsupportedCipher => 7,
            Self::Signing => 8,
            Self::Write => 9,
        }
    }

    /// Whether a caller may reasonably retry after this kind of failure.
    ///
    /// Only a mistyped passphrase or a transient output problem qualify;
    /// everything else needs a different key file, identity or input.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::IncorrectPassphrase | Self::Write)
    }

    /// Stable name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::KeyParse => "KeyParseError",
            Self::IdentityNotFound => "IdentityNotFoundError",
            Self::NoSigningKey => "NoSigningKeyError",
            Self::IncorrectPassphrase => "IncorrectPassphraseError",
            Self::UnsupportedCipher => "UnsupportedCipherError",
            Self::Signing => "SigningError",
            Self::Write => "WriteError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SigningFailure
// ============================================================================

/// Errors produced by a signing run.
///
/// Every variant aborts the run; none of them leaves a signature file behind.
#[derive(Debug, thiserror::Error)]
pub enum SigningFailure {
    /// Malformed armor, malformed packet stream, or an unreadable key file.
    #[error("failed to parse key: {context}")]
    KeyParse {
        /// What was being parsed when it failed.
        context: String,
    },

    /// No entity in the bundle matches the identity.
    #[error("no key found for identity {identity}")]
    IdentityNotFound {
        /// The identity that was searched for.
        identity: String,
    },

    /// The matched entity has no signing-capable key.
    #[error("no signing key for identity {identity}: {reason}")]
    NoSigningKey {
        /// The identity whose entity was matched.
        identity: String,
        /// Why none of the entity's keys qualified.
        reason: String,
    },

    /// Decryption produced material that failed its integrity checks.
    #[error("incorrect passphrase")]
    IncorrectPassphrase,

    /// The secret key uses a protection scheme that is not implemented.
    #[error("unsupported key protection: {context}")]
    UnsupportedCipher {
        /// The unsupported S2K type, cipher or usage.
        context: String,
    },

    /// Reading the input or computing the signature failed.
    #[error("signing failed: {context}")]
    Signing {
        /// What went wrong.
        context: String,
    },

    /// The signature file could not be written.
    #[error("failed to write signature: {context}: {source}")]
    Write {
        /// Which step of the write failed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SigningFailure {
    /// Create a `KeyParse` error with context.
    #[must_use]
    pub fn key_parse(context: impl Into<String>) -> Self {
        Self::KeyParse {
            context: context.into(),
        }
    }

    /// Create an `IdentityNotFound` error.
    #[must_use]
    pub fn identity_not_found(identity: impl Into<String>) -> Self {
        Self::IdentityNotFound {
            identity: identity.into(),
        }
    }

    /// Create a `NoSigningKey` error.
    #[must_use]
    pub fn no_signing_key(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoSigningKey {
            identity: identity.into(),
            reason: reason.into(),
        }
    }

    /// Create an `UnsupportedCipher` error with context.
    #[must_use]
    pub fn unsupported_cipher(context: impl Into<String>) -> Self {
        Self::UnsupportedCipher {
            context: context.into(),
        }
    }

    /// Create a `Signing` error with context.
    #[must_use]
    pub fn signing(context: impl Into<String>) -> Self {
        Self::Signing {
            context: context.into(),
        }
    }

    /// Create a `Write` error from an I/O error.
    #[must_use]
    pub fn write(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Write {
            context: context.into(),
            source,
        }
    }

    /// The category of this failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::KeyParse { .. } => FailureKind::KeyParse,
            Self::IdentityNotFound { .. } => FailureKind::IdentityNotFound,
            Self::NoSigningKey { .. } => FailureKind::NoSigningKey,
            Self::IncorrectPassphrase => FailureKind::IncorrectPassphrase,
            Self::UnsupportedCipher { .. } => FailureKind::UnsupportedCipher,
            Self::Signing { .. } => FailureKind::Signing,
            Self::Write { .. } => FailureKind::Write,
        }
    }

    /// Shorthand for `self.kind().is_retryable()`.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// Failed to serialize the configuration.
    #[error("failed to serialize configuration: {context}")]
    SerializeFailed {
        /// Context about the serialization failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// Filesystem error while reading or writing configuration.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create a `SerializeFailed` error.
    #[must_use]
    pub fn serialize_failed(context: impl Into<String>) -> Self {
        Self::SerializeFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }

    /// Create an `Io` error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias for signing operations.
pub type SignResult<T> = std::result::Result<T, SigningFailure>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Unit Tests
// ============================================================================
