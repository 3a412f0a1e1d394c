//! Exit code constants for CLI commands.
//!
//! Signing failures map to one code per [`FailureKind`]; everything that
//! goes wrong before the pipeline starts (configuration, passphrase input)
//! is [`EXIT_ERROR`]. Clap exits with [`EXIT_USAGE`] on bad arguments.

use relsign_core::error::FailureKind;

/// Successful operation.
pub const EXIT_SUCCESS: i32 = 0;

/// Configuration or passphrase input error.
pub const EXIT_ERROR: i32 = 1;

/// Invalid command-line usage (reported by clap).
pub const EXIT_USAGE: i32 = 2;

/// Malformed armor or packet stream, or unreadable key file.
pub const EXIT_KEY_PARSE: i32 = FailureKind::KeyParse.exit_code();

/// No entity matches the identity.
pub const EXIT_IDENTITY_NOT_FOUND: i32 = FailureKind::IdentityNotFound.exit_code();

/// The matched entity has no usable signing key.
pub const EXIT_NO_SIGNING_KEY: i32 = FailureKind::NoSigningKey.exit_code();

/// Wrong passphrase.
pub const EXIT_INCORRECT_PASSPHRASE: i32 = FailureKind::IncorrectPassphrase.exit_code();

/// Key protection that is not implemented.
pub const EXIT_UNSUPPORTED_CIPHER: i32 = FailureKind::UnsupportedCipher.exit_code();

/// Input read failure or signing primitive failure.
pub const EXIT_SIGNING: i32 = FailureKind::Signing.exit_code();

/// Signature could not be written.
pub const EXIT_WRITE: i32 = FailureKind::Write.exit_code();
