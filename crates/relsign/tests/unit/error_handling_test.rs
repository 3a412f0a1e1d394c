//! Error handling and conversion tests.
//!
//! These tests verify that error types implement the correct traits,
//! have specific Display messages, and map to the right exit codes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::error::Error;
use std::path::PathBuf;

use relsign::cli::commands::exit_codes::{
    EXIT_ERROR, EXIT_IDENTITY_NOT_FOUND, EXIT_INCORRECT_PASSPHRASE, EXIT_KEY_PARSE,
    EXIT_NO_SIGNING_KEY, EXIT_SIGNING, EXIT_UNSUPPORTED_CIPHER, EXIT_WRITE,
};
use relsign::cli::commands::{ConfigCommandError, SignCommandError};
use relsign::cli::passphrase::PassphraseError;
use relsign::logging::LogError;
use relsign_core::error::{ConfigError, FailureKind, SigningFailure};

fn io_error() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
}

/// One failure of every kind.
fn every_failure() -> Vec<SigningFailure> {
    vec![
        SigningFailure::key_parse("truncated packet"),
        SigningFailure::identity_not_found("ops@please.build"),
        SigningFailure::no_signing_key("ops@please.build", "encryption-only"),
        SigningFailure::IncorrectPassphrase,
        SigningFailure::unsupported_cipher("S2K specifier 100"),
        SigningFailure::signing("failed to read input"),
        SigningFailure::write("dist/app.asc", io_error()),
    ]
}

#[test]
fn test_error_trait_implementation() {
    let err = LogError::file_creation("logs/");
    assert!(err.source().is_none());

    let err = PassphraseError::Cancelled;
    assert!(err.source().is_none());

    let err = PassphraseError::File {
        path: PathBuf::from("pw.txt"),
        source: io_error(),
    };
    assert!(err.source().is_some());

    let err = SigningFailure::write("out.asc", io_error());
    assert!(err.source().is_some());

    let err = ConfigCommandError::from(ConfigError::no_home_directory());
    assert!(err.source().is_some());
}

#[test]
fn test_error_display() {
    let err = LogError::invalid_config("bad value");
    assert!(err.to_string().contains("invalid log configuration"));
    assert!(err.to_string().contains("bad value"));

    let err = SigningFailure::no_signing_key("ops@please.build", "encryption-only");
    assert!(err.to_string().contains("ops@please.build"));
    assert!(err.to_string().contains("encryption-only"));

    let err = SigningFailure::write("dist/app.asc", io_error());
    assert!(err.to_string().contains("dist/app.asc"));
    assert!(err.to_string().contains("denied"));

    let err = SignCommandError::from(ConfigError::file_not_found("/etc/relsign.toml"));
    assert!(err.to_string().starts_with("configuration error"));
    assert!(err.to_string().contains("/etc/relsign.toml"));

    let err = PassphraseError::empty("GPG_PASSWORD");
    assert_eq!(err.to_string(), "passphrase from GPG_PASSWORD is empty");
}

#[test]
fn test_every_kind_has_distinct_exit_code() {
    let codes: Vec<i32> = FailureKind::ALL.iter().map(|k| k.exit_code()).collect();
    assert_eq!(codes, vec![3, 4, 5, 6, 7, 8, 9]);

    for failure in every_failure() {
        let code = SignCommandError::from(failure).exit_code();
        assert!((3..=9).contains(&code));
    }
}

#[test]
fn test_sign_command_error_exit_codes() {
    let expected = [
        EXIT_KEY_PARSE,
        EXIT_IDENTITY_NOT_FOUND,
        EXIT_NO_SIGNING_KEY,
        EXIT_INCORRECT_PASSPHRASE,
        EXIT_UNSUPPORTED_CIPHER,
        EXIT_SIGNING,
        EXIT_WRITE,
    ];
    for (failure, code) in every_failure().into_iter().zip(expected) {
        let kind = failure.kind();
        assert_eq!(SignCommandError::from(failure).exit_code(), code, "{kind}");
    }

    assert_eq!(
        SignCommandError::from(PassphraseError::Cancelled).exit_code(),
        EXIT_ERROR
    );
    assert_eq!(
        SignCommandError::from(ConfigError::invalid_value("signing.identity", "")).exit_code(),
        EXIT_ERROR
    );
}

#[test]
fn test_retryable_kinds() {
    let retryable: Vec<FailureKind> = every_failure()
        .iter()
        .filter(|f| f.is_retryable())
        .map(SigningFailure::kind)
        .collect();
    assert_eq!(
        retryable,
        vec![FailureKind::IncorrectPassphrase, FailureKind::Write]
    );
}

#[test]
fn test_kind_names() {
    let names: Vec<&str> = FailureKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(
        names,
        vec![
            "KeyParseError",
            "IdentityNotFoundError",
            "NoSigningKeyError",
            "IncorrectPassphraseError",
            "UnsupportedCipherError",
            "SigningError",
            "WriteError",
        ]
    );
}

#[test]
fn test_errors_are_send_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<SigningFailure>();
    assert_send_sync::<SignCommandError>();
    assert_send_sync::<ConfigCommandError>();
    assert_send_sync::<PassphraseError>();
    assert_send_sync::<LogError>();
}
