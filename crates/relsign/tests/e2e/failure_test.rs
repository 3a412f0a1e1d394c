//! Failure paths.
//!
//! Every failure must leave no signature behind and map to its own exit code.
//! Tamper checks run the verifier in `common` against a signature made once.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::path::Path;
use std::sync::OnceLock;

use proptest::prelude::*;
use relsign_core::error::{FailureKind, SigningFailure};
use relsign_crypto::{ReleaseSigner, SignRequest, SignerConfig};
use zeroize::Zeroizing;

use crate::common::{
    fixture_key, read_fixture_key, relsign, verify_detached, TestEnv, PASSPHRASE,
};

const HELLO: &[u8] = b"hello world\n";

fn try_sign(env: &TestEnv, key: &Path, identity: &str, passphrase: &str) -> SigningFailure {
    let request = SignRequest::new(
        &env.input,
        &env.output,
        key,
        Zeroizing::new(passphrase.to_string()),
    )
    .with_identity(identity);
    ReleaseSigner::new(SignerConfig::default())
        .sign(&request)
        .expect_err("signing should fail")
}

fn assert_no_output(env: &TestEnv) {
    let names: Vec<String> = std::fs::read_dir(env.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "please_linux_amd64")
        .collect();
    assert!(names.is_empty(), "unexpected files: {names:?}");
}

// ============================================================================
// Failure kinds
// ============================================================================

#[test]
fn test_passphrase_off_by_one_character() {
    let env = TestEnv::with_artifact(HELLO);
    let almost = &PASSPHRASE[..PASSPHRASE.len() - 1];

    for (key, identity) in [
        ("rsa_secret.asc", "releases@please.build"),
        ("ed25519_secret.asc", "ed-releases@please.build"),
    ] {
        let err = try_sign(&env, &fixture_key(key), identity, almost);
        assert_eq!(err.kind(), FailureKind::IncorrectPassphrase, "{key}");
        assert!(err.is_retryable());
        assert!(!env.output.exists());
    }
    assert_no_output(&env);
}

#[test]
fn test_unknown_identity() {
    let env = TestEnv::with_artifact(HELLO);
    let err = try_sign(
        &env,
        &fixture_key("rsa_secret.asc"),
        "nobody@please.build",
        PASSPHRASE,
    );
    assert_eq!(err.kind(), FailureKind::IdentityNotFound);
    assert!(err.to_string().contains("nobody@please.build"));
    assert_no_output(&env);
}

#[test]
fn test_identity_must_match_whole_address() {
    let env = TestEnv::with_artifact(HELLO);
    for identity in ["please.build", "Releases", "releases@please.buil"] {
        let err = try_sign(&env, &fixture_key("rsa_secret.asc"), identity, PASSPHRASE);
        assert_eq!(err.kind(), FailureKind::IdentityNotFound, "{identity}");
    }
}

#[test]
fn test_encryption_only_entity() {
    let env = TestEnv::with_artifact(HELLO);
    let err = try_sign(
        &env,
        &fixture_key("encrypt_only_secret.asc"),
        "encrypt-only@please.build",
        PASSPHRASE,
    );
    assert_eq!(err.kind(), FailureKind::NoSigningKey);
    assert_no_output(&env);
}

#[test]
fn test_public_key_block_has_no_secret() {
    let env = TestEnv::with_artifact(HELLO);
    let err = try_sign(
        &env,
        &fixture_key("rsa_public.asc"),
        "releases@please.build",
        PASSPHRASE,
    );
    assert_eq!(err.kind(), FailureKind::NoSigningKey);
}

#[test]
fn test_unreadable_and_malformed_key_files() {
    let env = TestEnv::with_artifact(HELLO);

    let err = try_sign(&env, &env.path("missing.asc"), "releases@please.build", PASSPHRASE);
    assert_eq!(err.kind(), FailureKind::KeyParse);

    let garbage = env.path("garbage.asc");
    std::fs::write(&garbage, b"this is not a key\n").unwrap();
    let err = try_sign(&env, &garbage, "releases@please.build", PASSPHRASE);
    assert_eq!(err.kind(), FailureKind::KeyParse);

    let mut armored = read_fixture_key("rsa_secret.asc");
    let mut middle = armored.len() / 2;
    while !armored[middle].is_ascii_alphanumeric() {
        middle += 1;
    }
    armored[middle] = if armored[middle] == b'A' { b'B' } else { b'A' };
    let corrupt = env.path("corrupt.asc");
    std::fs::write(&corrupt, &armored).unwrap();
    let err = try_sign(&env, &corrupt, "releases@please.build", PASSPHRASE);
    assert_eq!(err.kind(), FailureKind::KeyParse);

    assert!(!env.output.exists());
}

#[test]
fn test_missing_input_is_signing_error() {
    let env = TestEnv::with_artifact(HELLO);
    std::fs::remove_file(&env.input).unwrap();

    let err = try_sign(
        &env,
        &fixture_key("rsa_secret.asc"),
        "releases@please.build",
        PASSPHRASE,
    );
    assert_eq!(err.kind(), FailureKind::Signing);
    assert!(!env.output.exists());
}

#[test]
fn test_unwritable_output_is_write_error() {
    let env = TestEnv::with_artifact(HELLO);
    let request = SignRequest::new(
        &env.input,
        env.path("no/such/dir/out.asc"),
        fixture_key("rsa_secret.asc"),
        Zeroizing::new(PASSPHRASE.to_string()),
    );
    let err = ReleaseSigner::new(SignerConfig::default())
        .sign(&request)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Write);
    assert!(err.is_retryable());
    assert_no_output(&env);
}

#[test]
fn test_failure_keeps_previous_signature() {
    let env = TestEnv::with_artifact(HELLO);
    std::fs::write(&env.output, b"previous release signature").unwrap();

    let err = try_sign(&env, &fixture_key("rsa_secret.asc"), "releases@please.build", "nope");
    assert_eq!(err.kind(), FailureKind::IncorrectPassphrase);
    assert_eq!(std::fs::read(&env.output).unwrap(), b"previous release signature");
}

// ============================================================================
// Binary exit codes
// ============================================================================

fn run_sign(env: &TestEnv, key: &Path, extra: &[&str], passphrase: &str) -> std::process::Output {
    relsign(env)
        .env("RELSIGN_PASSPHRASE", passphrase)
        .args(["sign", "-i"])
        .arg(&env.input)
        .arg("-o")
        .arg(&env.output)
        .arg("-k")
        .arg(key)
        .args(extra)
        .output()
        .expect("run relsign")
}

#[test]
fn test_binary_exit_codes() {
    let env = TestEnv::with_artifact(HELLO);
    let rsa = fixture_key("rsa_secret.asc");
    let missing = env.path("missing.asc");
    let encrypt_only = fixture_key("encrypt_only_secret.asc");
    let no_flags: &[&str] = &[];
    let cases = [
        (&rsa, no_flags, "wrong passphrase", 6),
        (&rsa, &["-u", "nobody@please.build"][..], PASSPHRASE, 4),
        (&missing, no_flags, PASSPHRASE, 3),
        (&encrypt_only, &["-u", "encrypt-only@please.build"][..], PASSPHRASE, 5),
    ];

    for (key, extra, passphrase, code) in cases {
        let output = run_sign(&env, key, extra, passphrase);
        assert_eq!(output.status.code(), Some(code), "{extra:?}");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Error: "), "{stderr}");
        assert!(output.stdout.is_empty());
        assert!(!env.output.exists());
    }
}

#[test]
fn test_binary_write_failure_exit_code() {
    let env = TestEnv::with_artifact(HELLO);
    let output = relsign(&env)
        .env("RELSIGN_PASSPHRASE", PASSPHRASE)
        .args(["sign", "-i"])
        .arg(&env.input)
        .arg("-o")
        .arg(env.path("missing/dir/out.asc"))
        .arg("-k")
        .arg(fixture_key("rsa_secret.asc"))
        .output()
        .expect("run relsign");
    assert_eq!(output.status.code(), Some(9));
}

#[test]
fn test_binary_empty_passphrase_is_cli_error() {
    let env = TestEnv::with_artifact(HELLO);
    let output = run_sign(&env, &fixture_key("rsa_secret.asc"), &[], "");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("RELSIGN_PASSPHRASE"));
}

#[test]
fn test_binary_missing_explicit_config() {
    let env = TestEnv::with_artifact(HELLO);
    let output = relsign(&env)
        .env("RELSIGN_PASSPHRASE", PASSPHRASE)
        .arg("--config")
        .arg(env.path("absent.toml"))
        .args(["sign", "-i"])
        .arg(&env.input)
        .arg("-o")
        .arg(&env.output)
        .arg("-k")
        .arg(fixture_key("rsa_secret.asc"))
        .output()
        .expect("run relsign");
    assert_eq!(output.status.code(), Some(1));
    assert!(!env.output.exists());
}

#[test]
fn test_binary_usage_errors() {
    let env = TestEnv::with_artifact(HELLO);
    let output = relsign(&env).output().expect("run relsign");
    assert_eq!(output.status.code(), Some(2));

    let output = relsign(&env)
        .args(["sign", "-i", "in", "-o", "out", "-k", "k", "--passphrase", "x"])
        .output()
        .expect("run relsign");
    assert_eq!(output.status.code(), Some(2));
}

// ============================================================================
// Tampering
// ============================================================================

/// One RSA signature over `HELLO`, made on first use.
fn reference_signature() -> &'static [u8] {
    static SIGNATURE: OnceLock<Vec<u8>> = OnceLock::new();
    SIGNATURE.get_or_init(|| {
        let env = TestEnv::with_artifact(HELLO);
        let request = SignRequest::new(
            &env.input,
            &env.output,
            fixture_key("rsa_secret.asc"),
            Zeroizing::new(PASSPHRASE.to_string()),
        );
        ReleaseSigner::new(SignerConfig::default())
            .sign(&request)
            .expect("sign");
        std::fs::read(&env.output).expect("signature")
    })
}

#[test]
fn test_reference_signature_verifies() {
    verify_detached(reference_signature(), HELLO, &read_fixture_key("rsa_public.asc"))
        .expect("verifies");
}

#[test]
fn test_unrelated_key_rejects_signature() {
    let result = verify_detached(
        reference_signature(),
        HELLO,
        &read_fixture_key("unrelated_public.asc"),
    );
    assert!(result.is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_flipped_input_byte_fails_verification(index in 0..HELLO.len(), mask in 1u8..=255) {
        let mut document = HELLO.to_vec();
        document[index] ^= mask;
        let result = verify_detached(
            reference_signature(),
            &document,
            &read_fixture_key("rsa_public.asc"),
        );
        prop_assert!(result.is_err());
    }

    #[test]
    fn prop_appended_bytes_fail_verification(extra in proptest::collection::vec(any::<u8>(), 1..16)) {
        let mut document = HELLO.to_vec();
        document.extend(extra);
        let result = verify_detached(
            reference_signature(),
            &document,
            &read_fixture_key("rsa_public.asc"),
        );
        prop_assert!(result.is_err());
    }
}
