//! Successful signing runs.
//!
//! Every signature produced here is checked by the verifier in `common`,
//! which re-hashes the artifact and validates the signature against the
//! fixture's public key block.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use chrono::{TimeZone, Utc};
use relsign::cli::args::{DigestArg, SignArgs};
use relsign::cli::commands::SignCommand;
use relsign_core::config::Config;
use relsign_core::types::{DigestAlgorithm, SignatureFormat};
use relsign_crypto::{sign_file, ReleaseSigner, SignOutcome, SignRequest, SignerConfig};
use zeroize::Zeroizing;

use crate::common::{
    fixture_key, read_fixture_key, read_signature, relsign, verify_detached, TestEnv,
    ED25519_SUBKEY_ID, FIXED_TIME, PASSPHRASE, RSA_KEY_ID,
};

const HELLO: &[u8] = b"hello world\n";

fn sign_with(
    env: &TestEnv,
    key: &str,
    identity: &str,
    digest: DigestAlgorithm,
    format: SignatureFormat,
) -> SignOutcome {
    let config = SignerConfig {
        identity: identity.to_string(),
        digest,
        format,
    };
    let request = SignRequest::new(
        &env.input,
        &env.output,
        fixture_key(key),
        Zeroizing::new(PASSPHRASE.to_string()),
    );
    ReleaseSigner::new(config).sign(&request).expect("signing should succeed")
}

// ============================================================================
// Library pipeline
// ============================================================================

#[test]
fn test_rsa_hello_world_scenario() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_with(
        &env,
        "rsa_secret.asc",
        "releases@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );

    let file = std::fs::read(&env.output).unwrap();
    assert!(file.starts_with(b"-----BEGIN PGP SIGNATURE-----"));

    let (sig, fingerprint) =
        verify_detached(&file, HELLO, &read_fixture_key("rsa_public.asc")).expect("verifies");
    assert_eq!(hex::encode_upper(&fingerprint[12..]), RSA_KEY_ID);
    assert_eq!(outcome.key_id.to_string(), RSA_KEY_ID);
    assert_eq!(outcome.fingerprint.to_string(), hex::encode_upper(&fingerprint));
    assert_eq!(sig.sig_type, 0x00);
    assert_eq!(sig.hash_alg, 8);

    let unrelated = verify_detached(&file, HELLO, &read_fixture_key("unrelated_public.asc"));
    assert!(unrelated.is_err());
}

#[test]
fn test_subpackets_name_the_issuer() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_with(
        &env,
        "rsa_secret.asc",
        "releases@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );

    let sig = read_signature(&std::fs::read(&env.output).unwrap()).unwrap();
    let issuer_fpr = sig.hashed_subpacket(33).expect("issuer fingerprint");
    assert_eq!(issuer_fpr[0], 4);
    assert_eq!(hex::encode_upper(&issuer_fpr[1..]), outcome.fingerprint.to_string());
    assert_eq!(sig.created(), outcome.created);
    let issuer_id = sig
        .unhashed
        .iter()
        .find(|(kind, _)| *kind == 16)
        .map(|(_, data)| hex::encode_upper(data))
        .expect("issuer key id");
    assert_eq!(issuer_id, RSA_KEY_ID);
}

#[test]
fn test_eddsa_signs_with_signing_subkey() {
    let env = TestEnv::with_artifact(b"please_darwin_arm64 contents");
    let outcome = sign_with(
        &env,
        "ed25519_secret.asc",
        "ed-releases@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );
    assert_eq!(outcome.key_id.to_string(), ED25519_SUBKEY_ID);
    assert_ne!(outcome.primary_fingerprint, outcome.fingerprint);
    assert_eq!(outcome.user_id, "Please Releases <ed-releases@please.build>");

    let file = std::fs::read(&env.output).unwrap();
    let (sig, _) = verify_detached(
        &file,
        b"please_darwin_arm64 contents",
        &read_fixture_key("ed25519_public.asc"),
    )
    .expect("verifies");
    assert_eq!(sig.pub_alg, 22);
}

#[test]
fn test_every_digest_verifies() {
    for (digest, id) in [
        (DigestAlgorithm::Sha256, 8),
        (DigestAlgorithm::Sha384, 9),
        (DigestAlgorithm::Sha512, 10),
    ] {
        for (key, public, identity) in [
            ("rsa_secret.asc", "rsa_public.asc", "releases@please.build"),
            ("ed25519_secret.asc", "ed25519_public.asc", "ed-releases@please.build"),
        ] {
            let env = TestEnv::with_artifact(HELLO);
            let outcome = sign_with(&env, key, identity, digest, SignatureFormat::Armored);
            assert_eq!(outcome.digest, digest);

            let file = std::fs::read(&env.output).unwrap();
            let (sig, _) = verify_detached(&file, HELLO, &read_fixture_key(public))
                .unwrap_or_else(|e| panic!("{key} with {digest}: {e}"));
            assert_eq!(sig.hash_alg, id);
        }
    }
}

#[test]
fn test_binary_output() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_with(
        &env,
        "rsa_secret.asc",
        "releases@please.build",
        DigestAlgorithm::Sha512,
        SignatureFormat::Binary,
    );
    assert_eq!(outcome.format, SignatureFormat::Binary);

    let file = std::fs::read(&env.output).unwrap();
    assert_eq!(file[0], 0xC2);
    verify_detached(&file, HELLO, &read_fixture_key("rsa_public.asc")).expect("verifies");
}

#[test]
fn test_full_user_id_selects_entity_in_keyring() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_with(
        &env,
        "keyring_secret.asc",
        "Please Releases <ed-releases@please.build>",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );
    assert_eq!(outcome.key_id.to_string(), ED25519_SUBKEY_ID);

    let file = std::fs::read(&env.output).unwrap();
    verify_detached(&file, HELLO, &read_fixture_key("ed25519_public.asc")).expect("verifies");
    assert!(verify_detached(&file, HELLO, &read_fixture_key("rsa_public.asc")).is_err());
}

#[test]
fn test_keyring_default_identity_picks_rsa_entity() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_with(
        &env,
        "keyring_secret.asc",
        "releases@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );
    assert_eq!(outcome.key_id.to_string(), RSA_KEY_ID);
}

#[test]
fn test_duplicate_identity_uses_first_entity() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_with(
        &env,
        "duplicate_identity_secret.asc",
        "dup@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );
    assert_eq!(outcome.key_id.to_string(), "9530BA695BE9562C");
}

#[test]
fn test_unprotected_key_ignores_passphrase() {
    let env = TestEnv::with_artifact(HELLO);
    let outcome = sign_file(
        &env.input,
        &env.output,
        fixture_key("unprotected_secret.asc"),
        "unprotected@please.build",
        "anything at all",
    )
    .expect("sign");
    assert_eq!(outcome.key_id.to_string(), "944021F4D0F96620");

    let sig = read_signature(&std::fs::read(&env.output).unwrap()).unwrap();
    assert_eq!(hex::encode_upper(&sig.issuer_key_id().unwrap()), "944021F4D0F96620");
}

#[test]
fn test_signing_twice_gives_two_valid_signatures() {
    let env = TestEnv::with_artifact(HELLO);
    let public = read_fixture_key("ed25519_public.asc");
    let second_output = env.path("second.asc");

    let first = sign_with(
        &env,
        "ed25519_secret.asc",
        "ed-releases@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );
    let request = SignRequest::new(
        &env.input,
        &second_output,
        fixture_key("ed25519_secret.asc"),
        Zeroizing::new(PASSPHRASE.to_string()),
    )
    .with_identity("ed-releases@please.build");
    let later = Utc.timestamp_opt(i64::from(first.created) + 60, 0).single().unwrap();
    let second = ReleaseSigner::new(SignerConfig::default())
        .with_clock(later)
        .sign(&request)
        .expect("second signature");

    let first_file = std::fs::read(&env.output).unwrap();
    let second_file = std::fs::read(&second_output).unwrap();
    assert_ne!(first_file, second_file);
    assert_ne!(first.created, second.created);
    verify_detached(&first_file, HELLO, &public).expect("first verifies");
    verify_detached(&second_file, HELLO, &public).expect("second verifies");
}

#[test]
fn test_pinned_clock_sets_creation_time() {
    let env = TestEnv::with_artifact(HELLO);
    let request = SignRequest::new(
        &env.input,
        &env.output,
        fixture_key("rsa_secret.asc"),
        Zeroizing::new(PASSPHRASE.to_string()),
    );
    let outcome = ReleaseSigner::new(SignerConfig::default())
        .with_clock(Utc.timestamp_opt(FIXED_TIME, 0).single().unwrap())
        .sign(&request)
        .expect("sign");
    assert_eq!(i64::from(outcome.created), FIXED_TIME);

    let (sig, _) = verify_detached(
        &std::fs::read(&env.output).unwrap(),
        HELLO,
        &read_fixture_key("rsa_public.asc"),
    )
    .expect("verifies");
    assert_eq!(i64::from(sig.created()), FIXED_TIME);
}

#[test]
fn test_existing_signature_is_replaced() {
    let env = TestEnv::with_artifact(HELLO);
    std::fs::write(&env.output, b"stale signature from last release").unwrap();

    sign_with(
        &env,
        "rsa_secret.asc",
        "releases@please.build",
        DigestAlgorithm::Sha256,
        SignatureFormat::Armored,
    );
    let file = std::fs::read(&env.output).unwrap();
    verify_detached(&file, HELLO, &read_fixture_key("rsa_public.asc")).expect("verifies");
    let leftovers: Vec<_> = std::fs::read_dir(env.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn test_empty_and_large_artifacts() {
    let large: Vec<u8> = (0..3 * 1024 * 1024 + 7).map(|i| (i % 251) as u8).collect();
    for contents in [Vec::new(), large] {
        let env = TestEnv::with_artifact(&contents);
        sign_with(
            &env,
            "ed25519_secret.asc",
            "ed-releases@please.build",
            DigestAlgorithm::Sha512,
            SignatureFormat::Binary,
        );
        let file = std::fs::read(&env.output).unwrap();
        verify_detached(&file, &contents, &read_fixture_key("ed25519_public.asc"))
            .unwrap_or_else(|e| panic!("{} byte artifact: {e}", contents.len()));
    }
}

// ============================================================================
// CLI command
// ============================================================================

#[test]
fn test_sign_command_applies_flags() {
    let env = TestEnv::with_artifact(HELLO);
    let args = SignArgs {
        input: env.input.clone(),
        output: env.output.clone(),
        key: fixture_key("keyring_secret.asc"),
        user: Some("ed-releases@please.build".to_string()),
        digest: Some(DigestArg::Sha384),
        binary: true,
        passphrase_file: None,
    };
    let config = Config::builder().digest(DigestAlgorithm::Sha512).build();

    let outcome = SignCommand::new(args, None)
        .run_with_passphrase(&config, Zeroizing::new(PASSPHRASE.to_string()))
        .expect("sign");
    assert_eq!(outcome.digest, DigestAlgorithm::Sha384);
    assert_eq!(outcome.format, SignatureFormat::Binary);

    let file = std::fs::read(&env.output).unwrap();
    let (sig, _) =
        verify_detached(&file, HELLO, &read_fixture_key("ed25519_public.asc")).expect("verifies");
    assert_eq!(sig.hash_alg, 9);
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_binary_signs_with_env_passphrase() {
    let env = TestEnv::with_artifact(HELLO);
    let output = relsign(&env)
        .env("RELSIGN_PASSPHRASE", PASSPHRASE)
        .args(["sign", "-i"])
        .arg(&env.input)
        .arg("-o")
        .arg(&env.output)
        .arg("-k")
        .arg(fixture_key("rsa_secret.asc"))
        .output()
        .expect("run relsign");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());
    let file = std::fs::read(&env.output).unwrap();
    verify_detached(&file, HELLO, &read_fixture_key("rsa_public.asc")).expect("verifies");
}

#[test]
fn test_binary_reads_legacy_env_and_out_variable() {
    let env = TestEnv::with_artifact(HELLO);
    let output = relsign(&env)
        .env("GPG_PASSWORD", PASSPHRASE)
        .env("OUT", &env.output)
        .args(["sign", "-u", "ed-releases@please.build", "--binary", "-i"])
        .arg(&env.input)
        .arg("-k")
        .arg(fixture_key("ed25519_secret.asc"))
        .output()
        .expect("run relsign");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let file = std::fs::read(&env.output).unwrap();
    assert_eq!(file[0], 0xC2);
    verify_detached(&file, HELLO, &read_fixture_key("ed25519_public.asc")).expect("verifies");
}

#[test]
fn test_binary_reads_passphrase_file_and_config() {
    let env = TestEnv::with_artifact(HELLO);
    let passphrase_file = env.path("passphrase");
    std::fs::write(&passphrase_file, format!("{PASSPHRASE}\n")).unwrap();
    let config = env.path("relsign.toml");
    std::fs::write(
        &config,
        "[signing]\nidentity = \"ed-releases@please.build\"\ndigest = \"sha512\"\n",
    )
    .unwrap();

    let output = relsign(&env)
        .arg("--config")
        .arg(&config)
        .args(["sign", "-i"])
        .arg(&env.input)
        .arg("-o")
        .arg(&env.output)
        .arg("-k")
        .arg(fixture_key("keyring_secret.asc"))
        .arg("--passphrase-file")
        .arg(&passphrase_file)
        .output()
        .expect("run relsign");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let (sig, _) = verify_detached(
        &std::fs::read(&env.output).unwrap(),
        HELLO,
        &read_fixture_key("ed25519_public.asc"),
    )
    .expect("verifies");
    assert_eq!(sig.hash_alg, 10);
}

#[test]
fn test_binary_config_path_and_show() {
    let env = TestEnv::with_artifact(HELLO);

    let output = relsign(&env).args(["config", "path"]).output().expect("run relsign");
    assert!(output.status.success());
    let printed = String::from_utf8(output.stdout).unwrap();
    assert!(printed.trim_end().ends_with(".relsign/config.toml"), "{printed}");

    let output = relsign(&env).arg("config").output().expect("run relsign");
    assert!(output.status.success());
    let shown: Config = toml::from_str(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(shown, Config::default());
}

#[test]
fn test_binary_config_init_sets_default_identity() {
    let env = TestEnv::with_artifact(HELLO);

    let output = relsign(&env)
        .args(["config", "init", "-u", "ed-releases@please.build", "--digest", "sha512"])
        .output()
        .expect("run relsign");
    assert!(output.status.success());
    assert!(env.dir.path().join(".relsign/config.toml").exists());

    let output = relsign(&env).args(["config", "init"]).output().expect("run relsign");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = relsign(&env)
        .env("RELSIGN_PASSPHRASE", PASSPHRASE)
        .args(["sign", "-i"])
        .arg(&env.input)
        .arg("-o")
        .arg(&env.output)
        .arg("-k")
        .arg(fixture_key("keyring_secret.asc"))
        .output()
        .expect("run relsign");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let file = std::fs::read(&env.output).unwrap();
    let (sig, _) =
        verify_detached(&file, HELLO, &read_fixture_key("ed25519_public.asc")).expect("verifies");
    assert_eq!(sig.hash_alg, DigestAlgorithm::Sha512.openpgp_id());
}
