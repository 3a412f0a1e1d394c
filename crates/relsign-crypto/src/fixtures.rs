//! GnuPG-generated keys shared by the unit tests.

#![allow(clippy::expect_used, clippy::indexing_slicing)]

use crate::bundle::{KeyBundle, PublicKey};
use crate::signature::{DigestSigner, SignatureEngine, SignaturePacket, SignatureValue};
use relsign_core::error::SigningFailure;
use relsign_core::types::DigestAlgorithm;

/// Passphrase protecting every fixture secret key except the unprotected one.
pub const PASSPHRASE: &str = "correct horse battery staple";

/// RSA-2048 primary (sign + certify) for `releases@please.build`, plus an
/// encryption-only RSA subkey.
pub const RSA_SECRET: &[u8] = include_bytes!("../../../tests/fixtures/keys/rsa_secret.asc");

/// Public half of [`RSA_SECRET`].
pub const RSA_PUBLIC: &[u8] = include_bytes!("../../../tests/fixtures/keys/rsa_public.asc");

/// Certify-only EdDSA primary, EdDSA signing subkey and cv25519 encryption
/// subkey for `Please Releases <ed-releases@please.build>`.
pub const ED25519_SECRET: &[u8] =
    include_bytes!("../../../tests/fixtures/keys/ed25519_secret.asc");

/// Certify-only primary with a single cv25519 encryption subkey.
pub const ENCRYPT_ONLY_SECRET: &[u8] =
    include_bytes!("../../../tests/fixtures/keys/encrypt_only_secret.asc");

/// EdDSA key stored without passphrase protection.
pub const UNPROTECTED_SECRET: &[u8] =
    include_bytes!("../../../tests/fixtures/keys/unprotected_secret.asc");

/// Two entities that both carry the user ID `dup@please.build`.
pub const DUPLICATE_IDENTITY_SECRET: &[u8] =
    include_bytes!("../../../tests/fixtures/keys/duplicate_identity_secret.asc");

/// The RSA, EdDSA and encrypt-only entities in one armor block.
pub const KEYRING_SECRET: &[u8] =
    include_bytes!("../../../tests/fixtures/keys/keyring_secret.asc");

/// Fingerprint of the RSA primary key.
pub const RSA_FINGERPRINT: &str = "0D81BA9589B472CA8440F7B1015FE495FB247602";

/// Fingerprint of the EdDSA signing subkey.
pub const ED25519_SIGNING_SUBKEY_FINGERPRINT: &str = "0614D696944706418BC311C07BFDE607D354ABEA";

/// Fingerprint of the first `dup@please.build` entity.
pub const FIRST_DUPLICATE_FINGERPRINT: &str = "81AB83F85256EB5EC1B3E9159530BA695BE9562C";

/// Public half of the RSA fixture primary key.
pub fn rsa_public_key() -> PublicKey {
    KeyBundle::parse_armored(RSA_PUBLIC)
        .expect("parse RSA fixture")
        .entities()[0]
        .primary
        .public
        .clone()
}

/// Signer that returns a fixed two-octet RSA value, for checking layout and
/// serialization without a private key.
pub struct FixedSigner(pub PublicKey);

impl DigestSigner for FixedSigner {
    fn public_key(&self) -> &PublicKey {
        &self.0
    }

    fn sign_digest(
        &self,
        _: DigestAlgorithm,
        _: &[u8],
    ) -> Result<SignatureValue, SigningFailure> {
        Ok(SignatureValue::Rsa { s: vec![0x01, 0x02] })
    }
}

/// A packet signed by [`FixedSigner`] at a fixed time.
pub fn sample_packet() -> SignaturePacket {
    let signer = FixedSigner(rsa_public_key());
    SignatureEngine::new(&signer, DigestAlgorithm::Sha256)
        .with_creation_time(
            chrono::TimeZone::timestamp_opt(&chrono::Utc, 1_800_000_000, 0)
                .single()
                .expect("valid timestamp"),
        )
        .sign_bytes(b"hello world\n")
        .expect("sign")
}
