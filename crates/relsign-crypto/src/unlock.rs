//! Unlocking secret keys with a passphrase.
//!
//! [`unlock`] turns a [`LockedKey`] into an [`UnlockedKey`]:
//!
//! 1. derive the cipher key from the passphrase with the key's S2K specifier
//! 2. decrypt the secret blob in CFB mode with the packet's IV
//! 3. verify the trailing SHA-1 (usage 254) or 16-bit checksum (usage 255)
//! 4. parse the secret MPIs and build the signing key
//! 5. check the signing key against the public key
//!
//! Any failure from step 3 on is reported as
//! [`SigningFailure::IncorrectPassphrase`]: with CFB, a wrong passphrase
//! simply yields garbage plaintext.
//!
//! # Security
//!
//! - The derived key, the plaintext and every parsed secret integer are held
//!   in zeroizing containers.
//! - `rsa::RsaPrivateKey` and `ed25519_dalek::SigningKey` wipe themselves on
//!   drop, so an [`UnlockedKey`] leaves nothing behind once dropped.
//! - `Debug` output never includes secret material.

use crate::bundle::{
    EncryptedSecret, LockedKey, ProtectionCheck, PublicKey, PublicKeyAlgorithm, PublicParams,
    SecretMaterial,
};
use crate::packet::BodyReader;
use crate::s2k::SymmetricAlgorithm;
use crate::signature::{DigestSigner, SignatureValue};
use cfb_mode::cipher::{AsyncStreamCipher, InvalidLength, KeyIvInit};
use relsign_core::error::SigningFailure;
use relsign_core::types::DigestAlgorithm;
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Decrypted signing material.
pub enum SigningMaterial {
    /// RSA private key.
    Rsa(RsaPrivateKey),
    /// Ed25519 signing key, for both legacy EdDSA and native Ed25519 keys.
    Ed25519(ed25519_dalek::SigningKey),
}

/// A key ready to sign.
///
/// Owned by exactly one signing run and dropped as soon as the signature
/// packet exists.
pub struct UnlockedKey {
    public: PublicKey,
    material: SigningMaterial,
}

impl UnlockedKey {
    /// The public key this secret belongs to.
    #[must_use]
    pub const fn public(&self) -> &PublicKey {
        &self.public
    }

    /// The decrypted material.
    #[must_use]
    pub const fn material(&self) -> &SigningMaterial {
        &self.material
    }
}

impl std::fmt::Debug for UnlockedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockedKey")
            .field("key_id", &self.public.key_id())
            .field("algorithm", &self.public.algorithm())
            .field("material", &"[REDACTED]")
            .finish()
    }
}

impl DigestSigner for UnlockedKey {
    fn public_key(&self) -> &PublicKey {
        &self.public
    }

    fn sign_digest(
        &self,
        hash: DigestAlgorithm,
        digest: &[u8],
    ) -> Result<SignatureValue, SigningFailure> {
        match &self.material {
            SigningMaterial::Rsa(key) => {
                let padding = match hash {
                    DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                    DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
                    DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
                };
                let s = key
                    .sign_with_rng(&mut rand::rngs::OsRng, padding, digest)
                    .map_err(|e| SigningFailure::signing(format!("RSA signing failed: {e}")))?;
                Ok(SignatureValue::Rsa { s })
            }
            SigningMaterial::Ed25519(key) => {
                use ed25519_dalek::Signer as _;
                let bytes = key.sign(digest).to_bytes();
                if self.public.algorithm() == PublicKeyAlgorithm::Ed25519 {
                    Ok(SignatureValue::Ed25519 { sig: bytes })
                } else {
                    let (r, s) = bytes.split_at(32);
                    Ok(SignatureValue::EdDsaLegacy {
                        r: r.to_vec(),
                        s: s.to_vec(),
                    })
                }
            }
        }
    }
}

/// Decrypts `locked` with `passphrase`.
///
/// Unprotected keys ignore the passphrase.
///
/// # Errors
///
/// - [`SigningFailure::IncorrectPassphrase`] if the decrypted data fails its
///   checksum, does not parse, or does not match the public key
/// - [`SigningFailure::UnsupportedCipher`] for ciphers, S2K types or
///   protection modes that are not implemented
/// - [`SigningFailure::KeyParse`] if an unprotected key is corrupt
pub fn unlock(locked: LockedKey, passphrase: &[u8]) -> Result<UnlockedKey, SigningFailure> {
    let LockedKey { public, secret, .. } = locked;

    let material = match &secret {
        SecretMaterial::Cleartext(data) => {
            tracing::debug!(key_id = %public.key_id(), "key is not passphrase protected; passphrase ignored");
            let body = strip_checksum(data).ok_or_else(|| {
                SigningFailure::key_parse("unprotected secret key checksum mismatch")
            })?;
            parse_material(&public, body).map_err(|reason| {
                SigningFailure::key_parse(format!("unprotected secret key is invalid: {reason}"))
            })?
        }
        SecretMaterial::Encrypted(encrypted) => {
            let plaintext = decrypt(encrypted, passphrase)?;
            let body = match encrypted.check {
                ProtectionCheck::Sha1 => strip_sha1(&plaintext),
                ProtectionCheck::Checksum => strip_checksum(&plaintext),
            }
            .ok_or(SigningFailure::IncorrectPassphrase)?;
            parse_material(&public, body).map_err(|reason| {
                tracing::debug!(key_id = %public.key_id(), %reason, "decrypted key rejected");
                SigningFailure::IncorrectPassphrase
            })?
        }
        SecretMaterial::Unsupported { reason } => {
            return Err(SigningFailure::unsupported_cipher(reason.clone()))
        }
        SecretMaterial::Absent => {
            return Err(SigningFailure::unsupported_cipher(
                "secret key material is not stored in the key file",
            ))
        }
    };

    tracing::debug!(key_id = %public.key_id(), "secret key unlocked");
    Ok(UnlockedKey { public, material })
}

fn decrypt(
    encrypted: &EncryptedSecret,
    passphrase: &[u8],
) -> Result<Zeroizing<Vec<u8>>, SigningFailure> {
    let cipher = encrypted.cipher;
    let key_size = match cipher.key_size() {
        Some(size) if cipher.is_supported() => size,
        _ => return Err(SigningFailure::unsupported_cipher(format!("cipher {cipher}"))),
    };

    let key = encrypted.s2k.derive_key(passphrase, key_size)?;
    let mut buf = Zeroizing::new(encrypted.data.clone());
    cfb_decrypt(cipher, &key, &encrypted.iv, &mut buf)?;
    Ok(buf)
}

fn cfb_decrypt(
    cipher: SymmetricAlgorithm,
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
) -> Result<(), SigningFailure> {
    let invalid =
        |_: InvalidLength| SigningFailure::key_parse(format!("invalid key or IV length for {cipher}"));
    match cipher {
        SymmetricAlgorithm::Aes128 => cfb_mode::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        SymmetricAlgorithm::Aes192 => cfb_mode::Decryptor::<aes::Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        SymmetricAlgorithm::Aes256 => cfb_mode::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        SymmetricAlgorithm::Cast5 => cfb_mode::Decryptor::<cast5::Cast5>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        other => return Err(SigningFailure::unsupported_cipher(format!("cipher {other}"))),
    }
    Ok(())
}

/// 16-bit sum of all octets, as used by usage 0 and 255.
fn checksum16(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

fn strip_checksum(plaintext: &[u8]) -> Option<&[u8]> {
    let split = plaintext.len().checked_sub(2)?;
    let (body, trailer) = plaintext.split_at(split);
    let expected = u16::from_be_bytes([*trailer.first()?, *trailer.get(1)?]);
    (checksum16(body) == expected).then_some(body)
}

fn strip_sha1(plaintext: &[u8]) -> Option<&[u8]> {
    let split = plaintext.len().checked_sub(20)?;
    let (body, trailer) = plaintext.split_at(split);
    let digest = Sha1::digest(body);
    bool::from(digest.as_slice().ct_eq(trailer)).then_some(body)
}

/// Builds signing material from the secret MPIs and checks it against `public`.
fn parse_material(public: &PublicKey, secret: &[u8]) -> Result<SigningMaterial, String> {
    let mut r = BodyReader::new(secret);
    match public.params() {
        PublicParams::Rsa { n, e } => {
            // secret integers are wiped on every return path
            let mut next = || {
                r.mpi()
                    .map(|m| Zeroizing::new(BigUint::from_bytes_be(m)))
                    .map_err(|e| e.to_string())
            };
            let d = next()?;
            let p = next()?;
            let q = next()?;
            // u = p^-1 mod q is recomputed by the rsa crate
            let _u = next()?;

            let n = BigUint::from_bytes_be(n);
            if &*p * &*q != n {
                return Err("RSA primes do not match the public modulus".to_string());
            }
            let mut key = RsaPrivateKey::from_components(
                n,
                BigUint::from_bytes_be(e),
                (*d).clone(),
                vec![(*p).clone(), (*q).clone()],
            )
            .map_err(|e| format!("RSA key: {e}"))?;
            key.validate().map_err(|e| format!("RSA key: {e}"))?;
            key.precompute().map_err(|e| format!("RSA key: {e}"))?;
            Ok(SigningMaterial::Rsa(key))
        }
        PublicParams::EdDsaLegacy { point, .. } => {
            let scalar = r.mpi().map_err(|e| e.to_string())?;
            if scalar.len() > 32 {
                return Err("EdDSA secret scalar is longer than 32 octets".to_string());
            }
            let mut seed = Zeroizing::new([0u8; 32]);
            if let Some(tail) = seed.get_mut(32 - scalar.len()..) {
                tail.copy_from_slice(scalar);
            }
            ed25519_material(&seed, point.get(1..).unwrap_or_default())
        }
        PublicParams::Ed25519 { key } => {
            let seed = Zeroizing::new(r.array::<32>().map_err(|e| e.to_string())?);
            ed25519_material(&seed, key)
        }
        PublicParams::Other => Err(format!("unsupported algorithm: {}", public.algorithm())),
    }
}

fn ed25519_material(seed: &[u8; 32], expected_public: &[u8]) -> Result<SigningMaterial, String> {
    let key = ed25519_dalek::SigningKey::from_bytes(seed);
    if key.verifying_key().as_bytes().as_slice() != expected_public {
        return Err("Ed25519 secret does not match the public key".to_string());
    }
    Ok(SigningMaterial::Ed25519(key))
}
