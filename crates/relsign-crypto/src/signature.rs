//! Detached v4 signature creation.
//!
//! The [`SignatureEngine`] streams a document through the configured digest,
//! appends the v4 hashed trailer and asks a [`DigestSigner`] for the
//! signature value. The result is a [`SignaturePacket`] that serializes to a
//! complete new-format signature packet.
//!
//! # Hashed data
//!
//! ```text
//! document || 0x04 0x00 alg hash len16 hashed-subpackets || 0x04 0xFF len32
//! ```
//!
//! where `len32` counts the octets from the version octet to the end of the
//! hashed subpackets.
//!
//! # Example
//!
//! ```no_run
//! use relsign_crypto::signature::SignatureEngine;
//! use relsign_core::types::DigestAlgorithm;
//! # fn example(key: &relsign_crypto::unlock::UnlockedKey) -> Result<(), relsign_core::SigningFailure> {
//! let file = std::fs::File::open("release.tar.gz").map_err(|e| {
//!     relsign_core::SigningFailure::signing(format!("failed to open input: {e}"))
//! })?;
//! let packet = SignatureEngine::new(key, DigestAlgorithm::Sha256).sign_reader(file)?;
//! let bytes = packet.to_bytes();
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

use crate::bundle::{PublicKey, PublicKeyAlgorithm};
use crate::packet::{write_header, write_mpi, Tag};
use chrono::{DateTime, Utc};
use relsign_core::error::SigningFailure;
use relsign_core::types::{DigestAlgorithm, Fingerprint, KeyId};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::io::{ErrorKind, Read};

/// Size of the read buffer used while hashing the document.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Signature type for a binary document.
pub const SIG_TYPE_BINARY: u8 = 0x00;

const SUBPACKET_CREATION_TIME: u8 = 2;
const SUBPACKET_ISSUER_KEY_ID: u8 = 16;
const SUBPACKET_ISSUER_FINGERPRINT: u8 = 33;

// ============================================================================
// Signer seam
// ============================================================================

/// Algorithm-specific signature value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureValue {
    /// RSA signature `m^d mod n`.
    Rsa {
        /// Signature integer, big-endian.
        s: Vec<u8>,
    },
    /// Legacy EdDSA signature, `R` and `S` as separate MPIs.
    EdDsaLegacy {
        /// `R`, 32 octets.
        r: Vec<u8>,
        /// `S`, 32 octets.
        s: Vec<u8>,
    },
    /// Native Ed25519 signature, 64 raw octets.
    Ed25519 {
        /// `R || S`.
        sig: [u8; 64],
    },
}

impl SignatureValue {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Rsa { s } => write_mpi(out, s),
            Self::EdDsaLegacy { r, s } => {
                write_mpi(out, r);
                write_mpi(out, s);
            }
            Self::Ed25519 { sig } => out.extend_from_slice(sig),
        }
    }
}

/// Something that can sign a finished digest with a private key.
///
/// Implemented by [`UnlockedKey`](crate::unlock::UnlockedKey).
pub trait DigestSigner: Send + Sync {
    /// Public half of the signing key.
    fn public_key(&self) -> &PublicKey;

    /// Signs `digest`, which was produced by `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::Signing`] if the primitive fails.
    fn sign_digest(
        &self,
        hash: DigestAlgorithm,
        digest: &[u8],
    ) -> Result<SignatureValue, SigningFailure>;
}

// ============================================================================
// Signature packet
// ============================================================================

/// A finished v4 detached signature over a binary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePacket {
    algorithm: PublicKeyAlgorithm,
    digest: DigestAlgorithm,
    created: u32,
    issuer: Fingerprint,
    hashed_area: Vec<u8>,
    unhashed_area: Vec<u8>,
    left16: [u8; 2],
    value: SignatureValue,
}

impl SignaturePacket {
    /// Public-key algorithm of the issuing key.
    #[must_use]
    pub const fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    /// Digest algorithm used over the document.
    #[must_use]
    pub const fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Signature creation time in seconds since the epoch.
    #[must_use]
    pub const fn created(&self) -> u32 {
        self.created
    }

    /// Fingerprint of the issuing key.
    #[must_use]
    pub const fn issuer(&self) -> Fingerprint {
        self.issuer
    }

    /// Key ID of the issuing key.
    #[must_use]
    pub fn issuer_key_id(&self) -> KeyId {
        self.issuer.key_id()
    }

    /// Leftmost two octets of the digest.
    #[must_use]
    pub const fn left16(&self) -> [u8; 2] {
        self.left16
    }

    /// The signature value.
    #[must_use]
    pub const fn value(&self) -> &SignatureValue {
        &self.value
    }

    /// The packet body, without the packet header.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut body = hashed_prefix(self.algorithm, self.digest, &self.hashed_area);
        push_area(&mut body, &self.unhashed_area);
        body.extend_from_slice(&self.left16);
        self.value.write(&mut body);
        body
    }

    /// The complete signature packet (tag 2, new-format header).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.body();
        let mut out = Vec::with_capacity(body.len() + 6);
        write_header(&mut out, Tag::Signature, body.len());
        out.extend_from_slice(&body);
        out
    }
}

/// Version, type, algorithms and the hashed subpacket area.
fn hashed_prefix(algorithm: PublicKeyAlgorithm, digest: DigestAlgorithm, hashed: &[u8]) -> Vec<u8> {
    let mut out = vec![4, SIG_TYPE_BINARY, algorithm.id(), digest.openpgp_id()];
    push_area(&mut out, hashed);
    out
}

fn push_area(out: &mut Vec<u8>, area: &[u8]) {
    // areas built here are a few dozen octets
    let len = u16::try_from(area.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(area);
}

fn push_subpacket(out: &mut Vec<u8>, kind: u8, data: &[u8]) {
    // one-octet length covers type plus data for every subpacket we emit
    let len = u8::try_from(data.len() + 1).unwrap_or(u8::MAX);
    out.push(len);
    out.push(kind);
    out.extend_from_slice(data);
}

// ============================================================================
// Streaming digest
// ============================================================================

enum DocumentHasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl DocumentHasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Self::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha384(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Produces detached signatures with one key.
#[derive(Debug)]
pub struct SignatureEngine<'a, S: DigestSigner> {
    signer: &'a S,
    digest: DigestAlgorithm,
    created: Option<DateTime<Utc>>,
}

impl<'a, S: DigestSigner> SignatureEngine<'a, S> {
    /// Creates an engine signing with `signer` over `digest`.
    #[must_use]
    pub const fn new(signer: &'a S, digest: DigestAlgorithm) -> Self {
        Self {
            signer,
            digest,
            created: None,
        }
    }

    /// Fixes the signature creation time instead of reading the clock.
    #[must_use]
    pub const fn with_creation_time(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Signs everything `reader` yields.
    ///
    /// The document is read in [`CHUNK_SIZE`] pieces and never held in
    /// memory as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::Signing`] if reading fails, if the creation
    /// time does not fit in 32 bits, or if the signing primitive fails.
    pub fn sign_reader<R: Read>(&self, mut reader: R) -> Result<SignaturePacket, SigningFailure> {
        let public = self.signer.public_key();
        public
            .signing_support()
            .map_err(SigningFailure::signing)?;

        let created_at = self.created.unwrap_or_else(Utc::now);
        let created = u32::try_from(created_at.timestamp()).map_err(|_| {
            SigningFailure::signing(format!("creation time {created_at} is out of range"))
        })?;

        let mut hasher = DocumentHasher::new(self.digest);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(SigningFailure::signing(format!("failed to read input: {e}")))
                }
            };
            if let Some(chunk) = buf.get(..n) {
                hasher.update(chunk);
            }
            total += n as u64;
        }

        let issuer = public.fingerprint();
        let mut hashed_area = Vec::with_capacity(30);
        push_subpacket(&mut hashed_area, SUBPACKET_CREATION_TIME, &created.to_be_bytes());
        let mut issuer_fpr = Vec::with_capacity(21);
        issuer_fpr.push(4);
        issuer_fpr.extend_from_slice(issuer.as_bytes());
        push_subpacket(&mut hashed_area, SUBPACKET_ISSUER_FINGERPRINT, &issuer_fpr);

        let mut unhashed_area = Vec::with_capacity(10);
        push_subpacket(
            &mut unhashed_area,
            SUBPACKET_ISSUER_KEY_ID,
            issuer.key_id().as_bytes(),
        );

        let prefix = hashed_prefix(public.algorithm(), self.digest, &hashed_area);
        hasher.update(&prefix);
        let prefix_len = u32::try_from(prefix.len()).unwrap_or(u32::MAX);
        hasher.update(&[4, 0xFF]);
        hasher.update(&prefix_len.to_be_bytes());
        let digest = hasher.finalize();

        let left16 = match digest.as_slice() {
            [a, b, ..] => [*a, *b],
            _ => return Err(SigningFailure::signing("digest is shorter than two octets")),
        };

        let value = self.signer.sign_digest(self.digest, &digest)?;
        tracing::debug!(
            key_id = %issuer.key_id(),
            digest = %self.digest,
            bytes = total,
            created,
            "document signed"
        );

        Ok(SignaturePacket {
            algorithm: public.algorithm(),
            digest: self.digest,
            created,
            issuer,
            hashed_area,
            unhashed_area,
            left16,
            value,
        })
    }

    /// Signs an in-memory document.
    ///
    /// # Errors
    ///
    /// See [`sign_reader`](Self::sign_reader).
    pub fn sign_bytes(&self, data: &[u8]) -> Result<SignaturePacket, SigningFailure> {
        self.sign_reader(data)
    }
}
