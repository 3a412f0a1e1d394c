//! String-to-key (S2K) specifiers and passphrase key derivation.
//!
//! Supported specifiers:
//!
//! | Type | Name | Derivation |
//! |------|------|------------|
//! | 0 | simple | `H(passphrase)` |
//! | 1 | salted | `H(salt || passphrase)` |
//! | 3 | iterated and salted | `H` over `count` octets of repeated `salt || passphrase` |
//! | 4 | Argon2 | Argon2id with the packet's `t`, `p` and `2^m` KiB |
//! | 101 | GNU extension | no secret material present |
//!
//! When the cipher key is longer than the digest, further hash contexts are
//! preloaded with one, two, ... zero octets and their outputs concatenated.
//!
//! # Security
//!
//! Derived keys and the salted passphrase buffer live in [`Zeroizing`]
//! containers and are wiped on drop.

use crate::packet::BodyReader;
use relsign_core::error::SigningFailure;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use zeroize::Zeroizing;

// ============================================================================
// Symmetric algorithms
// ============================================================================

/// Symmetric cipher protecting a secret key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetricAlgorithm {
    /// IDEA (1).
    Idea,
    /// TripleDES (2).
    TripleDes,
    /// CAST5 (3).
    Cast5,
    /// Blowfish (4).
    Blowfish,
    /// AES with a 128-bit key (7).
    Aes128,
    /// AES with a 192-bit key (8).
    Aes192,
    /// AES with a 256-bit key (9).
    Aes256,
    /// Twofish (10).
    Twofish,
    /// Camellia with a 128-bit key (11).
    Camellia128,
    /// Camellia with a 192-bit key (12).
    Camellia192,
    /// Camellia with a 256-bit key (13).
    Camellia256,
    /// Any other identifier.
    Unknown(u8),
}

impl SymmetricAlgorithm {
    /// Maps an OpenPGP symmetric algorithm identifier.
    #[must_use]
    pub const fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Idea,
            2 => Self::TripleDes,
            3 => Self::Cast5,
            4 => Self::Blowfish,
            7 => Self::Aes128,
            8 => Self::Aes192,
            9 => Self::Aes256,
            10 => Self::Twofish,
            11 => Self::Camellia128,
            12 => Self::Camellia192,
            13 => Self::Camellia256,
            other => Self::Unknown(other),
        }
    }

    /// Block size in octets, if the algorithm is known.
    #[must_use]
    pub const fn block_size(self) -> Option<usize> {
        match self {
            Self::Idea | Self::TripleDes | Self::Cast5 | Self::Blowfish => Some(8),
            Self::Aes128
            | Self::Aes192
            | Self::Aes256
            | Self::Twofish
            | Self::Camellia128
            | Self::Camellia192
            | Self::Camellia256 => Some(16),
            Self::Unknown(_) => None,
        }
    }

    /// Key size in octets, if the algorithm is known.
    #[must_use]
    pub const fn key_size(self) -> Option<usize> {
        match self {
            Self::Idea | Self::Cast5 | Self::Blowfish | Self::Aes128 | Self::Camellia128 => {
                Some(16)
            }
            Self::TripleDes | Self::Aes192 | Self::Camellia192 => Some(24),
            Self::Aes256 | Self::Twofish | Self::Camellia256 => Some(32),
            Self::Unknown(_) => None,
        }
    }

    /// Whether secret keys protected with this cipher can be decrypted.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Cast5 | Self::Aes128 | Self::Aes192 | Self::Aes256
        )
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idea => f.write_str("IDEA"),
            Self::TripleDes => f.write_str("TripleDES"),
            Self::Cast5 => f.write_str("CAST5"),
            Self::Blowfish => f.write_str("Blowfish"),
            Self::Aes128 => f.write_str("AES-128"),
            Self::Aes192 => f.write_str("AES-192"),
            Self::Aes256 => f.write_str("AES-256"),
            Self::Twofish => f.write_str("Twofish"),
            Self::Camellia128 => f.write_str("Camellia-128"),
            Self::Camellia192 => f.write_str("Camellia-192"),
            Self::Camellia256 => f.write_str("Camellia-256"),
            Self::Unknown(id) => write!(f, "symmetric algorithm {id}"),
        }
    }
}

// ============================================================================
// S2K specifiers
// ============================================================================

/// A parsed S2K specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S2k {
    /// Type 0.
    Simple {
        /// OpenPGP hash algorithm identifier.
        hash: u8,
    },
    /// Type 1.
    Salted {
        /// OpenPGP hash algorithm identifier.
        hash: u8,
        /// Eight octets of salt.
        salt: [u8; 8],
    },
    /// Type 3.
    IteratedSalted {
        /// OpenPGP hash algorithm identifier.
        hash: u8,
        /// Eight octets of salt.
        salt: [u8; 8],
        /// Coded octet count.
        count: u8,
    },
    /// Type 4.
    Argon2 {
        /// Sixteen octets of salt.
        salt: [u8; 16],
        /// Number of passes.
        t: u8,
        /// Degree of parallelism.
        p: u8,
        /// Memory size exponent, `2^m` KiB.
        m: u8,
    },
    /// Type 101 (GnuPG): the secret is not stored in this packet.
    GnuDummy {
        /// GNU protection mode (1: no secret, 2: on a smartcard).
        mode: u8,
    },
}

impl S2k {
    /// Parses a specifier.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if the specifier is truncated and
    /// [`SigningFailure::UnsupportedCipher`] for unknown S2K types.
    pub fn parse(reader: &mut BodyReader<'_>) -> Result<Self, SigningFailure> {
        let kind = reader.u8()?;
        match kind {
            0 => Ok(Self::Simple { hash: reader.u8()? }),
            1 => Ok(Self::Salted {
                hash: reader.u8()?,
                salt: reader.array()?,
            }),
            3 => Ok(Self::IteratedSalted {
                hash: reader.u8()?,
                salt: reader.array()?,
                count: reader.u8()?,
            }),
            4 => Ok(Self::Argon2 {
                salt: reader.array()?,
                t: reader.u8()?,
                p: reader.u8()?,
                m: reader.u8()?,
            }),
            101 => {
                let _hash = reader.u8()?;
                let marker = reader.take(3)?;
                if marker != b"GNU" {
                    return Err(SigningFailure::unsupported_cipher(
                        "private S2K extension 101 without GNU marker",
                    ));
                }
                let mode = reader.u8()?;
                if mode == 2 {
                    // smartcard serial number
                    let _serial = reader.length_prefixed()?;
                }
                Ok(Self::GnuDummy { mode })
            }
            other => Err(SigningFailure::unsupported_cipher(format!(
                "S2K type {other}"
            ))),
        }
    }

    /// Whether this specifier stands in for secret material stored elsewhere.
    #[must_use]
    pub const fn is_gnu_dummy(&self) -> bool {
        matches!(self, Self::GnuDummy { .. })
    }

    /// Derives a `key_len` octet key from `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::UnsupportedCipher`] for hash algorithms other
    /// than SHA-1 and the SHA-2 family, for invalid Argon2 parameters, and for
    /// GNU dummy specifiers.
    pub fn derive_key(
        &self,
        passphrase: &[u8],
        key_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, SigningFailure> {
        let (hash, salt, count): (u8, &[u8], Option<usize>) = match self {
            Self::Simple { hash } => (*hash, &[], None),
            Self::Salted { hash, salt } => (*hash, salt, None),
            Self::IteratedSalted { hash, salt, count } => {
                (*hash, salt, Some(decode_count(*count)))
            }
            Self::Argon2 { salt, t, p, m } => {
                return derive_argon2(passphrase, salt, *t, *p, *m, key_len)
            }
            Self::GnuDummy { .. } => {
                return Err(SigningFailure::unsupported_cipher(
                    "GNU dummy S2K has no secret material to derive",
                ))
            }
        };

        match hash {
            2 => Ok(derive_hashed::<Sha1>(passphrase, salt, count, key_len)),
            8 => Ok(derive_hashed::<Sha256>(passphrase, salt, count, key_len)),
            9 => Ok(derive_hashed::<Sha384>(passphrase, salt, count, key_len)),
            10 => Ok(derive_hashed::<Sha512>(passphrase, salt, count, key_len)),
            11 => Ok(derive_hashed::<Sha224>(passphrase, salt, count, key_len)),
            other => Err(SigningFailure::unsupported_cipher(format!(
                "S2K hash algorithm {other}"
            ))),
        }
    }
}

/// Decodes the coded iteration count octet into an octet count.
#[must_use]
pub const fn decode_count(coded: u8) -> usize {
    (16 + (coded as usize & 15)) << ((coded as usize >> 4) + 6)
}

fn derive_hashed<D: Digest>(
    passphrase: &[u8],
    salt: &[u8],
    count: Option<usize>,
    key_len: usize,
) -> Zeroizing<Vec<u8>> {
    let mut salted = Zeroizing::new(Vec::with_capacity(salt.len() + passphrase.len()));
    salted.extend_from_slice(salt);
    salted.extend_from_slice(passphrase);

    // the whole salted passphrase is always hashed at least once
    let total = count.map_or(salted.len(), |c| c.max(salted.len()));

    let mut key = Zeroizing::new(Vec::with_capacity(key_len));
    let mut preload = 0usize;
    while key.len() < key_len {
        let mut hasher = D::new();
        for _ in 0..preload {
            hasher.update([0u8]);
        }
        if !salted.is_empty() {
            let mut left = total;
            while left >= salted.len() {
                hasher.update(salted.as_slice());
                left -= salted.len();
            }
            hasher.update(salted.get(..left).unwrap_or_default());
        }
        let digest = Zeroizing::new(hasher.finalize().to_vec());
        let needed = (key_len - key.len()).min(digest.len());
        key.extend_from_slice(digest.get(..needed).unwrap_or_default());
        preload += 1;
    }
    key
}

fn derive_argon2(
    passphrase: &[u8],
    salt: &[u8; 16],
    t: u8,
    p: u8,
    m: u8,
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>, SigningFailure> {
    if m > 31 {
        return Err(SigningFailure::unsupported_cipher(format!(
            "Argon2 memory exponent {m} out of range"
        )));
    }
    let params = argon2::Params::new(1u32 << m, u32::from(t), u32::from(p), Some(key_len))
        .map_err(|e| SigningFailure::unsupported_cipher(format!("Argon2 parameters: {e}")))?;
    let argon = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = Zeroizing::new(vec![0u8; key_len]);
    argon
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| SigningFailure::unsupported_cipher(format!("Argon2 derivation: {e}")))?;
    Ok(key)
}
