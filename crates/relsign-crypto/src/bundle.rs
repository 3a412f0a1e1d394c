//! Key bundles: parsing transferable keys and selecting a signing key.
//!
//! A bundle is the sequence of entities found in one armored key block. Each
//! [`Entity`] is a primary key followed by its user IDs, subkeys and the
//! self-signatures that bind them. Self-signatures are read for key flags and
//! expiration but are not cryptographically verified.
//!
//! # Selection
//!
//! [`KeyBundle::select_signing_key`] picks the first entity whose user ID is
//! the identity, or whose `<addr>` part is the identity. Later matches are
//! ignored with a warning. Within that entity the newest non-expired subkey
//! flagged for signing wins; otherwise the primary key is used if it may sign.
//!
//! ```no_run
//! use relsign_crypto::bundle::KeyBundle;
//!
//! let armored = std::fs::read("release-key.asc").expect("read key");
//! let bundle = KeyBundle::parse_armored(&armored).expect("parse bundle");
//! let locked = bundle
//!     .select_signing_key("releases@please.build", chrono::Utc::now().timestamp())
//!     .expect("select key");
//! println!("signing with {}", locked.public.key_id());
//! ```

use crate::armor::{self, ArmorKind};
use crate::packet::{BodyReader, PacketReader, Tag};
use crate::s2k::{S2k, SymmetricAlgorithm};
use relsign_core::error::SigningFailure;
use relsign_core::types::{Fingerprint, KeyId};
use sha1::{Digest, Sha1};
use std::fmt;
use zeroize::Zeroizing;

/// OID of the Ed25519 curve for legacy EdDSA keys (1.3.6.1.4.1.11591.15.1).
pub const ED25519_LEGACY_OID: [u8; 9] = [0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01];

// ============================================================================
// Algorithms and flags
// ============================================================================

/// Public-key algorithm of a key packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyAlgorithm {
    /// RSA, encrypt or sign (1).
    Rsa,
    /// RSA, encrypt only (2).
    RsaEncryptOnly,
    /// RSA, sign only (3).
    RsaSignOnly,
    /// ElGamal, encrypt only (16).
    ElGamal,
    /// DSA (17).
    Dsa,
    /// ECDH (18).
    Ecdh,
    /// ECDSA (19).
    Ecdsa,
    /// EdDSA with a curve OID (22).
    EdDsaLegacy,
    /// X25519 (25).
    X25519,
    /// X448 (26).
    X448,
    /// Ed25519 (27).
    Ed25519,
    /// Ed448 (28).
    Ed448,
    /// Anything else.
    Unknown(u8),
}

impl PublicKeyAlgorithm {
    /// Maps an OpenPGP public-key algorithm identifier.
    #[must_use]
    pub const fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Rsa,
            2 => Self::RsaEncryptOnly,
            3 => Self::RsaSignOnly,
            16 => Self::ElGamal,
            17 => Self::Dsa,
            18 => Self::Ecdh,
            19 => Self::Ecdsa,
            22 => Self::EdDsaLegacy,
            25 => Self::X25519,
            26 => Self::X448,
            27 => Self::Ed25519,
            28 => Self::Ed448,
            other => Self::Unknown(other),
        }
    }

    /// The OpenPGP identifier.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Rsa => 1,
            Self::RsaEncryptOnly => 2,
            Self::RsaSignOnly => 3,
            Self::ElGamal => 16,
            Self::Dsa => 17,
            Self::Ecdh => 18,
            Self::Ecdsa => 19,
            Self::EdDsaLegacy => 22,
            Self::X25519 => 25,
            Self::X448 => 26,
            Self::Ed25519 => 27,
            Self::Ed448 => 28,
            Self::Unknown(id) => id,
        }
    }

    /// Whether the algorithm is a signature algorithm at all.
    #[must_use]
    pub const fn can_sign(self) -> bool {
        matches!(
            self,
            Self::Rsa
                | Self::RsaSignOnly
                | Self::Dsa
                | Self::Ecdsa
                | Self::EdDsaLegacy
                | Self::Ed25519
                | Self::Ed448
        )
    }
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rsa | Self::RsaEncryptOnly | Self::RsaSignOnly => "RSA",
            Self::ElGamal => "ElGamal",
            Self::Dsa => "DSA",
            Self::Ecdh => "ECDH",
            Self::Ecdsa => "ECDSA",
            Self::EdDsaLegacy => "EdDSA",
            Self::X25519 => "X25519",
            Self::X448 => "X448",
            Self::Ed25519 => "Ed25519",
            Self::Ed448 => "Ed448",
            Self::Unknown(id) => return write!(f, "public-key algorithm {id}"),
        };
        f.write_str(name)
    }
}

/// First octet of the key flags subpacket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFlags(pub u8);

impl KeyFlags {
    /// May certify other keys.
    pub const CERTIFY: u8 = 0x01;
    /// May sign data.
    pub const SIGN: u8 = 0x02;
    /// May encrypt communications.
    pub const ENCRYPT_COMMUNICATIONS: u8 = 0x04;
    /// May encrypt storage.
    pub const ENCRYPT_STORAGE: u8 = 0x08;

    /// Whether the sign-data flag is set.
    #[must_use]
    pub const fn can_sign(self) -> bool {
        self.0 & Self::SIGN != 0
    }

    /// Whether either encryption flag is set.
    #[must_use]
    pub const fn can_encrypt(self) -> bool {
        self.0 & (Self::ENCRYPT_COMMUNICATIONS | Self::ENCRYPT_STORAGE) != 0
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Algorithm-specific public parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    /// RSA modulus and public exponent.
    Rsa {
        /// Modulus `n`.
        n: Vec<u8>,
        /// Public exponent `e`.
        e: Vec<u8>,
    },
    /// Legacy EdDSA: curve OID and the prefixed point.
    EdDsaLegacy {
        /// Curve OID.
        curve: Vec<u8>,
        /// Point MPI, `0x40 || x` for Ed25519.
        point: Vec<u8>,
    },
    /// Ed25519 public key.
    Ed25519 {
        /// Raw key.
        key: [u8; 32],
    },
    /// Parameters this crate cannot sign with; parsed and skipped.
    Other,
}

/// The public part of a key packet.
#[derive(Debug, Clone)]
pub struct PublicKey {
    created: u32,
    algorithm: PublicKeyAlgorithm,
    params: PublicParams,
    fingerprint: Fingerprint,
}

impl PublicKey {
    /// Creation time, seconds since the epoch.
    #[must_use]
    pub const fn created(&self) -> u32 {
        self.created
    }

    /// Public-key algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    /// Public parameters.
    #[must_use]
    pub const fn params(&self) -> &PublicParams {
        &self.params
    }

    /// v4 fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Key ID.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        self.fingerprint.key_id()
    }

    /// Checks that this crate can produce signatures with the key.
    ///
    /// # Errors
    ///
    /// Returns a description of the unsupported algorithm or curve.
    pub fn signing_support(&self) -> Result<(), String> {
        match (&self.params, self.algorithm) {
            (PublicParams::Rsa { .. }, PublicKeyAlgorithm::Rsa | PublicKeyAlgorithm::RsaSignOnly)
            | (PublicParams::Ed25519 { .. }, _) => Ok(()),
            (PublicParams::EdDsaLegacy { curve, point }, _) => {
                if curve.as_slice() != ED25519_LEGACY_OID {
                    Err("unsupported algorithm: EdDSA on a curve other than Ed25519".to_string())
                } else if point.len() != 33 || point.first() != Some(&0x40) {
                    Err("unsupported algorithm: EdDSA point is not in native format".to_string())
                } else {
                    Ok(())
                }
            }
            _ => Err(format!("unsupported algorithm: {}", self.algorithm)),
        }
    }
}

/// How encrypted secret material is integrity checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionCheck {
    /// Usage 254: SHA-1 over the plaintext secret MPIs.
    Sha1,
    /// Usage 255: 16-bit sum of the plaintext secret MPIs.
    Checksum,
}

/// Passphrase-protected secret material.
#[derive(Clone)]
pub struct EncryptedSecret {
    /// Integrity check appended to the plaintext.
    pub check: ProtectionCheck,
    /// Cipher used in CFB mode.
    pub cipher: SymmetricAlgorithm,
    /// Passphrase derivation.
    pub s2k: S2k,
    /// CFB initialization vector.
    pub iv: Vec<u8>,
    /// Ciphertext.
    pub data: Vec<u8>,
}

/// Secret part of a secret-key packet.
#[derive(Clone)]
pub enum SecretMaterial {
    /// Usage 0: secret MPIs followed by a 16-bit checksum.
    Cleartext(Zeroizing<Vec<u8>>),
    /// Usage 254 or 255 with a cipher this crate knows the block size of.
    Encrypted(EncryptedSecret),
    /// Present, but protected in a way that cannot be decrypted here.
    Unsupported {
        /// What is not supported.
        reason: String,
    },
    /// GNU dummy: the secret lives elsewhere (stripped or on a smartcard).
    Absent,
}

impl SecretMaterial {
    /// Whether secret material is stored in this packet.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleartext(_) => f.write_str("SecretMaterial::Cleartext([REDACTED])"),
            Self::Encrypted(enc) => f
                .debug_struct("SecretMaterial::Encrypted")
                .field("check", &enc.check)
                .field("cipher", &enc.cipher)
                .field("s2k", &enc.s2k)
                .finish_non_exhaustive(),
            Self::Unsupported { reason } => f
                .debug_struct("SecretMaterial::Unsupported")
                .field("reason", reason)
                .finish(),
            Self::Absent => f.write_str("SecretMaterial::Absent"),
        }
    }
}

/// Flags and expiration taken from the newest binding self-signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Signature creation time.
    pub created: u32,
    /// Key flags, if the signature carries the subpacket.
    pub flags: Option<KeyFlags>,
    /// Seconds after key creation at which the key expires; 0 or absent never.
    pub expiration: Option<u32>,
}

/// A primary key or subkey with its binding information.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    /// Public part.
    pub public: PublicKey,
    /// Secret part; `None` for public-key packets.
    pub secret: Option<SecretMaterial>,
    /// Newest binding self-signature.
    pub binding: Option<Binding>,
}

impl KeyEntry {
    /// Key flags from the binding signature.
    #[must_use]
    pub fn flags(&self) -> Option<KeyFlags> {
        self.binding.and_then(|b| b.flags)
    }

    /// Expiration time in seconds since the epoch, if the key expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.binding
            .and_then(|b| b.expiration)
            .filter(|&secs| secs > 0)
            .map(|secs| i64::from(self.public.created) + i64::from(secs))
    }

    /// Whether the key has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }

    /// Whether this packet stores secret material.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret.as_ref().is_some_and(SecretMaterial::is_present)
    }

    fn signing_rejection(&self, now: i64) -> Option<String> {
        if self.is_expired(now) {
            return Some(format!("signing key {} has expired", self.public.key_id()));
        }
        if !self.has_secret() {
            return Some(format!(
                "no secret key material for signing key {}",
                self.public.key_id()
            ));
        }
        self.public.signing_support().err()
    }
}

/// A primary key with its user IDs and subkeys.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Primary key.
    pub primary: KeyEntry,
    /// User IDs in packet order.
    pub user_ids: Vec<String>,
    /// Subkeys in packet order.
    pub subkeys: Vec<KeyEntry>,
}

/// Extracts the address between the last `<` and the following `>`.
fn email_part(user_id: &str) -> Option<&str> {
    let start = user_id.rfind('<')?;
    let rest = user_id.get(start + 1..)?;
    let end = rest.find('>')?;
    rest.get(..end)
}

impl Entity {
    /// The first user ID equal to `identity` or whose address is `identity`.
    #[must_use]
    pub fn matching_user_id(&self, identity: &str) -> Option<&str> {
        self.user_ids
            .iter()
            .find(|uid| uid.as_str() == identity || email_part(uid) == Some(identity))
            .map(String::as_str)
    }

    /// Picks the key to sign with.
    ///
    /// # Errors
    ///
    /// Returns the reason no key qualifies.
    pub fn signing_key(&self, now: i64) -> Result<&KeyEntry, String> {
        // an expired certificate takes its subkeys with it
        if self.primary.is_expired(now) {
            return Err(format!(
                "certificate {} has expired",
                self.primary.public.key_id()
            ));
        }

        let mut rejection: Option<String> = None;
        let mut best: Option<&KeyEntry> = None;

        for subkey in &self.subkeys {
            if !subkey.flags().is_some_and(KeyFlags::can_sign) {
                continue;
            }
            match subkey.signing_rejection(now) {
                None => {
                    if best.map_or(true, |b| subkey.public.created >= b.public.created) {
                        best = Some(subkey);
                    }
                }
                Some(reason) => {
                    rejection.get_or_insert(reason);
                }
            }
        }
        if let Some(subkey) = best {
            return Ok(subkey);
        }

        let primary_may_sign = self.primary.flags().map_or_else(
            || self.primary.public.algorithm().can_sign(),
            KeyFlags::can_sign,
        );
        if primary_may_sign {
            match self.primary.signing_rejection(now) {
                None => return Ok(&self.primary),
                Some(reason) => {
                    rejection.get_or_insert(reason);
                }
            }
        }

        Err(rejection.unwrap_or_else(|| "encryption-only: no key is marked for signing".to_string()))
    }
}

/// The still-encrypted key chosen for signing.
#[derive(Debug, Clone)]
pub struct LockedKey {
    /// Public part of the selected key.
    pub public: PublicKey,
    /// Secret part, not yet decrypted.
    pub secret: SecretMaterial,
    /// The matched user ID.
    pub user_id: String,
    /// Fingerprint of the entity's primary key.
    pub primary_fingerprint: Fingerprint,
}

impl LockedKey {
    /// Whether the selected key is a subkey.
    #[must_use]
    pub fn is_subkey(&self) -> bool {
        self.public.fingerprint() != self.primary_fingerprint
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// All entities parsed from one key block.
#[derive(Debug, Clone)]
pub struct KeyBundle {
    entities: Vec<Entity>,
}

impl KeyBundle {
    /// Parses an ASCII-armored key block.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] for malformed armor, a block that
    /// is not a key block, or a malformed packet stream.
    pub fn parse_armored(input: &[u8]) -> Result<Self, SigningFailure> {
        let armored = armor::decode(input)?;
        if !armored.kind.is_key_block() {
            return Err(SigningFailure::key_parse(format!(
                "expected a PGP key block, found {}",
                armored.kind.label()
            )));
        }
        Self::from_packets(&armored.data)
    }

    /// Parses a binary transferable-key packet stream.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if the stream is malformed or
    /// contains no key.
    pub fn from_packets(data: &[u8]) -> Result<Self, SigningFailure> {
        let mut builder = BundleBuilder::default();
        for packet in PacketReader::new(data) {
            let packet = packet?;
            builder.push(packet.tag, &packet.body)?;
        }
        let entities = builder.finish();
        if entities.is_empty() {
            return Err(SigningFailure::key_parse("no keys found in key bundle"));
        }
        tracing::debug!(entities = entities.len(), "parsed key bundle");
        Ok(Self { entities })
    }

    /// Entities in bundle order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The first entity matching `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::IdentityNotFound`] if no entity matches.
    pub fn find_entity(&self, identity: &str) -> Result<&Entity, SigningFailure> {
        let mut matches = self
            .entities
            .iter()
            .filter(|e| e.matching_user_id(identity).is_some());
        let first = matches
            .next()
            .ok_or_else(|| SigningFailure::identity_not_found(identity))?;
        let ignored = matches.count();
        if ignored > 0 {
            tracing::warn!(
                identity,
                ignored,
                selected = %first.primary.public.fingerprint(),
                "several key entities match the identity; using the first"
            );
        }
        Ok(first)
    }

    /// Selects the signing key for `identity` at time `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::IdentityNotFound`] if no entity matches and
    /// [`SigningFailure::NoSigningKey`] if the matched entity cannot sign.
    pub fn select_signing_key(&self, identity: &str, now: i64) -> Result<LockedKey, SigningFailure> {
        let entity = self.find_entity(identity)?;
        let key = entity
            .signing_key(now)
            .map_err(|reason| SigningFailure::no_signing_key(identity, reason))?;
        let secret = key
            .secret
            .clone()
            .ok_or_else(|| SigningFailure::no_signing_key(identity, "no secret key material"))?;

        tracing::debug!(
            key_id = %key.public.key_id(),
            fingerprint = %key.public.fingerprint(),
            algorithm = %key.public.algorithm(),
            "selected signing key"
        );

        Ok(LockedKey {
            public: key.public.clone(),
            secret,
            user_id: entity
                .matching_user_id(identity)
                .unwrap_or(identity)
                .to_string(),
            primary_fingerprint: entity.primary.public.fingerprint(),
        })
    }
}

// ============================================================================
// Packet stream assembly
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attach {
    Primary,
    UserId,
    Subkey(usize),
    Ignore,
}

#[derive(Default)]
struct BundleBuilder {
    entities: Vec<Entity>,
    current: Option<Entity>,
    attach: Option<Attach>,
}

impl BundleBuilder {
    fn push(&mut self, tag: Tag, body: &[u8]) -> Result<(), SigningFailure> {
        match tag {
            Tag::PublicKey | Tag::SecretKey => {
                let entry = parse_key_packet(body, tag == Tag::SecretKey)?;
                if let Some(done) = self.current.take() {
                    self.entities.push(done);
                }
                self.current = Some(Entity {
                    primary: entry,
                    user_ids: Vec::new(),
                    subkeys: Vec::new(),
                });
                self.attach = Some(Attach::Primary);
            }
            Tag::PublicSubkey | Tag::SecretSubkey => {
                let entry = parse_key_packet(body, tag == Tag::SecretSubkey)?;
                let entity = self.current_entity("subkey")?;
                entity.subkeys.push(entry);
                let index = entity.subkeys.len() - 1;
                self.attach = Some(Attach::Subkey(index));
            }
            Tag::UserId => {
                let user_id = String::from_utf8_lossy(body).into_owned();
                self.current_entity("user ID")?.user_ids.push(user_id);
                self.attach = Some(Attach::UserId);
            }
            Tag::UserAttribute => {
                self.current_entity("user attribute")?;
                self.attach = Some(Attach::Ignore);
            }
            Tag::Signature => self.apply_signature(body)?,
            Tag::Other(other) => {
                tracing::trace!(tag = other, len = body.len(), "skipping packet");
            }
        }
        Ok(())
    }

    fn current_entity(&mut self, what: &str) -> Result<&mut Entity, SigningFailure> {
        self.current
            .as_mut()
            .ok_or_else(|| SigningFailure::key_parse(format!("{what} packet before any key packet")))
    }

    fn apply_signature(&mut self, body: &[u8]) -> Result<(), SigningFailure> {
        let (Some(entity), Some(attach)) = (self.current.as_mut(), self.attach) else {
            return Ok(());
        };
        let Some(info) = parse_signature_info(body)? else {
            return Ok(());
        };

        let primary_fpr = entity.primary.public.fingerprint();
        if !info.issued_by(&primary_fpr) {
            return Ok(());
        }

        let target = match (attach, info.sig_type) {
            (Attach::UserId, 0x10..=0x13) => &mut entity.primary,
            (Attach::Subkey(index), 0x18) => match entity.subkeys.get_mut(index) {
                Some(subkey) => subkey,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        if target.binding.map_or(true, |b| info.created >= b.created) {
            target.binding = Some(Binding {
                created: info.created,
                flags: info.key_flags.map(KeyFlags),
                expiration: info.key_expiration,
            });
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Entity> {
        if let Some(done) = self.current.take() {
            self.entities.push(done);
        }
        self.entities
    }
}

fn v4_fingerprint(public_body: &[u8]) -> Fingerprint {
    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update((public_body.len() as u16).to_be_bytes());
    hasher.update(public_body);
    Fingerprint::new(hasher.finalize().into())
}

fn parse_public_params(
    algorithm: PublicKeyAlgorithm,
    r: &mut BodyReader<'_>,
) -> Result<PublicParams, SigningFailure> {
    use PublicKeyAlgorithm as A;

    let params = match algorithm {
        A::Rsa | A::RsaEncryptOnly | A::RsaSignOnly => PublicParams::Rsa {
            n: r.mpi()?.to_vec(),
            e: r.mpi()?.to_vec(),
        },
        A::ElGamal => {
            for _ in 0..3 {
                r.mpi()?;
            }
            PublicParams::Other
        }
        A::Dsa => {
            for _ in 0..4 {
                r.mpi()?;
            }
            PublicParams::Other
        }
        A::Ecdh => {
            r.length_prefixed()?;
            r.mpi()?;
            r.length_prefixed()?;
            PublicParams::Other
        }
        A::Ecdsa => {
            r.length_prefixed()?;
            r.mpi()?;
            PublicParams::Other
        }
        A::EdDsaLegacy => PublicParams::EdDsaLegacy {
            curve: r.length_prefixed()?.to_vec(),
            point: r.mpi()?.to_vec(),
        },
        A::Ed25519 => PublicParams::Ed25519 { key: r.array()? },
        A::X25519 => {
            r.take(32)?;
            PublicParams::Other
        }
        A::X448 => {
            r.take(56)?;
            PublicParams::Other
        }
        A::Ed448 => {
            r.take(57)?;
            PublicParams::Other
        }
        A::Unknown(_) => {
            r.rest();
            PublicParams::Other
        }
    };
    Ok(params)
}

fn parse_key_packet(body: &[u8], secret: bool) -> Result<KeyEntry, SigningFailure> {
    let mut r = BodyReader::new(body);
    let version = r.u8()?;
    if version != 4 {
        return Err(SigningFailure::key_parse(format!(
            "unsupported key packet version {version}"
        )));
    }
    let created = r.u32()?;
    let algorithm = PublicKeyAlgorithm::from_id(r.u8()?);
    let params = parse_public_params(algorithm, &mut r)?;
    let fingerprint = v4_fingerprint(r.consumed());

    let secret = if !secret {
        None
    } else if let PublicKeyAlgorithm::Unknown(id) = algorithm {
        // the public/secret boundary of an unknown algorithm cannot be found
        Some(SecretMaterial::Unsupported {
            reason: format!("public-key algorithm {id}"),
        })
    } else {
        Some(parse_secret(&mut r)?)
    };

    Ok(KeyEntry {
        public: PublicKey {
            created,
            algorithm,
            params,
            fingerprint,
        },
        secret,
        binding: None,
    })
}

fn parse_secret(r: &mut BodyReader<'_>) -> Result<SecretMaterial, SigningFailure> {
    let usage = r.u8()?;
    let material = match usage {
        0 => SecretMaterial::Cleartext(Zeroizing::new(r.rest().to_vec())),
        254 | 255 => {
            let cipher = SymmetricAlgorithm::from_id(r.u8()?);
            let s2k = match S2k::parse(r) {
                Ok(s2k) => s2k,
                Err(SigningFailure::UnsupportedCipher { context }) => {
                    return Ok(SecretMaterial::Unsupported { reason: context })
                }
                Err(e) => return Err(e),
            };
            if s2k.is_gnu_dummy() {
                return Ok(SecretMaterial::Absent);
            }
            let Some(block_size) = cipher.block_size() else {
                return Ok(SecretMaterial::Unsupported {
                    reason: format!("cipher {cipher}"),
                });
            };
            let iv = r.take(block_size)?.to_vec();
            SecretMaterial::Encrypted(EncryptedSecret {
                check: if usage == 254 {
                    ProtectionCheck::Sha1
                } else {
                    ProtectionCheck::Checksum
                },
                cipher,
                s2k,
                iv,
                data: r.rest().to_vec(),
            })
        }
        253 => SecretMaterial::Unsupported {
            reason: "AEAD-protected secret key".to_string(),
        },
        legacy => SecretMaterial::Unsupported {
            reason: format!(
                "{} protection without an S2K specifier",
                SymmetricAlgorithm::from_id(legacy)
            ),
        },
    };
    Ok(material)
}

// ============================================================================
// Self-signature subpackets
// ============================================================================

#[derive(Debug, Default)]
struct SignatureInfo {
    sig_type: u8,
    created: u32,
    key_expiration: Option<u32>,
    key_flags: Option<u8>,
    issuer_fingerprint: Option<[u8; 20]>,
    issuer_key_id: Option<[u8; 8]>,
}

impl SignatureInfo {
    /// Unless the signature names a different issuer, assume it is a self-signature.
    fn issued_by(&self, primary: &Fingerprint) -> bool {
        if let Some(fpr) = &self.issuer_fingerprint {
            return fpr == primary.as_bytes();
        }
        if let Some(id) = &self.issuer_key_id {
            return id == primary.key_id().as_bytes();
        }
        true
    }

    fn read_subpackets(&mut self, area: &[u8], hashed: bool) -> Result<(), SigningFailure> {
        let mut r = BodyReader::new(area);
        while !r.is_empty() {
            let first = r.u8()?;
            let len = match first {
                0..=191 => usize::from(first),
                192..=254 => ((usize::from(first) - 192) << 8) + usize::from(r.u8()?) + 192,
                255 => r.u32()? as usize,
            };
            let packet = r.take(len)?;
            let Some((&kind, data)) = packet.split_first() else {
                continue;
            };
            match (kind & 0x7F, hashed) {
                (2, true) => {
                    if let Ok(bytes) = <[u8; 4]>::try_from(data) {
                        self.created = u32::from_be_bytes(bytes);
                    }
                }
                (9, true) => {
                    if let Ok(bytes) = <[u8; 4]>::try_from(data) {
                        self.key_expiration = Some(u32::from_be_bytes(bytes));
                    }
                }
                (27, true) => self.key_flags = Some(data.first().copied().unwrap_or(0)),
                (16, _) => self.issuer_key_id = <[u8; 8]>::try_from(data).ok(),
                (33, _) => {
                    if let Some((4, fpr)) = data.split_first() {
                        self.issuer_fingerprint = <[u8; 20]>::try_from(fpr).ok();
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Reads the parts of a signature packet that matter for key selection.
///
/// Returns `None` for signature versions without subpackets this crate reads.
fn parse_signature_info(body: &[u8]) -> Result<Option<SignatureInfo>, SigningFailure> {
    let mut r = BodyReader::new(body);
    match r.u8()? {
        3 => {
            let _hashed_len = r.u8()?;
            let sig_type = r.u8()?;
            let created = r.u32()?;
            let issuer_key_id = Some(r.array::<8>()?);
            Ok(Some(SignatureInfo {
                sig_type,
                created,
                issuer_key_id,
                ..SignatureInfo::default()
            }))
        }
        4 => {
            let mut info = SignatureInfo {
                sig_type: r.u8()?,
                ..SignatureInfo::default()
            };
            let _pubkey_algorithm = r.u8()?;
            let _hash_algorithm = r.u8()?;
            let hashed_len = usize::from(r.u16()?);
            info.read_subpackets(r.take(hashed_len)?, true)?;
            let unhashed_len = usize::from(r.u16()?);
            info.read_subpackets(r.take(unhashed_len)?, false)?;
            Ok(Some(info))
        }
        _ => Ok(None),
    }
}
