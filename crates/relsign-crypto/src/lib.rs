//! # relsign-crypto
//!
//! OpenPGP plumbing for the `relsign` release signer: reading armored key
//! bundles, unlocking passphrase-protected secret keys, and producing
//! detached v4 signatures.
//!
//! ## Modules
//!
//! - [`armor`] - ASCII armor with CRC-24
//! - [`packet`] - packet framing and body parsing helpers
//! - [`bundle`] - entities, keys, self-signature data and key selection
//! - [`s2k`] - string-to-key specifiers and symmetric cipher identifiers
//! - [`unlock`] - secret key decryption and signing key construction
//! - [`signature`] - the streaming signature engine
//! - [`output`] - signature serialization and atomic file writes
//! - [`pipeline`] - [`ReleaseSigner`], running all of the above for one file
//!
//! ## Supported keys
//!
//! - RSA (PKCS#1 v1.5 signatures over SHA-256/384/512)
//! - `EdDSA` over Ed25519, both the legacy (22) and native (27) encodings
//!
//! Secret keys may be unprotected or protected with AES-128/192/256 or CAST5
//! in CFB mode, under simple, salted, iterated+salted or Argon2 S2K.
//!
//! ## Security
//!
//! - No unsafe code
//! - Decrypted secrets live in zeroizing containers
//! - Passphrase checks compare hashes in constant time

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod armor;
pub mod bundle;
pub mod output;
pub mod packet;
pub mod pipeline;
pub mod s2k;
pub mod signature;
pub mod unlock;

#[cfg(test)]
mod fixtures;

pub use armor::{ArmorKind, Armored};
pub use bundle::{Entity, KeyBundle, LockedKey, PublicKey, PublicKeyAlgorithm};
pub use output::{serialize, write_signature};
pub use pipeline::{sign_file, ReleaseSigner, SignOutcome, SignRequest, SignerConfig};
pub use signature::{DigestSigner, SignatureEngine, SignaturePacket, SignatureValue};
pub use unlock::{unlock, SigningMaterial, UnlockedKey};
