//! The load -> unlock -> sign -> write pipeline.
//!
//! [`ReleaseSigner`] runs the four stages strictly in order for one input
//! file. Nothing is shared between runs: every call reads the key file,
//! decrypts its own copy of the secret, and drops it before the signature is
//! written.
//!
//! # Example
//!
//! ```no_run
//! use relsign_crypto::pipeline::{ReleaseSigner, SignRequest, SignerConfig};
//! use zeroize::Zeroizing;
//!
//! let request = SignRequest::new(
//!     "dist/please_linux_amd64.tar.gz",
//!     "dist/please_linux_amd64.tar.gz.asc",
//!     "release-key.asc",
//!     Zeroizing::new("hunter2".to_string()),
//! );
//! let outcome = ReleaseSigner::new(SignerConfig::default()).sign(&request)?;
//! println!("signed with {}", outcome.key_id);
//! # Ok::<(), relsign_core::SigningFailure>(())
//! ```

use crate::bundle::{KeyBundle, LockedKey};
use crate::output;
use crate::signature::{SignatureEngine, SignaturePacket};
use crate::unlock::{unlock, UnlockedKey};
use chrono::{DateTime, Utc};
use relsign_core::config::{SigningConfig, DEFAULT_IDENTITY};
use relsign_core::error::SigningFailure;
use relsign_core::types::{DigestAlgorithm, Fingerprint, KeyId, SignatureFormat};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

// ============================================================================
// Configuration and requests
// ============================================================================

/// Settings shared by every signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerConfig {
    /// Identity used when a request does not name one.
    pub identity: String,
    /// Digest over the document.
    pub digest: DigestAlgorithm,
    /// Output encoding.
    pub format: SignatureFormat,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
            digest: DigestAlgorithm::default(),
            format: SignatureFormat::default(),
        }
    }
}

impl From<&SigningConfig> for SignerConfig {
    fn from(config: &SigningConfig) -> Self {
        Self {
            identity: config.identity.clone(),
            digest: config.digest,
            format: config.format,
        }
    }
}

/// One file to sign.
pub struct SignRequest {
    /// Document to sign.
    pub input: PathBuf,
    /// Where the signature goes.
    pub output: PathBuf,
    /// Armored key bundle.
    pub key_file: PathBuf,
    /// Identity override; [`SignerConfig::identity`] when `None`.
    pub identity: Option<String>,
    /// Passphrase for the signing key.
    pub passphrase: Zeroizing<String>,
}

impl SignRequest {
    /// Creates a request that signs with the configured identity.
    #[must_use]
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        passphrase: Zeroizing<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            key_file: key_file.into(),
            identity: None,
            passphrase,
        }
    }

    /// Signs as `identity` instead of the configured identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}

impl std::fmt::Debug for SignRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignRequest")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("key_file", &self.key_file)
            .field("identity", &self.identity)
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    /// Key ID of the key that signed.
    pub key_id: KeyId,
    /// Fingerprint of the key that signed.
    pub fingerprint: Fingerprint,
    /// Fingerprint of the entity's primary key.
    pub primary_fingerprint: Fingerprint,
    /// User ID that matched the identity.
    pub user_id: String,
    /// Digest used.
    pub digest: DigestAlgorithm,
    /// Output encoding.
    pub format: SignatureFormat,
    /// Path of the written signature.
    pub output: PathBuf,
    /// Signature creation time, seconds since the epoch.
    pub created: u32,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Signs release artifacts.
#[derive(Debug, Clone)]
pub struct ReleaseSigner {
    config: SignerConfig,
    clock: Option<DateTime<Utc>>,
}

impl ReleaseSigner {
    /// Creates a signer.
    #[must_use]
    pub const fn new(config: SignerConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// Uses `now` for key expiry checks and as the signature creation time.
    #[must_use]
    pub const fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// The signer's settings.
    #[must_use]
    pub const fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Runs the full pipeline for `request`.
    ///
    /// The unlocked key is dropped before the output is written, and nothing
    /// is written unless signing succeeded.
    ///
    /// # Errors
    ///
    /// Returns the [`SigningFailure`] of the first stage that fails.
    pub fn sign(&self, request: &SignRequest) -> Result<SignOutcome, SigningFailure> {
        let identity = request.identity.as_deref().unwrap_or(&self.config.identity);
        let now = self.clock.unwrap_or_else(Utc::now);

        let locked = {
            let _span =
                tracing::debug_span!("load", key_file = %request.key_file.display()).entered();
            load_key(&request.key_file, identity, now.timestamp())?
        };
        let user_id = locked.user_id.clone();
        let primary_fingerprint = locked.primary_fingerprint;

        let packet = {
            let unlocked = {
                let _span = tracing::debug_span!("unlock", key_id = %locked.public.key_id())
                    .entered();
                unlock(locked, request.passphrase.as_bytes())?
            };
            tracing::info!(
                target: "relsign::security",
                event = "key_unlocked",
                key_id = %unlocked.public().key_id(),
                "signing key unlocked"
            );

            let _span =
                tracing::debug_span!("sign", input = %request.input.display()).entered();
            self.sign_input(&unlocked, &request.input, now)?
        };

        {
            let _span =
                tracing::debug_span!("write", output = %request.output.display()).entered();
            output::write_signature(&packet, &request.output, self.config.format)?;
        }

        tracing::info!(
            target: "relsign::security",
            event = "signature_created",
            key_id = %packet.issuer_key_id(),
            output = %request.output.display(),
            "detached signature written"
        );

        Ok(SignOutcome {
            key_id: packet.issuer_key_id(),
            fingerprint: packet.issuer(),
            primary_fingerprint,
            user_id,
            digest: packet.digest(),
            format: self.config.format,
            output: request.output.clone(),
            created: packet.created(),
        })
    }

    fn sign_input(
        &self,
        key: &UnlockedKey,
        input: &Path,
        now: DateTime<Utc>,
    ) -> Result<SignaturePacket, SigningFailure> {
        let file = File::open(input).map_err(|e| {
            SigningFailure::signing(format!("failed to open input {}: {e}", input.display()))
        })?;
        SignatureEngine::new(key, self.config.digest)
            .with_creation_time(now)
            .sign_reader(file)
    }
}

/// Reads `key_file` and selects the signing key for `identity`.
fn load_key(key_file: &Path, identity: &str, now: i64) -> Result<LockedKey, SigningFailure> {
    let raw = Zeroizing::new(fs::read(key_file).map_err(|e| {
        SigningFailure::key_parse(format!(
            "failed to read key file {}: {e}",
            key_file.display()
        ))
    })?);
    let bundle = KeyBundle::parse_armored(&raw)?;
    let locked = bundle.select_signing_key(identity, now)?;
    tracing::debug!(
        key_id = %locked.public.key_id(),
        fingerprint = %locked.public.fingerprint(),
        subkey = locked.is_subkey(),
        user_id = %locked.user_id,
        "signing key selected"
    );
    Ok(locked)
}

/// Signs `input` into `output` with the key for `identity` from `key_file`,
/// using SHA-256 and armored output.
///
/// # Errors
///
/// Returns the [`SigningFailure`] of the first stage that fails.
pub fn sign_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    key_file: impl AsRef<Path>,
    identity: &str,
    passphrase: &str,
) -> Result<SignOutcome, SigningFailure> {
    let request = SignRequest::new(
        input.as_ref(),
        output.as_ref(),
        key_file.as_ref(),
        Zeroizing::new(passphrase.to_string()),
    )
    .with_identity(identity);
    ReleaseSigner::new(SignerConfig::default()).sign(&request)
}
