//! Serializing and persisting signatures.
//!
//! Signatures are written atomically: the bytes go to an exclusively created
//! `.{name}.XXXXXX.tmp` file next to the destination, are synced to disk, and
//! the temp file is renamed over the destination. Until the rename succeeds a
//! [`NamedTempFile`] owns the temp file and removes it when dropped, so a
//! failed write leaves the directory as it was.

use crate::armor::{self, ArmorKind};
use crate::signature::SignaturePacket;
use relsign_core::error::SigningFailure;
use relsign_core::types::SignatureFormat;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Serializes `packet` in `format`.
#[must_use]
pub fn serialize(packet: &SignaturePacket, format: SignatureFormat) -> Vec<u8> {
    let bytes = packet.to_bytes();
    match format {
        SignatureFormat::Armored => armor::encode(ArmorKind::Signature, &bytes).into_bytes(),
        SignatureFormat::Binary => bytes,
    }
}

/// Serializes `packet` and writes it atomically to `path`.
///
/// # Errors
///
/// Returns [`SigningFailure::Write`] on any filesystem failure. The parent
/// directory is never created.
pub fn write_signature(
    packet: &SignaturePacket,
    path: &Path,
    format: SignatureFormat,
) -> Result<(), SigningFailure> {
    write_atomic(path, &serialize(packet, format))
}

/// Writes `bytes` to `path` through a synced temp file and a rename.
///
/// An existing file at `path` is replaced only by the final rename.
///
/// # Errors
///
/// Returns [`SigningFailure::Write`] if the temp file cannot be created,
/// written or synced, or if the rename fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SigningFailure> {
    let shown = path.display().to_string();

    let mut temp = temp_file_for(path).map_err(|e| SigningFailure::write(shown.clone(), e))?;
    tracing::trace!(temp = %temp.path().display(), "temp file created");

    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| SigningFailure::write(shown.clone(), e))?;

    // on failure the returned temp file is dropped, which removes it
    temp.persist(path)
        .map_err(|e| SigningFailure::write(shown.clone(), e.error))?;

    tracing::debug!(path = %shown, bytes = bytes.len(), "signature written");
    Ok(())
}

/// Creates a uniquely named temp file in the destination's directory.
///
/// The file is opened with `O_EXCL`, so an existing file or symlink at the
/// chosen name is never followed or truncated.
fn temp_file_for(path: &Path) -> io::Result<NamedTempFile> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name")
    })?;
    let prefix = format!(".{}.", name.to_string_lossy());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
}
