//! OpenPGP ASCII armor.
//!
//! Armor wraps binary packets in a base64 body between `-----BEGIN PGP ...-----`
//! and `-----END PGP ...-----` lines, optionally followed by a CRC-24
//! checksum line (`=XXXX`).
//!
//! Decoding accepts LF and CRLF line endings, trailing whitespace, and armor
//! headers (`Key: value`). Only the first armor block of the input is read.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use relsign_core::error::SigningFailure;
use zeroize::Zeroizing;

/// CRC-24 initial value.
const CRC24_INIT: u32 = 0x00B7_04CE;

/// CRC-24 generator polynomial.
const CRC24_POLY: u32 = 0x0186_4CFB;

/// Base64 characters per body line when encoding.
const LINE_WIDTH: usize = 64;

/// The block type named in the armor header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorKind {
    /// `PGP PRIVATE KEY BLOCK`
    PrivateKey,
    /// `PGP PUBLIC KEY BLOCK`
    PublicKey,
    /// `PGP SIGNATURE`
    Signature,
    /// `PGP MESSAGE`
    Message,
}

impl ArmorKind {
    /// The label between `BEGIN ` / `END ` and the closing dashes.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PrivateKey => "PGP PRIVATE KEY BLOCK",
            Self::PublicKey => "PGP PUBLIC KEY BLOCK",
            Self::Signature => "PGP SIGNATURE",
            Self::Message => "PGP MESSAGE",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        [
            Self::PrivateKey,
            Self::PublicKey,
            Self::Signature,
            Self::Message,
        ]
        .into_iter()
        .find(|kind| kind.label() == label)
    }

    /// Whether this block carries a key bundle.
    #[must_use]
    pub const fn is_key_block(self) -> bool {
        matches!(self, Self::PrivateKey | Self::PublicKey)
    }
}

/// A decoded armor block.
///
/// The payload may contain unprotected secret key material, so it is held in
/// a zeroizing buffer.
pub struct Armored {
    /// Block type.
    pub kind: ArmorKind,
    /// Armor headers in input order.
    pub headers: Vec<(String, String)>,
    /// Decoded binary payload.
    pub data: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Armored {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Armored")
            .field("kind", &self.kind)
            .field("headers", &self.headers)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Computes the OpenPGP CRC-24 of `data`.
#[must_use]
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= u32::from(byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

fn parse_error(context: impl Into<String>) -> SigningFailure {
    SigningFailure::key_parse(context)
}

/// Decodes the first armor block found in `input`.
///
/// Text before the `BEGIN` line is ignored.
///
/// # Errors
///
/// Returns [`SigningFailure::KeyParse`] if no armor block is found, the block
/// type is unknown, the footer is missing or mismatched, the body is not valid
/// base64, or the CRC-24 checksum does not match.
pub fn decode(input: &[u8]) -> Result<Armored, SigningFailure> {
    let text =
        std::str::from_utf8(input).map_err(|_| parse_error("armored input is not valid UTF-8"))?;
    let mut lines = text.lines().map(str::trim_end);

    let kind = loop {
        let line = lines
            .next()
            .ok_or_else(|| parse_error("no armor header line found"))?;
        if let Some(label) = line
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
        {
            break ArmorKind::from_label(label)
                .ok_or_else(|| parse_error(format!("unknown armor block type: {label}")))?;
        }
    };

    let mut headers = Vec::new();
    let mut body = Zeroizing::new(String::new());
    let mut checksum: Option<&str> = None;
    let mut in_headers = true;
    let mut footer_seen = false;

    for line in lines {
        if let Some(label) = line
            .strip_prefix("-----END ")
            .and_then(|rest| rest.strip_suffix("-----"))
        {
            if label != kind.label() {
                return Err(parse_error(format!(
                    "armor footer {label} does not match header {}",
                    kind.label()
                )));
            }
            footer_seen = true;
            break;
        }

        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if let Some((key, value)) = line.split_once(": ") {
                headers.push((key.to_string(), value.to_string()));
                continue;
            }
            // Some producers omit the blank separator when there are no headers.
            in_headers = false;
        }

        if checksum.is_some() {
            return Err(parse_error("armor data after checksum line"));
        }
        if let Some(crc) = line.strip_prefix('=') {
            checksum = Some(crc);
        } else {
            body.push_str(line.trim());
        }
    }

    if !footer_seen {
        return Err(parse_error(format!(
            "missing armor footer for {}",
            kind.label()
        )));
    }

    let data = Zeroizing::new(
        STANDARD
            .decode(body.as_bytes())
            .map_err(|e| parse_error(format!("invalid base64 in armor body: {e}")))?,
    );

    if let Some(encoded) = checksum {
        let crc_bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| parse_error(format!("invalid armor checksum encoding: {e}")))?;
        let [a, b, c] = <[u8; 3]>::try_from(crc_bytes.as_slice())
            .map_err(|_| parse_error("armor checksum must be 3 bytes"))?;
        let expected = u32::from_be_bytes([0, a, b, c]);
        let actual = crc24(&data);
        if expected != actual {
            return Err(parse_error(format!(
                "armor checksum mismatch: expected {expected:06X}, computed {actual:06X}"
            )));
        }
    }

    Ok(Armored {
        kind,
        headers,
        data,
    })
}

/// Encodes `data` as an armor block with a CRC-24 line and no headers.
#[must_use]
pub fn encode(kind: ArmorKind, data: &[u8]) -> String {
    let body = STANDARD.encode(data);
    let crc = crc24(data).to_be_bytes();

    let mut out = String::with_capacity(body.len() + body.len() / LINE_WIDTH + 96);
    out.push_str("-----BEGIN ");
    out.push_str(kind.label());
    out.push_str("-----\n\n");

    let mut rest = body.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }

    out.push('=');
    out.push_str(&STANDARD.encode(crc.get(1..).unwrap_or_default()));
    out.push('\n');
    out.push_str("-----END ");
    out.push_str(kind.label());
    out.push_str("-----\n");
    out
}
