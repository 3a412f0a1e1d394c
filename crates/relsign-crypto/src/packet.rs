//! OpenPGP packet framing.
//!
//! [`PacketReader`] splits a binary packet stream into [`Packet`]s, handling
//! both header formats:
//!
//! - old format: tag in bits 5..2, length type in bits 1..0 (1, 2 or 4 octet
//!   lengths, or indeterminate length running to the end of the input)
//! - new format: tag in bits 5..0, one-, two- or five-octet lengths and
//!   partial body lengths
//!
//! [`BodyReader`] is a bounds-checked cursor over a packet body; every read
//! past the end is a [`SigningFailure::KeyParse`] rather than a panic.

use relsign_core::error::SigningFailure;
use zeroize::Zeroizing;

/// Packet tags this crate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Signature packet (2).
    Signature,
    /// Secret-key packet (5).
    SecretKey,
    /// Public-key packet (6).
    PublicKey,
    /// Secret-subkey packet (7).
    SecretSubkey,
    /// User ID packet (13).
    UserId,
    /// Public-subkey packet (14).
    PublicSubkey,
    /// User attribute packet (17).
    UserAttribute,
    /// Anything else: trust, marker, padding, experimental...
    Other(u8),
}

impl Tag {
    /// Maps a raw tag number.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Self {
        match tag {
            2 => Self::Signature,
            5 => Self::SecretKey,
            6 => Self::PublicKey,
            7 => Self::SecretSubkey,
            13 => Self::UserId,
            14 => Self::PublicSubkey,
            17 => Self::UserAttribute,
            other => Self::Other(other),
        }
    }

    /// The raw tag number.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Signature => 2,
            Self::SecretKey => 5,
            Self::PublicKey => 6,
            Self::SecretSubkey => 7,
            Self::UserId => 13,
            Self::PublicSubkey => 14,
            Self::UserAttribute => 17,
            Self::Other(other) => other,
        }
    }
}

/// One framed packet.
///
/// Secret-key bodies may be unencrypted, so the body is zeroized on drop.
pub struct Packet {
    /// Packet tag.
    pub tag: Tag,
    /// Packet body with partial-length chunks already joined.
    pub body: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("tag", &self.tag)
            .field("len", &self.body.len())
            .finish()
    }
}

fn truncated(what: &str) -> SigningFailure {
    SigningFailure::key_parse(format!("truncated {what}"))
}

/// Iterator over the packets of a binary OpenPGP stream.
///
/// Iteration stops after the first error.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> PacketReader<'a> {
    /// Reads packets from `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], SigningFailure> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| truncated(what))?;
        let slice = self.data.get(self.pos..end).ok_or_else(|| truncated(what))?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self, what: &str) -> Result<u8, SigningFailure> {
        self.take(1, what).map(|b| b.first().copied().unwrap_or_default())
    }

    fn be_u32(&mut self, len: usize, what: &str) -> Result<usize, SigningFailure> {
        let bytes = self.take(len, what)?;
        let value = bytes
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        usize::try_from(value).map_err(|_| truncated(what))
    }

    fn read_packet(&mut self) -> Result<Packet, SigningFailure> {
        let ctb = self.byte("packet header")?;
        if ctb & 0x80 == 0 {
            return Err(SigningFailure::key_parse(format!(
                "invalid packet header octet 0x{ctb:02X} at offset {}",
                self.pos - 1
            )));
        }

        if ctb & 0x40 == 0 {
            let tag = Tag::from_u8((ctb >> 2) & 0x0F);
            let body = match ctb & 0x03 {
                0 => {
                    let len = self.be_u32(1, "packet length")?;
                    self.take(len, "packet body")?
                }
                1 => {
                    let len = self.be_u32(2, "packet length")?;
                    self.take(len, "packet body")?
                }
                2 => {
                    let len = self.be_u32(4, "packet length")?;
                    self.take(len, "packet body")?
                }
                _ => {
                    let rest = self.data.get(self.pos..).unwrap_or_default();
                    self.pos = self.data.len();
                    rest
                }
            };
            return Ok(Packet {
                tag,
                body: Zeroizing::new(body.to_vec()),
            });
        }

        let tag = Tag::from_u8(ctb & 0x3F);
        let mut body = Zeroizing::new(Vec::new());
        loop {
            let first = self.byte("packet length")?;
            match first {
                0..=191 => {
                    body.extend_from_slice(self.take(usize::from(first), "packet body")?);
                    break;
                }
                192..=223 => {
                    let second = self.byte("packet length")?;
                    let len = ((usize::from(first) - 192) << 8) + usize::from(second) + 192;
                    body.extend_from_slice(self.take(len, "packet body")?);
                    break;
                }
                255 => {
                    let len = self.be_u32(4, "packet length")?;
                    body.extend_from_slice(self.take(len, "packet body")?);
                    break;
                }
                _ => {
                    let len = 1usize << (first & 0x1F);
                    body.extend_from_slice(self.take(len, "partial packet body")?);
                }
            }
        }
        Ok(Packet { tag, body })
    }
}

impl Iterator for PacketReader<'_> {
    type Item = Result<Packet, SigningFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let result = self.read_packet();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Bounds-checked cursor over a packet body.
#[derive(Debug, Clone)]
pub struct BodyReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    /// Starts reading at the beginning of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the body.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Whether the cursor is at the end.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything consumed so far.
    #[must_use]
    pub fn consumed(&self) -> &'a [u8] {
        self.data.get(..self.pos).unwrap_or_default()
    }

    /// Reads `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], SigningFailure> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| truncated("packet field"))?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| truncated("packet field"))?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads a fixed-size array.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if fewer than `N` bytes remain.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], SigningFailure> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads one octet.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] at end of body.
    pub fn u8(&mut self) -> Result<u8, SigningFailure> {
        let [b] = self.array::<1>()?;
        Ok(b)
    }

    /// Reads a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if fewer than 2 bytes remain.
    pub fn u16(&mut self) -> Result<u16, SigningFailure> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Reads a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if fewer than 4 bytes remain.
    pub fn u32(&mut self) -> Result<u32, SigningFailure> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Reads a multiprecision integer and returns its magnitude bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if the MPI is truncated.
    pub fn mpi(&mut self) -> Result<&'a [u8], SigningFailure> {
        let bits = usize::from(self.u16()?);
        self.take(bits.div_ceil(8))
    }

    /// Reads a one-octet length prefixed field (curve OIDs, KDF parameters).
    ///
    /// # Errors
    ///
    /// Returns [`SigningFailure::KeyParse`] if the field is truncated.
    pub fn length_prefixed(&mut self) -> Result<&'a [u8], SigningFailure> {
        let len = usize::from(self.u8()?);
        self.take(len)
    }

    /// Reads everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        self.pos = self.data.len();
        rest
    }
}

/// Appends a new-format packet header for a body of `len` bytes.
pub fn write_header(out: &mut Vec<u8>, tag: Tag, len: usize) {
    out.push(0xC0 | tag.to_u8());
    match len {
        0..=191 => out.push(len as u8),
        192..=8383 => {
            let adjusted = len - 192;
            out.push(((adjusted >> 8) as u8) + 192);
            out.push((adjusted & 0xFF) as u8);
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
}

/// Appends `magnitude` as an MPI, stripping leading zero octets.
pub fn write_mpi(out: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(magnitude.len());
    let trimmed = magnitude.get(start..).unwrap_or_default();
    let bits = trimmed.first().map_or(0, |&top| {
        (trimmed.len() - 1) * 8 + (8 - top.leading_zeros() as usize)
    });
    out.extend_from_slice(&(bits as u16).to_be_bytes());
    out.extend_from_slice(trimmed);
}
