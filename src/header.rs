//! Chunk header codec.
//!
//! ## Public invariants (must not change without an interface version bump)
//!
//! The header is exactly [`HEADER_SIZE`] bytes of ASCII text:
//!
//! | Offset | Size  | Field                                    |
//! |--------|-------|------------------------------------------|
//! | 0x00   | 8     | signature, `CHNKFILE`                    |
//! | 0x08   | 12    | `MMM.mmm.iii\n` (major, minor, interface)|
//! | 0x14   | 12    | `NNNNNNNNNNN\n` chunk index              |
//! | 0x20   | 0xFE0 | reserved, filled with `\n`               |
//!
//! Readers accept any header whose interface version is at most [`IFACE_VERSION`].
//! The reserved region is not inspected on read so that newer writers may use it.

use crate::error::{ChunkFileError, ChunkFileResult};
use crate::formats::{
    CHUNK_INDEX_MAX, FORMAT_VERSION, HEADER_FILLER, HEADER_SIZE, IFACE_VERSION, SIGNATURE,
    VERSION_COMPONENT_MAX,
};
use std::io::Write;

const SIGNATURE_RANGE: std::ops::Range<usize> = 0x00..0x08;
const VERSION_RANGE: std::ops::Range<usize> = 0x08..0x14;
const INDEX_RANGE: std::ops::Range<usize> = 0x14..0x20;
const INDEX_DIGITS: usize = 11;

/// Metadata stored at the start of every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Format signature; must be exactly 8 ASCII bytes.
    pub signature: String,
    /// Major format version.
    pub major: u16,
    /// Minor format version.
    pub minor: u16,
    /// Interface version (forward-compatibility gate).
    pub iface_version: u16,
    /// Position of this chunk in the stream.
    pub chunk_index: u64,
}

impl ChunkHeader {
    /// Header for chunk `chunk_index` at the current format version.
    pub fn new(chunk_index: u64) -> Self {
        Self {
            signature: SIGNATURE.to_string(),
            major: FORMAT_VERSION.0,
            minor: FORMAT_VERSION.1,
            iface_version: IFACE_VERSION,
            chunk_index,
        }
    }

    /// Serialize into a fresh header block.
    ///
    /// Packing the same header twice yields identical bytes.
    pub fn pack(&self) -> ChunkFileResult<[u8; HEADER_SIZE]> {
        if self.signature.len() != SIGNATURE_RANGE.len() || !self.signature.is_ascii() {
            return Err(ChunkFileError::Format(format!(
                "signature must be 8 ASCII characters (got {:?})",
                self.signature
            )));
        }
        for (name, v) in [
            ("major version", self.major),
            ("minor version", self.minor),
            ("interface version", self.iface_version),
        ] {
            if v > VERSION_COMPONENT_MAX {
                return Err(ChunkFileError::Format(format!(
                    "{name} must be 0-{VERSION_COMPONENT_MAX} (got {v})"
                )));
            }
        }
        if self.chunk_index > CHUNK_INDEX_MAX {
            return Err(ChunkFileError::Format(format!(
                "chunk index must be 0-{CHUNK_INDEX_MAX} (got {})",
                self.chunk_index
            )));
        }

        let mut buf = [HEADER_FILLER; HEADER_SIZE];
        buf[SIGNATURE_RANGE].copy_from_slice(self.signature.as_bytes());
        writeln!(
            &mut buf[VERSION_RANGE],
            "{:03}.{:03}.{:03}",
            self.major, self.minor, self.iface_version
        )?;
        writeln!(&mut buf[INDEX_RANGE], "{:011}", self.chunk_index)?;
        Ok(buf)
    }

    /// Parse and validate a header block.
    ///
    /// Malformed input yields `Format`/`FormatDetail`; a well-formed header from a newer
    /// interface version yields `UnsupportedVersion`.
    pub fn unpack(buf: &[u8]) -> ChunkFileResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ChunkFileError::Format(format!(
                "header truncated: need {HEADER_SIZE} bytes, got {}",
                buf.len()
            )));
        }

        let sig = &buf[SIGNATURE_RANGE];
        if sig != SIGNATURE.as_bytes() {
            return Err(ChunkFileError::FormatDetail {
                message: "bad chunk signature".into(),
                expected: SIGNATURE.into(),
                actual: String::from_utf8_lossy(sig).into_owned(),
            });
        }

        let v = &buf[VERSION_RANGE];
        if v[3] != b'.' || v[7] != b'.' || v[11] != b'\n' {
            return Err(ChunkFileError::Format("invalid version field".into()));
        }
        let (Some(major), Some(minor), Some(iface_version)) = (
            parse_decimal(&v[0..3]),
            parse_decimal(&v[4..7]),
            parse_decimal(&v[8..11]),
        ) else {
            return Err(ChunkFileError::Format("invalid version field".into()));
        };
        // Three digits never exceed VERSION_COMPONENT_MAX, so these casts are lossless.
        let (major, minor, iface_version) = (major as u16, minor as u16, iface_version as u16);
        if iface_version > IFACE_VERSION {
            return Err(ChunkFileError::UnsupportedVersion {
                found: iface_version,
                supported: IFACE_VERSION,
            });
        }

        let n = &buf[INDEX_RANGE];
        if n[INDEX_DIGITS] != b'\n' {
            return Err(ChunkFileError::Format("invalid chunk index field".into()));
        }
        let Some(chunk_index) = parse_decimal(&n[..INDEX_DIGITS]) else {
            return Err(ChunkFileError::Format("invalid chunk index field".into()));
        };

        Ok(Self {
            signature: SIGNATURE.to_string(),
            major,
            minor,
            iface_version,
            chunk_index,
        })
    }
}

/// Fixed-width unsigned decimal, optionally space-padded on the left.
fn parse_decimal(field: &[u8]) -> Option<u64> {
    let digits = &field[field.iter().take_while(|&&b| b == b' ').count()..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(
        digits
            .iter()
            .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0')),
    )
}
