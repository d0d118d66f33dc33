//! On-disk format constants and the chunk sizing config.

use crate::error::{ChunkFileError, ChunkFileResult};
use serde::{Deserialize, Serialize};

/// Signature stored in the first 8 bytes of every chunk.
pub const SIGNATURE: &str = "CHNKFILE";
/// Format version written into new chunks as `(major, minor)`.
pub const FORMAT_VERSION: (u16, u16) = (0, 1);
/// Highest interface version this build can read (and the one it writes).
pub const IFACE_VERSION: u16 = 1;
/// Size of the header region at the start of every chunk.
pub const HEADER_SIZE: usize = 4096;
/// Default physical size of a full chunk, header included.
pub const CHUNK_SIZE: u64 = 512 * 1024 * 1024;
/// Default number of data bytes per chunk.
pub const CHUNK_DATA_SIZE: u64 = CHUNK_SIZE - HEADER_SIZE as u64;
/// Largest value any of the three version components may take.
pub const VERSION_COMPONENT_MAX: u16 = 999;
/// Largest chunk index the 11-digit header field can hold.
pub const CHUNK_INDEX_MAX: u64 = 99_999_999_999;
/// Byte used to fill the reserved part of the header.
pub const HEADER_FILLER: u8 = b'\n';

/// Chunk sizing for one stream.
///
/// The chunk size is not recorded on disk: a stream must be reopened with the same
/// `chunk_size` it was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Physical size of a full chunk, header included.
    pub chunk_size: u64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl ChunkConfig {
    /// Config with an explicit physical chunk size.
    pub fn with_chunk_size(chunk_size: u64) -> Self {
        Self { chunk_size }
    }

    /// Config whose chunks hold exactly `data_size` data bytes.
    pub fn with_chunk_data_size(data_size: u64) -> Self {
        Self {
            chunk_size: data_size.saturating_add(HEADER_SIZE as u64),
        }
    }

    /// Data bytes per chunk.
    pub fn chunk_data_size(&self) -> u64 {
        self.chunk_size.saturating_sub(HEADER_SIZE as u64)
    }

    /// Reject chunk sizes that leave no room for data.
    pub fn validate(&self) -> ChunkFileResult<()> {
        if self.chunk_size <= HEADER_SIZE as u64 {
            return Err(ChunkFileError::InvalidConfig(format!(
                "chunk_size must exceed the {HEADER_SIZE}-byte header (got {})",
                self.chunk_size
            )));
        }
        Ok(())
    }
}
