//! Opt-in per-chunk integrity digests.
//!
//! Digests are not part of the chunk header format: they are computed on demand from a
//! chunk's data region and can be stored wherever the caller likes (they serialize with
//! serde). The extension is versioned by [`DIGEST_ALGORITHM`] and [`DIGEST_VERSION`].

use crate::chunk::Chunk;
use crate::directory::ChunkDirectory;
use crate::error::{ChunkFileError, ChunkFileResult};
use serde::{Deserialize, Serialize};

/// Checksum algorithm used by [`ChunkDigest`].
pub const DIGEST_ALGORITHM: &str = "crc32";
/// Version of the digest extension.
pub const DIGEST_VERSION: u32 = 1;

/// Chunks are hashed in blocks of this many bytes.
const DIGEST_BLOCK_BYTES: usize = 1024 * 1024;

/// Checksum of one chunk's data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDigest {
    /// Chunk index.
    pub index: u64,
    /// Number of data bytes covered.
    pub data_len: u64,
    /// `crc32fast` over the data bytes.
    pub crc32: u32,
}

impl ChunkDigest {
    /// Recompute the digest of `chunk` and compare.
    pub fn verify(&self, chunk: &Chunk) -> ChunkFileResult<()> {
        let now = digest_chunk(chunk)?;
        if now.data_len != self.data_len {
            return Err(ChunkFileError::FormatDetail {
                message: format!("chunk {} changed length", self.index),
                expected: self.data_len.to_string(),
                actual: now.data_len.to_string(),
            });
        }
        if now.crc32 != self.crc32 {
            return Err(ChunkFileError::CrcMismatch {
                index: self.index,
                expected: self.crc32,
                actual: now.crc32,
            });
        }
        Ok(())
    }
}

/// Digest one chunk, streaming its data region.
pub fn digest_chunk(chunk: &Chunk) -> ChunkFileResult<ChunkDigest> {
    let mut hasher = crc32fast::Hasher::new();
    let mut offset = 0u64;
    loop {
        let block = chunk.read(offset, DIGEST_BLOCK_BYTES)?;
        if block.is_empty() {
            break;
        }
        hasher.update(&block);
        offset += block.len() as u64;
    }
    Ok(ChunkDigest {
        index: chunk.index(),
        data_len: offset,
        crc32: hasher.finalize(),
    })
}

/// Digest every chunk of a directory, in index order.
pub fn digest_all(dir: &ChunkDirectory) -> ChunkFileResult<Vec<ChunkDigest>> {
    dir.chunks().iter().map(digest_chunk).collect()
}
