//! Logical offset to chunk translation, and span operations that cross chunk boundaries.
//!
//! The logical stream is the concatenation of the data regions of chunks `0..n`. With
//! `D = chunk_data_size`, logical offset `o` lives in chunk `o / D` at `o % D`.
//! Every span operation here is a bounded loop over chunk indices.

use crate::directory::ChunkDirectory;
use crate::error::ChunkFileResult;

/// Where a logical offset lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Index of the chunk holding the offset.
    pub chunk_index: u64,
    /// Offset within that chunk's data region.
    pub intra_offset: u64,
}

/// Split a logical offset into chunk index and intra-chunk offset.
pub fn locate(offset: u64, chunk_data_size: u64) -> Location {
    Location {
        chunk_index: offset / chunk_data_size,
        intra_offset: offset % chunk_data_size,
    }
}

/// Logical length of the stream: full chunks plus whatever the last chunk holds.
pub fn logical_size(dir: &ChunkDirectory) -> ChunkFileResult<u64> {
    let Some(last) = dir.last() else {
        return Ok(0);
    };
    Ok((dir.len() - 1) * dir.chunk_data_size() + last.data_size()?)
}

/// Read up to `len` bytes starting at logical `offset`.
///
/// Never fails on end of stream: the result is short, or empty when `offset` is at or past
/// the end.
pub fn read_span(dir: &ChunkDirectory, offset: u64, len: usize) -> ChunkFileResult<Vec<u8>> {
    let cds = dir.chunk_data_size();
    let mut out = Vec::new();
    let mut pos = offset;
    let mut remaining = len;

    while remaining > 0 {
        let loc = locate(pos, cds);
        let Some(chunk) = dir.get(loc.chunk_index) else {
            break;
        };
        let room = cds - loc.intra_offset;
        let want = usize::try_from(room).map_or(remaining, |r| r.min(remaining));
        let got = chunk.read(loc.intra_offset, want)?;
        let n = got.len();
        tracing::trace!(offset = pos, len = n, chunk = loc.chunk_index, "read span");
        out.extend_from_slice(&got);
        remaining -= n;
        pos += n as u64;
        if n < want {
            // Only the last chunk may be short, so this is the end of the stream.
            break;
        }
    }
    Ok(out)
}

/// Write `data` at logical `offset`, creating chunks as needed.
///
/// Any gap between the previous end of the stream and `offset` reads back as zeros.
/// The caller guarantees `offset + data.len()` fits in `u64`.
pub fn write_span(dir: &mut ChunkDirectory, offset: u64, data: &[u8]) -> ChunkFileResult<()> {
    let cds = dir.chunk_data_size();
    let mut pos = offset;
    let mut rest = data;

    while !rest.is_empty() {
        let loc = locate(pos, cds);
        dir.ensure_chunk_count(loc.chunk_index + 1)?;
        let room = cds - loc.intra_offset;
        let take = usize::try_from(room).map_or(rest.len(), |r| r.min(rest.len()));
        let (head, tail) = rest.split_at(take);
        if let Some(chunk) = dir.get(loc.chunk_index) {
            chunk.write(loc.intra_offset, head)?;
        }
        tracing::trace!(offset = pos, len = take, chunk = loc.chunk_index, "wrote span");
        rest = tail;
        pos += take as u64;
    }
    Ok(())
}

/// Set the logical length to exactly `size`.
///
/// Shrinking deletes every chunk past the new end and cuts the new last chunk; growing
/// appends zero-filled chunks. Chunks before the new last one are already full.
pub fn truncate_to(dir: &mut ChunkDirectory, size: u64) -> ChunkFileResult<()> {
    let cds = dir.chunk_data_size();
    let count = size.div_ceil(cds);
    dir.truncate_chunk_count(count)?;
    if count > 0 {
        dir.ensure_chunk_count(count)?;
        let tail = size - (count - 1) * cds;
        if let Some(last) = dir.last() {
            last.resize(tail)?;
        }
    }
    tracing::debug!(size, chunks = count, root = %dir.root().display(), "truncated stream");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ChunkConfig;
    use crate::storage::{MemoryStorage, Storage};
    use std::sync::Arc;

    const D: u64 = 10;

    fn dir() -> ChunkDirectory {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        ChunkDirectory::create(storage, "/s", ChunkConfig::with_chunk_data_size(D)).unwrap()
    }

    #[test]
    fn locate_splits_on_chunk_boundaries() {
        assert_eq!(
            locate(0, D),
            Location {
                chunk_index: 0,
                intra_offset: 0
            }
        );
        assert_eq!(locate(9, D).chunk_index, 0);
        assert_eq!(
            locate(10, D),
            Location {
                chunk_index: 1,
                intra_offset: 0
            }
        );
        assert_eq!(locate(35, D).intra_offset, 5);
    }

    #[test]
    fn write_spans_and_creates_chunks() {
        let mut d = dir();
        write_span(&mut d, 5, b"abcdefghijklmnopqrst").unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(logical_size(&d).unwrap(), 25);
        assert_eq!(read_span(&d, 0, 100).unwrap(), b"\0\0\0\0\0abcdefghijklmnopqrst");
        assert_eq!(read_span(&d, 8, 6).unwrap(), b"defghi");
    }

    #[test]
    fn exact_multiple_fills_last_chunk() {
        let mut d = dir();
        write_span(&mut d, 0, &[b'x'; 20]).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.last().unwrap().data_size().unwrap(), D);
        assert_eq!(logical_size(&d).unwrap(), 20);
    }

    #[test]
    fn read_past_end_is_empty() {
        let mut d = dir();
        assert!(read_span(&d, 0, 10).unwrap().is_empty());
        write_span(&mut d, 0, b"abc").unwrap();
        assert!(read_span(&d, 3, 10).unwrap().is_empty());
        assert!(read_span(&d, 1000, 10).unwrap().is_empty());
        assert_eq!(read_span(&d, 1, 10).unwrap(), b"bc");
    }

    #[test]
    fn empty_write_creates_nothing() {
        let mut d = dir();
        write_span(&mut d, 500, b"").unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn write_far_past_end_zero_fills_intermediate_chunks() {
        let mut d = dir();
        write_span(&mut d, 0, b"ab").unwrap();
        write_span(&mut d, 32, b"z").unwrap();
        assert_eq!(d.len(), 4);
        let all = read_span(&d, 0, 100).unwrap();
        assert_eq!(all.len(), 33);
        assert_eq!(&all[..2], b"ab");
        assert!(all[2..32].iter().all(|&b| b == 0));
        assert_eq!(all[32], b'z');
    }

    #[test]
    fn truncate_shrinks_and_grows() {
        let mut d = dir();
        write_span(&mut d, 0, &[b'x'; 35]).unwrap();

        truncate_to(&mut d, 12).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(logical_size(&d).unwrap(), 12);

        truncate_to(&mut d, 20).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(
            read_span(&d, 10, 100).unwrap(),
            b"xx\0\0\0\0\0\0\0\0".to_vec()
        );

        truncate_to(&mut d, 31).unwrap();
        assert_eq!(d.len(), 4);
        assert_eq!(logical_size(&d).unwrap(), 31);
        assert!(read_span(&d, 20, 100).unwrap().iter().all(|&b| b == 0));

        truncate_to(&mut d, 0).unwrap();
        assert!(d.is_empty());
        assert_eq!(logical_size(&d).unwrap(), 0);
    }
}
