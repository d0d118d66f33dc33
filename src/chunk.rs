//! One physical chunk file: a header block followed by a slice of the logical stream.
//!
//! All offsets taken by [`Chunk`] are relative to the start of the data region, i.e. they
//! exclude the header.

use crate::error::{ChunkFileError, ChunkFileResult};
use crate::formats::HEADER_SIZE;
use crate::header::ChunkHeader;
use crate::storage::{EntryKind, Storage};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DATA_START: u64 = HEADER_SIZE as u64;

/// File name used for chunk `index` inside a stream directory.
pub fn chunk_file_name(index: u64) -> String {
    format!("chunk.{index:011}.dat")
}

/// Handle to a single chunk file.
pub struct Chunk {
    storage: Arc<dyn Storage>,
    path: PathBuf,
    header: ChunkHeader,
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish()
    }
}

impl Chunk {
    /// Create a header-only chunk for `index` inside `dir`.
    ///
    /// Fails if a file for that index already exists.
    pub fn create(storage: Arc<dyn Storage>, dir: &Path, index: u64) -> ChunkFileResult<Self> {
        let header = ChunkHeader::new(index);
        let block = header.pack()?;
        let path = dir.join(chunk_file_name(index));
        storage.create_new(&path, &block)?;
        tracing::debug!(index, path = %path.display(), "created chunk");
        Ok(Self {
            storage,
            path,
            header,
        })
    }

    /// Open an existing chunk file and validate its header.
    pub fn open(storage: Arc<dyn Storage>, path: &Path) -> ChunkFileResult<Self> {
        if storage.entry_kind(path) != Some(EntryKind::File) {
            return Err(ChunkFileError::io(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        if storage.file_len(path)? < DATA_START {
            return Err(ChunkFileError::io(
                io::ErrorKind::InvalidData,
                format!("{} is not a valid chunk file", path.display()),
            ));
        }
        let block = storage.read_at(path, 0, HEADER_SIZE)?;
        let header = ChunkHeader::unpack(&block)?;
        Ok(Self {
            storage,
            path: path.to_path_buf(),
            header,
        })
    }

    /// Index of this chunk in the stream (as decoded from its header).
    pub fn index(&self) -> u64 {
        self.header.chunk_index
    }

    /// Decoded header.
    pub fn header(&self) -> &ChunkHeader {
        &self.header
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data bytes currently held (physical size minus header).
    pub fn data_size(&self) -> ChunkFileResult<u64> {
        Ok(self.storage.file_len(&self.path)?.saturating_sub(DATA_START))
    }

    /// Read up to `len` bytes starting `offset` bytes into the data region.
    ///
    /// Returns fewer bytes at the end of the chunk; never reads past it.
    pub fn read(&self, offset: u64, len: usize) -> ChunkFileResult<Vec<u8>> {
        let available = self.data_size()?.saturating_sub(offset);
        let len = usize::try_from(available).map_or(len, |a| a.min(len));
        if len == 0 {
            return Ok(Vec::new());
        }
        self.storage.read_at(&self.path, data_offset(offset)?, len)
    }

    /// Write `data` at `offset` into the data region.
    ///
    /// Writing beyond the current data size leaves a gap that reads back as zeros.
    pub fn write(&self, offset: u64, data: &[u8]) -> ChunkFileResult<()> {
        self.storage.write_at(&self.path, data_offset(offset)?, data)
    }

    /// Grow (zero-filled) or shrink the data region to exactly `data_size` bytes.
    pub fn resize(&self, data_size: u64) -> ChunkFileResult<()> {
        self.storage.set_len(&self.path, data_offset(data_size)?)
    }

    /// Remove the backing file.
    pub fn delete(&self) -> ChunkFileResult<()> {
        self.storage.remove_file(&self.path)?;
        tracing::debug!(index = self.index(), path = %self.path.display(), "deleted chunk");
        Ok(())
    }
}

fn data_offset(offset: u64) -> ChunkFileResult<u64> {
    offset.checked_add(DATA_START).ok_or_else(|| {
        ChunkFileError::InvalidArgument(format!("chunk offset {offset} overflows u64"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FsStorage, MemoryStorage};

    fn mem_dir() -> (Arc<dyn Storage>, PathBuf) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let dir = PathBuf::from("/stream");
        storage.create_dir(&dir).unwrap();
        (storage, dir)
    }

    #[test]
    fn create_writes_header_only_file() {
        let (storage, dir) = mem_dir();
        let c = Chunk::create(storage.clone(), &dir, 3).unwrap();
        assert_eq!(c.index(), 3);
        assert_eq!(c.data_size().unwrap(), 0);
        assert_eq!(c.path(), dir.join("chunk.00000000003.dat"));
        assert_eq!(storage.file_len(c.path()).unwrap(), HEADER_SIZE as u64);
    }

    #[test]
    fn create_refuses_collision() {
        let (storage, dir) = mem_dir();
        Chunk::create(storage.clone(), &dir, 0).unwrap();
        let err = Chunk::create(storage, &dir, 0).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn reads_stop_at_data_end() {
        let (storage, dir) = mem_dir();
        let c = Chunk::create(storage, &dir, 0).unwrap();
        c.write(0, b"hello world").unwrap();
        assert_eq!(c.read(6, 100).unwrap(), b"world");
        assert!(c.read(11, 5).unwrap().is_empty());
        assert!(c.read(500, 5).unwrap().is_empty());
    }

    #[test]
    fn write_past_end_and_resize_zero_fill() {
        let tmp = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FsStorage::new());
        let c = Chunk::create(storage, tmp.path(), 0).unwrap();

        c.write(4, b"ab").unwrap();
        assert_eq!(c.read(0, 10).unwrap(), b"\0\0\0\0ab");

        c.resize(10).unwrap();
        assert_eq!(c.data_size().unwrap(), 10);
        assert_eq!(c.read(0, 10).unwrap(), b"\0\0\0\0ab\0\0\0\0");

        c.resize(5).unwrap();
        assert_eq!(c.read(0, 10).unwrap(), b"\0\0\0\0a");
    }

    #[test]
    fn open_validates_file() {
        let (storage, dir) = mem_dir();
        let c = Chunk::create(storage.clone(), &dir, 9).unwrap();
        let path = c.path().to_path_buf();
        let reopened = Chunk::open(storage.clone(), &path).unwrap();
        assert_eq!(reopened.index(), 9);

        let short = dir.join("short");
        storage.create_new(&short, b"randomdata").unwrap();
        let err = Chunk::open(storage.clone(), &short).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::InvalidData));

        let sub = dir.join("subdir");
        storage.create_dir(&sub).unwrap();
        let err = Chunk::open(storage.clone(), &sub).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::InvalidInput));

        let junk = dir.join("junk");
        storage.create_new(&junk, &[0u8; HEADER_SIZE]).unwrap();
        assert!(matches!(
            Chunk::open(storage, &junk),
            Err(ChunkFileError::FormatDetail { .. })
        ));
    }

    #[test]
    fn delete_removes_file() {
        let (storage, dir) = mem_dir();
        let c = Chunk::create(storage.clone(), &dir, 0).unwrap();
        let path = c.path().to_path_buf();
        c.delete().unwrap();
        assert!(!storage.exists(&path));
    }
}
