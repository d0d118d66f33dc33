//! The ordered set of chunks that make up one stream directory.
//!
//! ## Invariants
//!
//! - Chunks are indexed `0..len()` with no gaps and no duplicates. This is checked once when
//!   a directory is loaded; a violation is a load error, never repaired.
//! - Every chunk except the last holds exactly `chunk_data_size()` bytes. Appending a chunk
//!   first fills the current last chunk up to that size with zeros.
//! - No chunk holds more than `chunk_data_size()` bytes.

use crate::chunk::Chunk;
use crate::error::{ChunkFileError, ChunkFileResult};
use crate::formats::ChunkConfig;
use crate::storage::{EntryKind, Storage};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Dense, index-ordered list of the chunks in one directory.
pub struct ChunkDirectory {
    storage: Arc<dyn Storage>,
    root: PathBuf,
    chunk_data_size: u64,
    chunks: Vec<Chunk>,
}

impl std::fmt::Debug for ChunkDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkDirectory")
            .field("root", &self.root)
            .field("chunk_data_size", &self.chunk_data_size)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl ChunkDirectory {
    /// Load every chunk in an existing directory.
    ///
    /// Fails on the first entry that is not a valid chunk file, on two entries with the same
    /// chunk index, on a missing index, on a chunk larger than the configured data size, and
    /// on a short chunk that is not the last one.
    pub fn load(
        storage: Arc<dyn Storage>,
        root: impl Into<PathBuf>,
        config: ChunkConfig,
    ) -> ChunkFileResult<Self> {
        config.validate()?;
        let root = root.into();
        match storage.entry_kind(&root) {
            Some(EntryKind::Dir) => {}
            None => {
                return Err(ChunkFileError::io(
                    io::ErrorKind::NotFound,
                    format!("no such directory: {}", root.display()),
                ))
            }
            Some(_) => {
                return Err(ChunkFileError::io(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory: {}", root.display()),
                ))
            }
        }

        let chunk_data_size = config.chunk_data_size();
        let mut by_index: BTreeMap<u64, (Chunk, u64)> = BTreeMap::new();
        for entry in storage.list_dir(&root)? {
            let chunk = Chunk::open(storage.clone(), &entry)?;
            let index = chunk.index();
            if by_index.contains_key(&index) {
                tracing::warn!(index, root = %root.display(), "duplicate chunk index");
                return Err(ChunkFileError::io(
                    io::ErrorKind::InvalidData,
                    format!("multiple files with chunk index {index:011}"),
                ));
            }
            let data_size = chunk.data_size()?;
            if data_size > chunk_data_size {
                return Err(ChunkFileError::Format(format!(
                    "chunk {index} holds {data_size} data bytes, more than the configured \
                     {chunk_data_size}"
                )));
            }
            by_index.insert(index, (chunk, data_size));
        }

        let count = by_index.len() as u64;
        let mut chunks = Vec::with_capacity(by_index.len());
        for (expected, (index, (chunk, data_size))) in (0u64..).zip(by_index) {
            if index != expected {
                tracing::warn!(missing = expected, root = %root.display(), "gap in chunk indices");
                return Err(ChunkFileError::io(
                    io::ErrorKind::InvalidData,
                    format!("missing chunk index {expected:011}"),
                ));
            }
            // Only the last chunk may be short.
            if index + 1 < count && data_size != chunk_data_size {
                tracing::warn!(index, data_size, root = %root.display(), "short chunk before end");
                return Err(ChunkFileError::io(
                    io::ErrorKind::InvalidData,
                    format!(
                        "chunk index {index:011} holds {data_size} data bytes but is not the \
                         last chunk (expected {chunk_data_size})"
                    ),
                ));
            }
            chunks.push(chunk);
        }

        tracing::debug!(root = %root.display(), chunks = chunks.len(), "loaded chunk directory");
        Ok(Self {
            storage,
            root,
            chunk_data_size,
            chunks,
        })
    }

    /// Create a new, empty stream directory. The parent directory must already exist.
    pub fn create(
        storage: Arc<dyn Storage>,
        root: impl Into<PathBuf>,
        config: ChunkConfig,
    ) -> ChunkFileResult<Self> {
        config.validate()?;
        let root = root.into();
        let parent_exists = match root.parent() {
            Some(p) if !p.as_os_str().is_empty() => storage.entry_kind(p) == Some(EntryKind::Dir),
            _ => true,
        };
        if !parent_exists {
            return Err(ChunkFileError::io(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", root.display()),
            ));
        }
        storage.create_dir(&root)?;
        tracing::debug!(root = %root.display(), "created chunk directory");
        Ok(Self {
            storage,
            root,
            chunk_data_size: config.chunk_data_size(),
            chunks: Vec::new(),
        })
    }

    /// Load `root` if it exists, otherwise create it.
    pub fn open_or_create(
        storage: Arc<dyn Storage>,
        root: impl Into<PathBuf>,
        config: ChunkConfig,
    ) -> ChunkFileResult<Self> {
        let root = root.into();
        if storage.exists(&root) {
            Self::load(storage, root, config)
        } else {
            Self::create(storage, root, config)
        }
    }

    /// Directory holding the chunk files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Data bytes per chunk.
    pub fn chunk_data_size(&self) -> u64 {
        self.chunk_data_size
    }

    /// Number of chunks.
    pub fn len(&self) -> u64 {
        self.chunks.len() as u64
    }

    /// Return whether the directory holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk at `index`, if it exists.
    pub fn get(&self, index: u64) -> Option<&Chunk> {
        usize::try_from(index).ok().and_then(|i| self.chunks.get(i))
    }

    /// The highest-indexed chunk.
    pub fn last(&self) -> Option<&Chunk> {
        self.chunks.last()
    }

    /// All chunks in index order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Append chunks until there are at least `count`.
    ///
    /// The previous last chunk is zero-filled to full size before each append.
    pub fn ensure_chunk_count(&mut self, count: u64) -> ChunkFileResult<()> {
        while self.len() < count {
            if let Some(last) = self.chunks.last() {
                if last.data_size()? < self.chunk_data_size {
                    last.resize(self.chunk_data_size)?;
                }
            }
            let chunk = Chunk::create(self.storage.clone(), &self.root, self.len())?;
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Delete chunks until at most `count` remain, highest index first.
    pub fn truncate_chunk_count(&mut self, count: u64) -> ChunkFileResult<()> {
        while self.len() > count {
            // A chunk stays listed until its file is actually gone.
            if let Some(last) = self.chunks.last() {
                last.delete()?;
            }
            self.chunks.pop();
        }
        Ok(())
    }
}
