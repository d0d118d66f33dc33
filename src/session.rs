//! File-like session over a chunk directory.
//!
//! A [`ChunkFile`] is either open or closed. Closing is one-way: every operation other than
//! [`ChunkFile::close`] fails with `InvalidState` afterwards, while `close` itself can be
//! repeated. There is no write buffering, so `flush` only checks the state.

use crate::addressing;
use crate::directory::ChunkDirectory;
use crate::error::{ChunkFileError, ChunkFileResult};
use crate::formats::ChunkConfig;
use crate::integrity::{self, ChunkDigest};
use crate::mode::{BaseMode, OpenMode};
use crate::storage::{EntryKind, FsStorage, Storage};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open stream: mode, cursor and the chunks behind it.
///
/// Besides the inherent methods, `ChunkFile` implements [`io::Read`], [`io::Write`] and
/// [`io::Seek`], so it plugs into `io::copy`, `BufReader` and friends. Nothing is buffered:
/// dropping a session without calling [`ChunkFile::close`] loses no data.
#[derive(Debug)]
pub struct ChunkFile {
    name: PathBuf,
    mode_str: String,
    mode: OpenMode,
    chunks: ChunkDirectory,
    offset: u64,
    closed: bool,
}

impl ChunkFile {
    /// Open the stream at directory `path` on the local filesystem with default chunk sizing.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> ChunkFileResult<Self> {
        Self::open_with(
            Arc::new(FsStorage::new()),
            path,
            mode,
            ChunkConfig::default(),
        )
    }

    /// Open the stream at `path` with an explicit storage backend and chunk config.
    ///
    /// - `r`: `path` must be an existing directory.
    /// - `w`: an existing directory is truncated to length 0; otherwise it is created
    ///   (its parent must exist).
    /// - `a`: like `w` without the truncate.
    pub fn open_with(
        storage: Arc<dyn Storage>,
        path: impl AsRef<Path>,
        mode: &str,
        config: ChunkConfig,
    ) -> ChunkFileResult<Self> {
        let open_mode: OpenMode = mode.parse()?;
        config.validate()?;
        let path = path.as_ref().to_path_buf();

        let mut chunks = match open_mode.base() {
            BaseMode::Read => ChunkDirectory::load(storage, path.clone(), config)?,
            BaseMode::Write | BaseMode::Append => {
                if let Some(kind) = storage.entry_kind(&path) {
                    if kind != EntryKind::Dir {
                        return Err(ChunkFileError::io(
                            io::ErrorKind::InvalidInput,
                            format!("not a directory: {}", path.display()),
                        ));
                    }
                }
                ChunkDirectory::open_or_create(storage, path.clone(), config)?
            }
        };
        if open_mode.base() == BaseMode::Write {
            addressing::truncate_to(&mut chunks, 0)?;
        }

        tracing::debug!(path = %path.display(), mode, chunks = chunks.len(), "opened chunk file");
        Ok(Self {
            name: path,
            mode_str: mode.to_string(),
            mode: open_mode,
            chunks,
            offset: 0,
            closed: false,
        })
    }

    /// Directory backing this stream.
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Mode string as given to `open`.
    pub fn mode(&self) -> &str {
        &self.mode_str
    }

    /// Parsed open mode.
    pub fn open_mode(&self) -> OpenMode {
        self.mode
    }

    /// Return whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> ChunkFileResult<()> {
        if self.closed {
            return Err(ChunkFileError::closed());
        }
        Ok(())
    }

    fn ensure_readable(&self) -> ChunkFileResult<()> {
        self.ensure_open()?;
        if !self.mode.access().can_read() {
            return Err(ChunkFileError::io(
                io::ErrorKind::PermissionDenied,
                "chunk file not open for reading",
            ));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> ChunkFileResult<()> {
        self.ensure_open()?;
        if !self.mode.access().can_write() {
            return Err(ChunkFileError::io(
                io::ErrorKind::PermissionDenied,
                "chunk file not open for writing",
            ));
        }
        Ok(())
    }

    /// Logical length of the stream.
    pub fn logical_size(&self) -> ChunkFileResult<u64> {
        self.ensure_open()?;
        addressing::logical_size(&self.chunks)
    }

    /// Number of chunk files currently backing the stream.
    pub fn chunk_count(&self) -> ChunkFileResult<u64> {
        self.ensure_open()?;
        Ok(self.chunks.len())
    }

    /// Read up to `size` bytes from the cursor, or everything up to the end for `None`.
    ///
    /// Short at end of stream; the cursor advances by exactly what was returned.
    pub fn read(&mut self, size: Option<usize>) -> ChunkFileResult<Vec<u8>> {
        self.ensure_readable()?;
        let len = match size {
            Some(n) => n,
            None => {
                let rest = addressing::logical_size(&self.chunks)?.saturating_sub(self.offset);
                usize::try_from(rest).map_err(|_| {
                    ChunkFileError::InvalidArgument(format!(
                        "{rest} bytes to end of stream do not fit in memory"
                    ))
                })?
            }
        };
        let data = addressing::read_span(&self.chunks, self.offset, len)?;
        self.offset += data.len() as u64;
        Ok(data)
    }

    /// Write `data` at the cursor (at the end of the stream in append mode).
    ///
    /// Returns the number of bytes written, which is always `data.len()`.
    pub fn write(&mut self, data: &[u8]) -> ChunkFileResult<usize> {
        self.ensure_writable()?;
        if self.mode.is_append() {
            self.offset = addressing::logical_size(&self.chunks)?;
        }
        let end = self.offset.checked_add(data.len() as u64).ok_or_else(|| {
            ChunkFileError::InvalidArgument(format!(
                "writing {} bytes at offset {} overflows the logical offset range",
                data.len(),
                self.offset
            ))
        })?;
        addressing::write_span(&mut self.chunks, self.offset, data)?;
        self.offset = end;
        Ok(data.len())
    }

    /// Move the cursor. Positions past the end are allowed.
    pub fn seek(&mut self, pos: SeekFrom) -> ChunkFileResult<u64> {
        self.ensure_open()?;
        let (base, delta) = match pos {
            SeekFrom::Start(n) => (0, i128::from(n)),
            SeekFrom::Current(n) => (self.offset, i128::from(n)),
            SeekFrom::End(n) => (addressing::logical_size(&self.chunks)?, i128::from(n)),
        };
        let target = i128::from(base) + delta;
        self.offset = u64::try_from(target).map_err(|_| {
            ChunkFileError::InvalidArgument(format!("seek position {target} is out of range"))
        })?;
        Ok(self.offset)
    }

    /// Current cursor position.
    pub fn tell(&self) -> ChunkFileResult<u64> {
        self.ensure_open()?;
        Ok(self.offset)
    }

    /// Set the logical length to `size`. The cursor does not move.
    pub fn truncate(&mut self, size: u64) -> ChunkFileResult<()> {
        self.ensure_writable()?;
        addressing::truncate_to(&mut self.chunks, size)
    }

    /// No-op beyond the closed check: writes are never buffered.
    pub fn flush(&mut self) -> ChunkFileResult<()> {
        self.ensure_open()
    }

    /// Flush, then ask the storage backend to persist every chunk and the directory itself.
    ///
    /// Returns `NotSupported` on backends without stable storage.
    pub fn flush_and_sync(&mut self) -> ChunkFileResult<()> {
        self.flush()?;
        let storage = self.chunks.storage();
        for chunk in self.chunks.chunks() {
            storage.sync_file(chunk.path())?;
        }
        storage.sync_dir(self.chunks.root())?;
        Ok(())
    }

    /// CRC32 digest of every chunk's data region, in index order.
    pub fn digests(&self) -> ChunkFileResult<Vec<ChunkDigest>> {
        self.ensure_open()?;
        integrity::digest_all(&self.chunks)
    }

    /// Close the session. Repeated calls are no-ops.
    pub fn close(&mut self) -> ChunkFileResult<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.closed = true;
        tracing::debug!(path = %self.name.display(), "closed chunk file");
        Ok(())
    }
}

impl io::Read for ChunkFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = ChunkFile::read(self, Some(buf.len()))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Write for ChunkFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ChunkFile::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(ChunkFile::flush(self)?)
    }
}

impl io::Seek for ChunkFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(ChunkFile::seek(self, pos)?)
    }
}
