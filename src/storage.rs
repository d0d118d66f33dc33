//! Storage abstraction for chunk files.
//!
//! Everything above this module talks to the filesystem through [`Storage`]: positioned
//! reads/writes, resizes and deletes of single regular files, plus directory listing and
//! creation. Each call is assumed atomic on its own; nothing here buffers.
//!
//! Vocabulary note:
//! - Extending a file (by `set_len` or by writing past its end) must make the gap read back
//!   as zero bytes. `FsStorage` relies on `File::set_len` and POSIX write-past-EOF semantics
//!   for this; `MemoryStorage` fills explicitly.
//! - Stable-storage durability is opt-in through [`Storage::sync_file`] /
//!   [`Storage::sync_dir`], which default to `NotSupported`.

use crate::error::{ChunkFileError, ChunkFileResult};
use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What a path currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Dir,
    /// Anything else (socket, device, ...).
    Other,
}

/// Trait for the filesystem underneath a chunk directory.
pub trait Storage: Send + Sync {
    /// Kind of the entry at `path`, or `None` if nothing exists there.
    fn entry_kind(&self, path: &Path) -> Option<EntryKind>;
    /// Create one directory. Fails if the parent does not exist.
    fn create_dir(&self, path: &Path) -> ChunkFileResult<()>;
    /// Full paths of the entries of a directory, sorted.
    fn list_dir(&self, path: &Path) -> ChunkFileResult<Vec<PathBuf>>;
    /// Create a new file holding `contents`. Fails with `AlreadyExists` on collision.
    fn create_new(&self, path: &Path, contents: &[u8]) -> ChunkFileResult<()>;
    /// Read up to `len` bytes at `offset`; short (possibly empty) at end of file.
    fn read_at(&self, path: &Path, offset: u64, len: usize) -> ChunkFileResult<Vec<u8>>;
    /// Write `data` at `offset` of an existing file.
    fn write_at(&self, path: &Path, offset: u64, data: &[u8]) -> ChunkFileResult<()>;
    /// Grow (zero-filled) or shrink an existing file to exactly `len` bytes.
    fn set_len(&self, path: &Path, len: u64) -> ChunkFileResult<()>;
    /// Current length of a file.
    fn file_len(&self, path: &Path) -> ChunkFileResult<u64>;
    /// Delete a file.
    fn remove_file(&self, path: &Path) -> ChunkFileResult<()>;

    /// Return whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        self.entry_kind(path).is_some()
    }

    /// Ask the backend to persist a file's contents to stable storage.
    fn sync_file(&self, path: &Path) -> ChunkFileResult<()> {
        Err(ChunkFileError::NotSupported(format!(
            "sync_file is not available on this backend ({path:?})"
        )))
    }

    /// Ask the backend to persist a directory's entry names to stable storage.
    fn sync_dir(&self, path: &Path) -> ChunkFileResult<()> {
        Err(ChunkFileError::NotSupported(format!(
            "sync_dir is not available on this backend ({path:?})"
        )))
    }
}

/// `Storage` backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Create a filesystem backend.
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        let meta = std::fs::metadata(path).ok()?;
        Some(if meta.is_file() {
            EntryKind::File
        } else if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::Other
        })
    }

    fn create_dir(&self, path: &Path) -> ChunkFileResult<()> {
        std::fs::create_dir(path)?;
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> ChunkFileResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path)? {
            out.push(entry?.path());
        }
        out.sort();
        Ok(out)
    }

    fn create_new(&self, path: &Path, contents: &[u8]) -> ChunkFileResult<()> {
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        f.write_all(contents)?;
        Ok(())
    }

    fn read_at(&self, path: &Path, offset: u64, len: usize) -> ChunkFileResult<Vec<u8>> {
        let mut f = std::fs::File::open(path)?;
        let file_len = f.metadata()?.len();
        let available = file_len.saturating_sub(offset);
        let want = available.min(len as u64);
        let mut buf = Vec::with_capacity(usize::try_from(want).unwrap_or(len));
        if want > 0 {
            f.seek(SeekFrom::Start(offset))?;
            f.take(want).read_to_end(&mut buf)?;
        }
        Ok(buf)
    }

    fn write_at(&self, path: &Path, offset: u64, data: &[u8]) -> ChunkFileResult<()> {
        let mut f = std::fs::OpenOptions::new().write(true).open(path)?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }

    fn set_len(&self, path: &Path, len: u64) -> ChunkFileResult<()> {
        let f = std::fs::OpenOptions::new().write(true).open(path)?;
        f.set_len(len)?;
        Ok(())
    }

    fn file_len(&self, path: &Path) -> ChunkFileResult<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn remove_file(&self, path: &Path) -> ChunkFileResult<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn sync_file(&self, path: &Path) -> ChunkFileResult<()> {
        let f = std::fs::OpenOptions::new().read(true).open(path)?;
        f.sync_all()?;
        Ok(())
    }

    fn sync_dir(&self, path: &Path) -> ChunkFileResult<()> {
        let f = std::fs::File::open(path)?;
        f.sync_all()?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

impl MemoryState {
    fn is_dir(&self, path: &Path) -> bool {
        is_root(path) || self.dirs.contains(path)
    }

    fn file_mut(&mut self, path: &Path) -> ChunkFileResult<&mut Vec<u8>> {
        self.files
            .get_mut(path)
            .ok_or_else(|| not_found(path))
    }
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

fn not_found(path: &Path) -> ChunkFileError {
    ChunkFileError::io(io::ErrorKind::NotFound, format!("no such file: {path:?}"))
}

/// In-memory `Storage` used for tests and benches.
///
/// The root (`/` or the empty path) always exists; every other directory must be created.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStorage {
    /// Create an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ChunkFileResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| ChunkFileError::LockFailed {
            resource: "memory storage".to_string(),
            reason: "lock poisoned".to_string(),
        })
    }

    fn write(&self) -> ChunkFileResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| ChunkFileError::LockFailed {
            resource: "memory storage".to_string(),
            reason: "lock poisoned".to_string(),
        })
    }
}

impl Storage for MemoryStorage {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        let state = self.read().ok()?;
        if state.files.contains_key(path) {
            Some(EntryKind::File)
        } else if state.is_dir(path) {
            Some(EntryKind::Dir)
        } else {
            None
        }
    }

    fn create_dir(&self, path: &Path) -> ChunkFileResult<()> {
        let mut state = self.write()?;
        if state.files.contains_key(path) || state.is_dir(path) {
            return Err(ChunkFileError::io(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {path:?}"),
            ));
        }
        if !path.parent().is_some_and(|p| state.is_dir(p)) {
            return Err(not_found(path));
        }
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> ChunkFileResult<Vec<PathBuf>> {
        let state = self.read()?;
        if !state.is_dir(path) {
            return Err(not_found(path));
        }
        let mut out: Vec<PathBuf> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        out.sort();
        Ok(out)
    }

    fn create_new(&self, path: &Path, contents: &[u8]) -> ChunkFileResult<()> {
        let mut state = self.write()?;
        if state.files.contains_key(path) || state.is_dir(path) {
            return Err(ChunkFileError::io(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {path:?}"),
            ));
        }
        if !path.parent().is_some_and(|p| state.is_dir(p)) {
            return Err(not_found(path));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn read_at(&self, path: &Path, offset: u64, len: usize) -> ChunkFileResult<Vec<u8>> {
        let state = self.read()?;
        let data = state.files.get(path).ok_or_else(|| not_found(path))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn write_at(&self, path: &Path, offset: u64, data: &[u8]) -> ChunkFileResult<()> {
        let mut state = self.write()?;
        let file = state.file_mut(path)?;
        let start = usize::try_from(offset).map_err(|_| {
            ChunkFileError::io(io::ErrorKind::InvalidInput, "offset exceeds address space")
        })?;
        let end = start.checked_add(data.len()).ok_or_else(|| {
            ChunkFileError::io(io::ErrorKind::InvalidInput, "offset exceeds address space")
        })?;
        if file.len() < end {
            file.resize(end, 0);
        }
        file[start..end].copy_from_slice(data);
        Ok(())
    }

    fn set_len(&self, path: &Path, len: u64) -> ChunkFileResult<()> {
        let mut state = self.write()?;
        let file = state.file_mut(path)?;
        let len = usize::try_from(len).map_err(|_| {
            ChunkFileError::io(io::ErrorKind::InvalidInput, "length exceeds address space")
        })?;
        file.resize(len, 0);
        Ok(())
    }

    fn file_len(&self, path: &Path) -> ChunkFileResult<u64> {
        let state = self.read()?;
        let data = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(data.len() as u64)
    }

    fn remove_file(&self, path: &Path) -> ChunkFileResult<()> {
        let mut state = self.write()?;
        state.files.remove(path).ok_or_else(|| not_found(path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_backend(storage: &dyn Storage, root: &Path) {
        let dir = root.join("stream");
        storage.create_dir(&dir).unwrap();
        assert_eq!(storage.entry_kind(&dir), Some(EntryKind::Dir));

        let f = dir.join("a.dat");
        storage.create_new(&f, b"hdr").unwrap();
        assert_eq!(storage.entry_kind(&f), Some(EntryKind::File));
        let err = storage.create_new(&f, b"again").unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::AlreadyExists));

        // Writing past the end leaves a zero gap.
        storage.write_at(&f, 6, b"xy").unwrap();
        assert_eq!(storage.read_at(&f, 0, 100).unwrap(), b"hdr\0\0\0xy");

        // Growing zero-fills, shrinking discards.
        storage.set_len(&f, 10).unwrap();
        assert_eq!(storage.read_at(&f, 6, 100).unwrap(), b"xy\0\0");
        storage.set_len(&f, 4).unwrap();
        assert_eq!(storage.file_len(&f).unwrap(), 4);
        assert_eq!(storage.read_at(&f, 2, 100).unwrap(), b"r\0");
        assert!(storage.read_at(&f, 50, 10).unwrap().is_empty());

        storage.create_new(&dir.join("b.dat"), b"").unwrap();
        let listed = storage.list_dir(&dir).unwrap();
        assert_eq!(listed, vec![dir.join("a.dat"), dir.join("b.dat")]);

        storage.remove_file(&f).unwrap();
        assert!(!storage.exists(&f));
    }

    #[test]
    fn fs_storage_contract() {
        let tmp = tempfile::tempdir().unwrap();
        exercise_backend(&FsStorage::new(), tmp.path());
    }

    #[test]
    fn memory_storage_contract() {
        exercise_backend(&MemoryStorage::new(), Path::new("/"));
    }

    #[test]
    fn create_dir_requires_parent() {
        let mem = MemoryStorage::new();
        let err = mem.create_dir(Path::new("/missing/dir")).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));

        let tmp = tempfile::tempdir().unwrap();
        let err = FsStorage::new()
            .create_dir(&tmp.path().join("missing").join("dir"))
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn sync_is_opt_in() {
        let mem = MemoryStorage::new();
        mem.create_new(Path::new("/f"), b"x").unwrap();
        assert!(matches!(
            mem.sync_file(Path::new("/f")),
            Err(ChunkFileError::NotSupported(_))
        ));

        let tmp = tempfile::tempdir().unwrap();
        let fs = FsStorage::new();
        let f = tmp.path().join("f");
        fs.create_new(&f, b"x").unwrap();
        fs.sync_file(&f).unwrap();
        fs.sync_dir(tmp.path()).unwrap();
    }
}
