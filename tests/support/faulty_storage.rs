//! `Storage` wrapper with targeted fault injection.
//!
//! Important: this file lives under `tests/support/` so it is **not** compiled as a standalone
//! integration test target.

use chunkfile::storage::{EntryKind, Storage};
use chunkfile::ChunkFileResult;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Fault-injection switches and counters.
#[derive(Default)]
pub struct FaultConfig {
    /// Fail `remove_file` (chunk deletion during truncate).
    pub fail_remove: bool,
    /// Fail `create_new` (chunk creation during write/truncate).
    pub fail_create: bool,
    /// Fail `set_len` (chunk resize).
    pub fail_set_len: bool,
    /// Count of `remove_file` calls attempted.
    pub remove_calls: usize,
    /// Count of `create_new` calls attempted.
    pub create_calls: usize,
}

/// A `Storage` wrapper that fails selected operations on demand.
pub struct FaultyStorage<S> {
    inner: S,
    cfg: Arc<Mutex<FaultConfig>>,
}

impl<S: Storage> FaultyStorage<S> {
    /// Wrap an existing backend.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cfg: Arc::new(Mutex::new(FaultConfig::default())),
        }
    }

    /// Access the shared fault config (for toggling failpoints and reading counters).
    pub fn cfg(&self) -> Arc<Mutex<FaultConfig>> {
        self.cfg.clone()
    }
}

fn injected(what: &str) -> chunkfile::ChunkFileError {
    io::Error::other(format!("injected {what} failure")).into()
}

impl<S: Storage> Storage for FaultyStorage<S> {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        self.inner.entry_kind(path)
    }

    fn create_dir(&self, path: &Path) -> ChunkFileResult<()> {
        self.inner.create_dir(path)
    }

    fn list_dir(&self, path: &Path) -> ChunkFileResult<Vec<PathBuf>> {
        self.inner.list_dir(path)
    }

    fn create_new(&self, path: &Path, contents: &[u8]) -> ChunkFileResult<()> {
        let mut cfg = self.cfg.lock().unwrap();
        cfg.create_calls += 1;
        if cfg.fail_create {
            return Err(injected("create"));
        }
        drop(cfg);
        self.inner.create_new(path, contents)
    }

    fn read_at(&self, path: &Path, offset: u64, len: usize) -> ChunkFileResult<Vec<u8>> {
        self.inner.read_at(path, offset, len)
    }

    fn write_at(&self, path: &Path, offset: u64, data: &[u8]) -> ChunkFileResult<()> {
        self.inner.write_at(path, offset, data)
    }

    fn set_len(&self, path: &Path, len: u64) -> ChunkFileResult<()> {
        if self.cfg.lock().unwrap().fail_set_len {
            return Err(injected("set_len"));
        }
        self.inner.set_len(path, len)
    }

    fn file_len(&self, path: &Path) -> ChunkFileResult<u64> {
        self.inner.file_len(path)
    }

    fn remove_file(&self, path: &Path) -> ChunkFileResult<()> {
        let mut cfg = self.cfg.lock().unwrap();
        cfg.remove_calls += 1;
        if cfg.fail_remove {
            return Err(injected("remove"));
        }
        drop(cfg);
        self.inner.remove_file(path)
    }
}
