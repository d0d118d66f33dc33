//! Shared helpers for integration tests.
#![allow(dead_code)]

pub mod faulty_storage;

pub use faulty_storage::{FaultConfig, FaultyStorage};

use chunkfile::{ChunkConfig, ChunkFile, ChunkFileResult, FsStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Data bytes per chunk used by most integration tests.
pub const TEST_CHUNK_DATA_SIZE: u64 = 1000;

/// Small chunks so multi-chunk behavior is cheap to exercise.
pub fn test_config() -> ChunkConfig {
    ChunkConfig::with_chunk_data_size(TEST_CHUNK_DATA_SIZE)
}

/// Open `path` on the local filesystem with [`test_config`].
pub fn open_fs(path: &Path, mode: &str) -> ChunkFileResult<ChunkFile> {
    ChunkFile::open_with(Arc::new(FsStorage::new()), path, mode, test_config())
}

/// Sorted entries of a stream directory.
pub fn chunk_files(path: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    out.sort();
    out
}

/// Sum of the physical sizes of a stream directory's entries.
pub fn total_physical_size(path: &Path) -> u64 {
    chunk_files(path)
        .iter()
        .map(|p| std::fs::metadata(p).unwrap().len())
        .sum()
}
