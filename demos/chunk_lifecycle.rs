//! Minimal walkthrough of a chunk file's life.
//!
//! It exercises:
//! - creating a stream and writing across chunk boundaries
//! - appending from a second session
//! - truncating, then extending with zeros
//! - recording digests and verifying them after reopen
//!
//! Run (set `RUST_LOG=chunkfile=debug` to see chunk creation and deletion):
//! `cargo run --example chunk_lifecycle`

use chunkfile::directory::ChunkDirectory;
use chunkfile::{ChunkConfig, ChunkFile, FsStorage, Storage};
use std::io::SeekFrom;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("stream");
    let storage: Arc<dyn Storage> = Arc::new(FsStorage::new());
    // Tiny chunks so a few hundred bytes already span several files.
    let config = ChunkConfig::with_chunk_data_size(100);

    let mut f = ChunkFile::open_with(storage.clone(), &path, "w", config)?;
    f.write(&[b'a'; 250])?;
    f.close()?;
    println!("after first write: {} chunk files", count_files(&path)?);

    let mut f = ChunkFile::open_with(storage.clone(), &path, "a", config)?;
    f.write(b"appended")?;
    println!("logical size after append: {}", f.logical_size()?);

    f.truncate(120)?;
    f.truncate(300)?;
    f.seek(SeekFrom::Start(115))?;
    let window = f.read(Some(10))?;
    println!("bytes 115..125 after shrink+extend: {window:?}");

    let digests = f.digests()?;
    f.flush_and_sync()?;
    f.close()?;

    let dir = ChunkDirectory::load(storage, &path, config)?;
    for (d, chunk) in digests.iter().zip(dir.chunks()) {
        d.verify(chunk)?;
    }
    println!(
        "verified {} chunk digests: {}",
        digests.len(),
        serde_json::to_string(&digests)?
    );

    Ok(())
}

fn count_files(path: &std::path::Path) -> std::io::Result<usize> {
    Ok(std::fs::read_dir(path)?.count())
}
