//! `chunkfile`: one large, randomly-addressable byte stream stored as a directory of
//! fixed-size chunk files.
//!
//! Scope:
//! - chunk header codec (`header`) and format constants (`formats`)
//! - single chunk files (`chunk`) and the ordered chunk set of a directory (`directory`)
//! - logical offset translation and span operations (`addressing`)
//! - the file-like session (`session`) and its mode strings (`mode`)
//! - storage abstraction (`storage`) and opt-in chunk digests (`integrity`)
//!
//! Non-goal: coordinating several writers on one directory. A session assumes it owns the
//! directory for its whole lifetime.
//!
//! ## Contract (what you can rely on)
//!
//! - **Layout**: chunk `i` holds logical bytes `[i*D, (i+1)*D)` where `D` is
//!   [`ChunkConfig::chunk_data_size`]. Only the last chunk may hold fewer than `D` bytes.
//! - **Zero fill**: any byte between the old end of the stream and a later write or
//!   extending truncate reads back as `0`.
//! - **Loading is strict**: an unreadable chunk, a duplicate index or a missing index fails
//!   the open; nothing is repaired.
//! - **No buffering**: every `write`/`truncate` reaches the storage backend before it returns.
//!   `flush()` is a visibility no-op; stable storage needs [`ChunkFile::flush_and_sync`].
//!
//! ```no_run
//! use chunkfile::ChunkFile;
//! use std::io::SeekFrom;
//!
//! # fn main() -> chunkfile::ChunkFileResult<()> {
//! let mut f = ChunkFile::open("/var/lib/app/stream", "w+")?;
//! f.write(b"hello")?;
//! f.seek(SeekFrom::Start(0))?;
//! assert_eq!(f.read(None)?, b"hello");
//! f.close()?;
//! # Ok(())
//! # }
//! ```

pub mod addressing;
pub mod chunk;
pub mod directory;
pub mod error;
pub mod formats;
pub mod header;
pub mod integrity;
pub mod mode;
pub mod session;
pub mod storage;

pub use error::{ChunkFileError, ChunkFileResult};
pub use formats::ChunkConfig;
pub use mode::{Access, BaseMode, OpenMode};
pub use session::ChunkFile;
pub use storage::{FsStorage, MemoryStorage, Storage};
