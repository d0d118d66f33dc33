//! Error types for `chunkfile`.

use std::io;

/// Result type for chunk file operations.
pub type ChunkFileResult<T> = Result<T, ChunkFileError>;

/// Errors returned by the `chunkfile` crate.
#[derive(thiserror::Error, Debug)]
pub enum ChunkFileError {
    /// I/O error.
    ///
    /// Structural problems with the directory (missing path, duplicate chunk index,
    /// wrong access mode, ...) are reported here too, with a specific `io::ErrorKind`.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Malformed chunk header (bad signature, bad numeric field, out-of-range value).
    #[error("format error: {0}")]
    Format(String),

    /// Format error with expected/actual context.
    #[error("format error: {message} (expected {expected:?}, got {actual:?})")]
    FormatDetail {
        /// Short, human-readable description of the mismatch.
        message: String,
        /// What the reader expected (stringified).
        expected: String,
        /// What was actually found (stringified).
        actual: String,
    },

    /// The header is well-formed but declares a newer interface version than we support.
    #[error("unsupported interface version {found} (this build reads up to {supported})")]
    UnsupportedVersion {
        /// Interface version stored in the header.
        found: u16,
        /// Highest interface version this build understands.
        supported: u16,
    },

    /// CRC mismatch between a recorded chunk digest and the chunk's current contents.
    #[error("crc mismatch on chunk {index} (expected {expected:#010x}, got {actual:#010x})")]
    CrcMismatch {
        /// Chunk index the digest was taken from.
        index: u64,
        /// CRC recorded in the digest.
        expected: u32,
        /// CRC computed from the bytes that were read.
        actual: u32,
    },

    /// Invalid state (operation on a closed chunk file).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid argument (mode string, seek position, offset overflow).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not supported by the storage backend.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// Lock acquisition failed.
    #[error("lock failed on {resource}: {reason}")]
    LockFailed {
        /// What we were trying to lock.
        resource: String,
        /// Human-readable reason (poisoned lock, ...).
        reason: String,
    },
}

impl ChunkFileError {
    /// Build an `Io` error of the given kind with a message.
    pub fn io(kind: io::ErrorKind, msg: impl Into<String>) -> Self {
        Self::Io(io::Error::new(kind, msg.into()))
    }

    /// The `io::ErrorKind` if this is an `Io` error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(e) => Some(e.kind()),
            _ => None,
        }
    }

    pub(crate) fn closed() -> Self {
        Self::InvalidState("I/O operation on closed chunk file".into())
    }
}

impl From<ChunkFileError> for io::Error {
    fn from(e: ChunkFileError) -> Self {
        match e {
            ChunkFileError::Io(e) => e,
            ChunkFileError::InvalidArgument(_) | ChunkFileError::InvalidConfig(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, e)
            }
            ChunkFileError::Format(_)
            | ChunkFileError::FormatDetail { .. }
            | ChunkFileError::UnsupportedVersion { .. }
            | ChunkFileError::CrcMismatch { .. } => io::Error::new(io::ErrorKind::InvalidData, e),
            ChunkFileError::NotSupported(_) => io::Error::new(io::ErrorKind::Unsupported, e),
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_io_error_keeping_kind() {
        let e: io::Error = ChunkFileError::io(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = ChunkFileError::InvalidArgument("seek".into()).into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);

        let e: io::Error = ChunkFileError::Format("bad".into()).into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);

        let e: io::Error = ChunkFileError::closed().into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
        assert!(e.to_string().contains("closed chunk file"));
    }

    #[test]
    fn io_kind_is_exposed_for_structural_errors() {
        let e = ChunkFileError::io(io::ErrorKind::InvalidData, "multiple files with chunk index 0");
        assert_eq!(e.io_kind(), Some(io::ErrorKind::InvalidData));
        assert!(e.to_string().contains("multiple files with chunk index 0"));

        assert_eq!(ChunkFileError::closed().io_kind(), None);
    }

    #[test]
    fn unsupported_version_is_distinct_from_format() {
        let e = ChunkFileError::UnsupportedVersion {
            found: 7,
            supported: 1,
        };
        assert!(!matches!(e, ChunkFileError::Format(_)));
        assert!(e.to_string().contains("unsupported interface version 7"));
    }
}
