//! Open-mode strings (`"r"`, `"w+b"`, `"a"`, ...).
//!
//! Grammar: one base character from `r`/`w`/`a`, then any of the modifiers `+` and `b`,
//! each at most once. `b` is accepted for compatibility and has no effect: the stream is
//! always binary.

use crate::error::{ChunkFileError, ChunkFileResult};
use std::fmt;
use std::str::FromStr;

/// What the stream does on open and on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMode {
    /// `r`: open an existing stream.
    Read,
    /// `w`: create the stream, or truncate an existing one to length 0.
    Write,
    /// `a`: create or open; every write goes to the current end.
    Append,
}

/// Which operations a session permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads only.
    ReadOnly,
    /// Writes and truncates only.
    WriteOnly,
    /// Both.
    ReadWrite,
}

impl Access {
    /// Return whether reads are allowed.
    pub fn can_read(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    /// Return whether writes and truncates are allowed.
    pub fn can_write(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// A validated open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    base: BaseMode,
    update: bool,
    binary: bool,
}

impl OpenMode {
    /// Mode with the given base and no modifiers.
    pub fn new(base: BaseMode) -> Self {
        Self {
            base,
            update: false,
            binary: false,
        }
    }

    /// Base mode.
    pub fn base(&self) -> BaseMode {
        self.base
    }

    /// Return whether `+` was given.
    pub fn is_update(&self) -> bool {
        self.update
    }

    /// Return whether `b` was given.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Return whether every write is redirected to the end of the stream.
    pub fn is_append(&self) -> bool {
        self.base == BaseMode::Append
    }

    /// Resolved access rights.
    pub fn access(&self) -> Access {
        match (self.base, self.update) {
            (BaseMode::Read, false) => Access::ReadOnly,
            (BaseMode::Write, false) => Access::WriteOnly,
            (BaseMode::Append, _) | (_, true) => Access::ReadWrite,
        }
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::new(BaseMode::Append)
    }
}

impl FromStr for OpenMode {
    type Err = ChunkFileError;

    fn from_str(s: &str) -> ChunkFileResult<Self> {
        let mut chars = s.chars();
        let base = match chars.next() {
            None => return Err(ChunkFileError::InvalidArgument("empty mode string".into())),
            Some('r') => BaseMode::Read,
            Some('w') => BaseMode::Write,
            Some('a') => BaseMode::Append,
            Some(_) => {
                return Err(ChunkFileError::InvalidArgument(format!(
                    "mode string must begin with one of 'r', 'w' or 'a', not {s:?}"
                )))
            }
        };

        let mut mode = Self::new(base);
        for c in chars {
            let flag = match c {
                '+' => &mut mode.update,
                'b' => &mut mode.binary,
                _ => {
                    return Err(ChunkFileError::InvalidArgument(format!(
                        "invalid mode {s:?}: unknown modifier {c:?}"
                    )))
                }
            };
            if *flag {
                return Err(ChunkFileError::InvalidArgument(format!(
                    "invalid mode {s:?}: repeated modifier {c:?}"
                )));
            }
            *flag = true;
        }
        Ok(mode)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base {
            BaseMode::Read => "r",
            BaseMode::Write => "w",
            BaseMode::Append => "a",
        };
        f.write_str(base)?;
        if self.update {
            f.write_str("+")?;
        }
        if self.binary {
            f.write_str("b")?;
        }
        Ok(())
    }
}
