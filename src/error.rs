//! Error taxonomy shared by the reader, the writer and the file layer.
//!
//! Format errors and truncation are fatal for whatever region is being read.
//! A table checksum failure rejects the whole container, while an entry
//! checksum failure is scoped to that entry.  The I/O variant is held behind
//! an [`Arc`] so the writer can latch the first error and hand the very same
//! value back on every later call.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Unknown file format")]
    UnknownFormat,
    #[error("Unsupported BAR version: {0}")]
    UnsupportedVersion(u8),
    #[error("Unexpected end of archive")]
    Truncated,
    #[error("Invalid table checksum (expected {expected:#010x}, got {actual:#010x})")]
    TableChecksum { expected: u32, actual: u32 },
    #[error("Invalid checksum for '{name}' (expected {expected:#010x}, got {actual:#010x})")]
    InvalidChecksum { name: String, expected: u32, actual: u32 },

    #[error("Entry name is not a simple relative path: '{0}'")]
    InvalidName(String),
    #[error("Entry name is {0} bytes long (maximum 65535)")]
    NameTooLong(usize),
    #[error("Duplicate entry name '{0}'")]
    DuplicateName(String),
    #[error("No entry has been created yet")]
    NoEntry,
    #[error("Write after close")]
    WriteAfterClose,
    #[error("Too many entries for one archive")]
    TooManyEntries,

    #[error("No such entry '{0}' in archive")]
    EntryNotFound(String),
    #[error("File '{0}' already exists")]
    AlreadyExists(PathBuf),
    #[error("'{0}' is a directory")]
    IsDirectory(PathBuf),
    #[error("'{0}' is not a regular file or directory")]
    UnsupportedFileType(PathBuf),

    #[error("IO error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl Error {
    /// True for the entry-scoped checksum failure, which leaves the rest of
    /// the archive usable.
    pub fn is_entry_checksum(&self) -> bool {
        matches!(self, Error::InvalidChecksum { .. })
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated
        } else {
            Error::Io(Arc::new(e))
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => inner,
                Err(shared) => io::Error::new(shared.kind(), shared.to_string()),
            },
            Error::Truncated => io::Error::new(io::ErrorKind::UnexpectedEof, Error::Truncated),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_eof_becomes_truncated() {
        let e: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert!(matches!(e, Error::Truncated));
    }

    #[test]
    fn io_error_survives_clone() {
        let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        let copy = e.clone();
        match copy {
            Error::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn converts_back_to_io() {
        let io: io::Error = Error::UnknownFormat.into();
        assert_eq!(io.kind(), io::ErrorKind::InvalidData);
        let io: io::Error = Error::Truncated.into();
        assert_eq!(io.kind(), io::ErrorKind::UnexpectedEof);
    }
}
