//! Publisher Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A publisher error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for publisher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Content identifiers must be positive integers.
    #[display("invalid content id: {_0}")]
    InvalidContentId(#[error(not(source))] u64),
    /// Configured path is not usable (relative, or not a single component).
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The base upload directory is missing or cannot be resolved.
    #[display("filesystem unavailable: {}", _0.display())]
    FilesystemUnavailable(#[error(not(source))] PathBuf),
    /// The managed directory could not be created.
    #[display("failed to create directory: {}", _0.display())]
    DirectoryCreate(#[error(not(source))] PathBuf),
    /// Resolved path escapes the managed directory. Treat as a security fault.
    #[display("path escapes managed directory: {}", _0.display())]
    PathTraversal(#[error(not(source))] PathBuf),
    /// The stylesheet could not be written.
    #[display("failed to write stylesheet: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// No published stylesheet exists for the requested content item.
    #[display("stylesheet not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Write(_) | Self::DirectoryCreate(_))
    }

    /// Returns `true` for faults that indicate tampering rather than an
    /// unhealthy environment.
    pub fn is_security_fault(&self) -> bool {
        matches!(self, Self::PathTraversal(_))
    }
}
