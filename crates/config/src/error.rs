//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration sources could not be read or merged.
    #[display("could not load configuration")]
    Load,
    /// The upload directory must be an absolute path.
    #[display("upload directory must be absolute: {}", _0.display())]
    RelativeUploadDir(#[error(not(source))] PathBuf),
    /// The managed directory name must be a single plain path component.
    #[display("invalid stylesheet directory name: {_0}")]
    InvalidDirectory(#[error(not(source))] String),
    /// The public upload URL is empty.
    #[display("upload URL must not be empty")]
    EmptyUploadUrl,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Configuration is either valid or it isn't.
        false
    }
}
