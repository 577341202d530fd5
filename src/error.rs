//! Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A pagestyle error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The stylesheet directory is misconfigured or unusable.
    #[display("stylesheet publisher error")]
    Publisher,
    /// The host's content directory failed.
    #[display("content directory error")]
    Content,
    /// Reading or writing stored styles failed.
    #[display("style store error")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Content | Self::Store)
    }
}
