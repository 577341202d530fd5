//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use pagestyle_publish::ContentId;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The external metadata service failed.
    #[display("metadata service error")]
    Metadata,
    /// The external content directory failed.
    #[display("content directory error")]
    Content,
    /// Content item does not exist or its type does not take custom styles.
    #[display("content item {_0} does not accept custom styles")]
    NotEligible(#[error(not(source))] ContentId),
    /// The stylesheet directory could not be managed.
    #[display("stylesheet publisher error")]
    Publish,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Metadata | Self::Content | Self::Publish)
    }
}

/// Submitted CSS that cannot be saved as-is. The editor has to fix it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[display("unbalanced braces: {opening} opening, {closing} closing")]
    UnbalancedBraces { opening: usize, closing: usize },
}
