pub mod error;
mod id;
mod path;
mod publisher;

pub use crate::id::ContentId;
pub use crate::path::{confine, validate_directory_name};
pub use crate::publisher::{DEFAULT_DIRECTORY, Publisher};

/// A published stylesheet ready to be linked into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedAsset {
    /// Public URL of the stylesheet.
    pub url: String,
    /// File modification time (unix seconds), used as a cache-busting
    /// version token.
    pub version: i64,
}
