pub mod error;
#[cfg(any(test, feature = "mock"))]
mod memory;
mod ports;
mod sanitize;
mod store;

#[cfg(any(test, feature = "mock"))]
pub use crate::memory::MemorySite;
pub use crate::ports::{ContentDirectory, ContentHandle, ContentItem, ContentType, MetadataHandle, MetadataStore};
pub use crate::sanitize::{Construct, Sanitized, sanitize, strip_tags};
pub use crate::store::{BorrowCandidate, META_KEY_BORROWED, META_KEY_CSS, StyleStore, SubmitOutcome};
