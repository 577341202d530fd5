//! Services the host platform provides to the store.
//!
//! Both traits are synchronous: the host calls into the store from inside a
//! single request and expects an answer before it continues.

use crate::error::Result;
use pagestyle_publish::ContentId;
use std::sync::Arc;
use time::OffsetDateTime;

pub type MetadataHandle = Arc<dyn MetadataStore + Send + Sync>;
pub type ContentHandle = Arc<dyn ContentDirectory + Send + Sync>;

/// Per-item key/value metadata storage.
///
/// Implementations should raise [`ErrorKind::Metadata`](crate::error::ErrorKind::Metadata)
/// when the backing store fails.
pub trait MetadataStore {
    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, id: ContentId, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value.
    fn set(&self, id: ContentId, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn delete(&self, id: ContentId, key: &str) -> Result<()>;

    /// Remove `key` from every content item. Returns the number removed.
    fn purge(&self, key: &str) -> Result<usize>;
}

/// A registered content type (`post`, `page`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Machine name, used as the type tag on content items.
    pub name: String,
    /// Human-readable singular label.
    pub label: String,
}
impl ContentType {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self { name: name.into(), label: label.into() }
    }
}

/// A content item as far as this crate is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: ContentId,
    pub title: String,
    /// Type tag, matching a [`ContentType::name`].
    pub content_type: String,
    pub modified: OffsetDateTime,
    /// Only published items are offered as borrowable stylesheets.
    pub published: bool,
}

/// Read access to the host's content items and type registry.
///
/// Implementations should raise [`ErrorKind::Content`](crate::error::ErrorKind::Content)
/// when the backing store fails.
pub trait ContentDirectory {
    /// Look up a single item.
    fn item(&self, id: ContentId) -> Result<Option<ContentItem>>;

    /// Every registered content type.
    fn content_types(&self) -> Result<Vec<ContentType>>;

    /// Every item that has a non-empty value stored under metadata `key`,
    /// in no particular order.
    fn items_with_meta(&self, key: &str) -> Result<Vec<ContentItem>>;

    /// Human-readable label of a content type, if it is registered.
    fn type_label(&self, content_type: &str) -> Result<Option<String>> {
        Ok(self.content_types()?.into_iter().find(|t| t.name == content_type).map(|t| t.label))
    }
}
