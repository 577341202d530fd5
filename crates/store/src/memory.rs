//! In-memory site for testing.

use crate::error::{ErrorKind, Result};
use crate::ports::{ContentDirectory, ContentItem, ContentType, MetadataStore};
use exn::OptionExt;
use pagestyle_publish::ContentId;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use time::OffsetDateTime;

/// In-memory stand-in for the host platform: content items, registered
/// content types and per-item metadata.
///
/// Implements both [`MetadataStore`] and [`ContentDirectory`], so one
/// `Arc<MemorySite>` can back both handles of a
/// [`StyleStore`](crate::StyleStore).
///
/// # Examples
///
/// ```ignore
/// use pagestyle_store::{ContentDirectory, MemorySite, MetadataStore};
/// use pagestyle_publish::ContentId;
///
/// let site = MemorySite::default().with_item(42, "About us", "page");
/// let id = ContentId::new(42).unwrap();
/// site.set(id, "colour", "red").unwrap();
/// assert_eq!(site.get(id, "colour").unwrap().as_deref(), Some("red"));
/// assert_eq!(site.item(id).unwrap().unwrap().title, "About us");
/// ```
pub struct MemorySite {
    types: Vec<ContentType>,
    items: RwLock<BTreeMap<ContentId, ContentItem>>,
    meta: RwLock<HashMap<(ContentId, String), String>>,
}

impl MemorySite {
    /// Create a site with the given registered content types and no items.
    pub fn with_types(types: impl IntoIterator<Item = ContentType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            items: RwLock::new(BTreeMap::new()),
            meta: RwLock::new(HashMap::new()),
        }
    }

    /// Add a published item, modified "now".
    ///
    /// Panics on a zero id. If test setup is wrong, then test should not pass.
    pub fn with_item(self, id: u64, title: impl Into<String>, content_type: impl Into<String>) -> Self {
        let Some(id) = ContentId::new(id) else {
            panic!("MemorySite::with_item: content ids start at 1");
        };
        self.insert(ContentItem {
            id,
            title: title.into(),
            content_type: content_type.into(),
            modified: OffsetDateTime::now_utc(),
            published: true,
        });
        self
    }

    /// Add or replace an item.
    pub fn insert(&self, item: ContentItem) {
        self.items.write().unwrap_or_else(|e| e.into_inner()).insert(item.id, item);
    }
}
impl Default for MemorySite {
    /// A site with the host's two built-in content types.
    fn default() -> Self {
        Self::with_types([ContentType::new("post", "Post"), ContentType::new("page", "Page")])
    }
}

impl MetadataStore for MemorySite {
    fn get(&self, id: ContentId, key: &str) -> Result<Option<String>> {
        let guard = self.meta.read().ok().ok_or_raise(|| ErrorKind::Metadata)?;
        Ok(guard.get(&(id, key.to_string())).cloned())
    }

    fn set(&self, id: ContentId, key: &str, value: &str) -> Result<()> {
        let mut guard = self.meta.write().ok().ok_or_raise(|| ErrorKind::Metadata)?;
        guard.insert((id, key.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, id: ContentId, key: &str) -> Result<()> {
        let mut guard = self.meta.write().ok().ok_or_raise(|| ErrorKind::Metadata)?;
        guard.remove(&(id, key.to_string()));
        Ok(())
    }

    fn purge(&self, key: &str) -> Result<usize> {
        let mut guard = self.meta.write().ok().ok_or_raise(|| ErrorKind::Metadata)?;
        let before = guard.len();
        guard.retain(|(_, k), _| k != key);
        Ok(before - guard.len())
    }
}

impl ContentDirectory for MemorySite {
    fn item(&self, id: ContentId) -> Result<Option<ContentItem>> {
        let guard = self.items.read().ok().ok_or_raise(|| ErrorKind::Content)?;
        Ok(guard.get(&id).cloned())
    }

    fn content_types(&self) -> Result<Vec<ContentType>> {
        Ok(self.types.clone())
    }

    fn items_with_meta(&self, key: &str) -> Result<Vec<ContentItem>> {
        let items = self.items.read().ok().ok_or_raise(|| ErrorKind::Content)?;
        let meta = self.meta.read().ok().ok_or_raise(|| ErrorKind::Metadata)?;
        Ok(items
            .values()
            .filter(|item| meta.get(&(item.id, key.to_string())).is_some_and(|value| !value.is_empty()))
            .cloned()
            .collect())
    }
}
