//! The style store: custom CSS and borrowed-stylesheet references per
//! content item.
//!
//! Metadata is written before the stylesheet file. The two writes are not a
//! transaction: if publishing fails after the metadata write succeeded, the
//! metadata stands and the failure is reported so the next save can
//! reconcile. Concurrent submissions for the same item are not serialized
//! either; the last file write wins.

use crate::error::{ErrorKind, Result, ValidationError};
use crate::ports::{ContentHandle, MetadataHandle};
use crate::sanitize::{Construct, sanitize};
use exn::ResultExt;
use pagestyle_publish::error::Error as PublishError;
use pagestyle_publish::{ContentId, Publisher};
use std::cmp::Reverse;
use tracing::instrument;

/// Metadata key holding an item's sanitized CSS.
pub const META_KEY_CSS: &str = "_custom_page_styles_css";
/// Metadata key holding the id of the item whose stylesheet is borrowed.
pub const META_KEY_BORROWED: &str = "_custom_page_styles_selected";

/// What happened to a submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// CSS stored and published (or cleared and unpublished).
    Saved,
    /// Saved, but the listed constructs were removed from the CSS first.
    SavedWithWarnings(Vec<Construct>),
    /// Nothing was changed.
    ValidationFailed(ValidationError),
    /// CSS metadata was written (or cleared) but the stylesheet file could
    /// not be written (or removed). `removed` is as for
    /// [`SavedWithWarnings`](Self::SavedWithWarnings).
    PublishFailed { error: PublishError, removed: Vec<Construct> },
}
impl SubmitOutcome {
    /// Returns `true` if the submitted CSS was stored.
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved | Self::SavedWithWarnings(_) | Self::PublishFailed { .. })
    }
}

/// Another item's stylesheet that can be borrowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowCandidate {
    pub id: ContentId,
    /// `"<title> (ID: <id>, <type label>)"`
    pub label: String,
}

/// Owns per-item custom CSS and borrowed-stylesheet references.
///
/// Holds no per-request state: one instance is created at startup and
/// shared by every request.
pub struct StyleStore {
    metadata: MetadataHandle,
    content: ContentHandle,
    publisher: Publisher,
    enabled_types: Vec<String>,
}
impl StyleStore {
    /// `enabled_types` lists the content type tags whose items may carry
    /// custom styles.
    pub fn new(
        metadata: MetadataHandle,
        content: ContentHandle,
        publisher: Publisher,
        enabled_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            metadata,
            content,
            publisher,
            enabled_types: enabled_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn enabled_types(&self) -> &[String] {
        &self.enabled_types
    }

    /// Returns `true` if `id` exists and its content type is enabled.
    pub fn is_eligible(&self, id: ContentId) -> Result<bool> {
        let item = self.content.item(id).or_raise(|| ErrorKind::Content)?;
        Ok(item.is_some_and(|item| self.enabled_types.iter().any(|t| *t == item.content_type)))
    }

    /// The item's own sanitized CSS, if it has any.
    pub fn css(&self, id: ContentId) -> Result<Option<String>> {
        let css = self.metadata.get(id, META_KEY_CSS).or_raise(|| ErrorKind::Metadata)?;
        Ok(css.filter(|css| !css.is_empty()))
    }

    /// The item whose stylesheet `id` borrows, if any.
    ///
    /// A stored value that is not a positive integer reads as no reference.
    pub fn borrowed_from(&self, id: ContentId) -> Result<Option<ContentId>> {
        let raw = self.metadata.get(id, META_KEY_BORROWED).or_raise(|| ErrorKind::Metadata)?;
        Ok(raw.and_then(ContentId::parse_lenient))
    }

    /// Save a content edit: the item's own CSS and the borrowed reference.
    ///
    /// - Unbalanced braces reject the whole submission; nothing is changed,
    ///   including the borrowed reference.
    /// - Non-empty sanitized CSS is stored and published; empty CSS clears
    ///   the metadata and removes the published file.
    /// - `borrow` is stored only if it names another item that currently has
    ///   CSS of its own; otherwise the reference is cleared without comment.
    ///
    /// # Errors
    ///
    /// [`NotEligible`](ErrorKind::NotEligible) if the item does not exist or
    /// its type is not enabled; [`Metadata`](ErrorKind::Metadata) /
    /// [`Content`](ErrorKind::Content) if a host service fails. Filesystem
    /// failures are reported through [`SubmitOutcome::PublishFailed`].
    #[instrument(skip(self, raw), fields(input_size = raw.len()))]
    pub fn submit(&self, id: ContentId, raw: &str, borrow: Option<ContentId>) -> Result<SubmitOutcome> {
        if !self.is_eligible(id)? {
            exn::bail!(ErrorKind::NotEligible(id));
        }

        let sanitized = match sanitize(raw) {
            Ok(sanitized) => sanitized,
            Err(invalid) => {
                tracing::debug!(error = %invalid, "Rejected CSS submission");
                return Ok(SubmitOutcome::ValidationFailed(invalid));
            },
        };

        let published = if sanitized.css.is_empty() {
            self.metadata.delete(id, META_KEY_CSS).or_raise(|| ErrorKind::Metadata)?;
            self.publisher.remove(id).map(|_| ())
        } else {
            self.metadata.set(id, META_KEY_CSS, &sanitized.css).or_raise(|| ErrorKind::Metadata)?;
            self.publisher.publish(id, &sanitized.css).map(|_| ())
        };

        self.save_borrow(id, borrow)?;

        Ok(match published {
            Err(error) => {
                tracing::warn!(error = %error, "Stylesheet metadata saved but file was not updated");
                SubmitOutcome::PublishFailed { error, removed: sanitized.removed }
            },
            Ok(()) if sanitized.removed.is_empty() => SubmitOutcome::Saved,
            Ok(()) => SubmitOutcome::SavedWithWarnings(sanitized.removed),
        })
    }

    fn save_borrow(&self, id: ContentId, borrow: Option<ContentId>) -> Result<()> {
        let valid = match borrow {
            Some(candidate) if candidate == id => {
                tracing::debug!(candidate = %candidate, "Clearing self-referencing borrowed stylesheet");
                None
            },
            Some(candidate) => match self.css(candidate)? {
                Some(_) => Some(candidate),
                None => {
                    tracing::debug!(candidate = %candidate, "Clearing stale borrowed stylesheet");
                    None
                },
            },
            None => None,
        };
        let saved = match valid {
            Some(candidate) => self.metadata.set(id, META_KEY_BORROWED, &candidate.to_string()),
            None => self.metadata.delete(id, META_KEY_BORROWED),
        };
        saved.or_raise(|| ErrorKind::Metadata)
    }

    /// Every published item with CSS of its own, except `exclude`, most
    /// recently modified first. Always queried live.
    #[instrument(skip(self))]
    pub fn list_borrow_candidates(&self, exclude: ContentId) -> Result<Vec<BorrowCandidate>> {
        let mut items = self.content.items_with_meta(META_KEY_CSS).or_raise(|| ErrorKind::Content)?;
        items.retain(|item| item.published && item.id != exclude);
        items.sort_by_key(|item| Reverse((item.modified, item.id)));

        let mut candidates = Vec::with_capacity(items.len());
        for item in items {
            let label = self.content.type_label(&item.content_type).or_raise(|| ErrorKind::Content)?;
            let label = label.as_deref().unwrap_or(&item.content_type);
            candidates.push(BorrowCandidate {
                id: item.id,
                label: format!("{} (ID: {}, {})", item.title, item.id, label),
            });
        }
        Ok(candidates)
    }

    /// Remove every stored CSS and borrowed reference, and the managed
    /// directory with all published files.
    #[instrument(skip(self))]
    pub fn purge(&self) -> Result<()> {
        let css = self.metadata.purge(META_KEY_CSS).or_raise(|| ErrorKind::Metadata)?;
        let borrowed = self.metadata.purge(META_KEY_BORROWED).or_raise(|| ErrorKind::Metadata)?;
        tracing::info!(css, borrowed, "Purged custom style metadata");
        self.publisher.purge().or_raise(|| ErrorKind::Publish)?;
        Ok(())
    }
}
