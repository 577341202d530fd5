//! Per-page custom stylesheets.
//!
//! Editors attach CSS to individual content items and may additionally borrow
//! the stylesheet of another item. Submitted CSS is sanitized, stored as item
//! metadata and published as a static file; page views link the item's own
//! and borrowed stylesheets.
//!
//! [`PageStyles`] is the interface the host's request router calls at its
//! lifecycle points:
//!
//! | Host event          | Method                                   |
//! |---------------------|------------------------------------------|
//! | plugin activated    | [`on_activate`](PageStyles::on_activate)   |
//! | content edit saved  | [`on_submit`](PageStyles::on_submit)       |
//! | page rendered       | [`on_render`](PageStyles::on_render)       |
//! | plugin removed      | [`on_uninstall`](PageStyles::on_uninstall) |
//!
//! # Example
//!
//! ```
//! use pagestyle::{ContentId, PageStyles, PageView, Stylesheet, Submission};
//! use pagestyle_config::Settings;
//! use pagestyle_store::MemorySite;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let uploads = tempfile::tempdir()?;
//! let settings = Settings { upload_dir: uploads.path().to_path_buf(), ..Settings::default() };
//! let site = Arc::new(MemorySite::default().with_item(42, "About", "page"));
//! let styles = PageStyles::new(&settings, site.clone(), site)?;
//!
//! let notices = styles.on_submit(&Submission::new(42, "body{color:red}"), &|_: ContentId| true);
//! assert!(notices.is_empty());
//!
//! let mut linked: Vec<Stylesheet> = Vec::new();
//! styles.on_render(PageView::Singular(42), &mut linked);
//! assert!(linked[0].url.ends_with("post-styles-42.css"));
//! # Ok(())
//! # }
//! ```

mod assets;
pub mod error;
mod notice;

pub use crate::assets::{AssetSink, BORROWED_HANDLE_PREFIX, OWN_HANDLE_PREFIX, Stylesheet};
pub use crate::notice::{Level, Notice};
pub use pagestyle_publish::ContentId;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use pagestyle_config::Settings;
use pagestyle_publish::Publisher;
use pagestyle_store::error::ErrorKind as StoreErrorKind;
use pagestyle_store::{BorrowCandidate, ContentHandle, MetadataHandle, StyleStore};
use tracing::instrument;

/// Delegated check that the current user may edit a content item.
pub trait EditPermission {
    fn can_edit(&self, id: ContentId) -> bool;
}
impl<F: Fn(ContentId) -> bool> EditPermission for F {
    fn can_edit(&self, id: ContentId) -> bool {
        self(id)
    }
}

/// A content-edit form submission, as received from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub content_id: u64,
    /// Raw CSS typed by the editor.
    pub css: String,
    /// Raw value of the borrowed-stylesheet selector. Blank or `0` means none.
    pub borrowed: String,
    /// Autosaves never touch styles.
    pub autosave: bool,
}
impl Submission {
    pub fn new(content_id: u64, css: impl Into<String>) -> Self {
        Self { content_id, css: css.into(), ..Self::default() }
    }

    pub fn borrowing(mut self, raw: impl Into<String>) -> Self {
        self.borrowed = raw.into();
        self
    }
}

/// The kind of page being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageView {
    /// A single content item is displayed.
    Singular(u64),
    /// Archives, search results, feeds, ...
    Listing,
}

/// Lifecycle entry points for the host platform.
pub struct PageStyles {
    store: StyleStore,
}
impl PageStyles {
    /// Wire up the store and publisher from settings.
    ///
    /// Configured content types that the host does not know are ignored.
    pub fn new(settings: &Settings, metadata: MetadataHandle, content: ContentHandle) -> Result<Self> {
        let publisher = Publisher::new(&settings.upload_dir, &settings.upload_url, &settings.directory)
            .or_raise(|| ErrorKind::Publisher)?;
        let registered = content.content_types().or_raise(|| ErrorKind::Content)?;
        let enabled = settings.enabled_types_in(registered.into_iter().map(|t| t.name));
        Ok(Self { store: StyleStore::new(metadata, content, publisher, enabled) })
    }

    pub fn store(&self) -> &StyleStore {
        &self.store
    }

    /// Prepare the stylesheet directory.
    #[instrument(skip(self))]
    pub fn on_activate(&self) -> Result<()> {
        self.store.publisher().ensure_directory().or_raise(|| ErrorKind::Publisher)?;
        Ok(())
    }

    /// Handle a content edit. Never fails: every problem becomes a notice.
    ///
    /// Autosaves, items whose type is not enabled and zero ids are ignored
    /// without a notice, since the host calls this for every save.
    #[instrument(skip(self, submission, permission), fields(content_id = submission.content_id))]
    pub fn on_submit(&self, submission: &Submission, permission: &dyn EditPermission) -> Vec<Notice> {
        if submission.autosave {
            return vec![];
        }
        let Some(id) = ContentId::new(submission.content_id) else {
            return vec![];
        };
        if !permission.can_edit(id) {
            tracing::warn!("Rejected style submission without edit permission");
            return vec![Notice::error("permission_denied", "You are not allowed to edit this item.")];
        }
        let borrow = ContentId::parse_lenient(&submission.borrowed);
        match self.store.submit(id, &submission.css, borrow) {
            Ok(outcome) => Notice::for_outcome(&outcome),
            Err(e) if matches!(&*e, StoreErrorKind::NotEligible(_)) => vec![],
            Err(e) => {
                tracing::error!(error = %e, "Could not save custom styles");
                vec![Notice::error("metadata_error", "Failed to save custom styles.")]
            },
        }
    }

    /// Link the viewed item's own stylesheet and, if set, the borrowed one.
    ///
    /// Returns the number of stylesheets registered.
    #[instrument(skip(self, sink))]
    pub fn on_render(&self, view: PageView, sink: &mut dyn AssetSink) -> usize {
        let PageView::Singular(id) = view else {
            return 0;
        };
        let Some(id) = ContentId::new(id) else {
            return 0;
        };
        let mut registered = 0;
        if let Some(asset) = self.store.publisher().resolve_for_serving(id) {
            sink.register(&format!("{OWN_HANDLE_PREFIX}{id}"), &asset.url, &[], asset.version);
            registered += 1;
        }
        let borrowed = match self.store.borrowed_from(id) {
            Ok(borrowed) => borrowed,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read borrowed stylesheet reference");
                None
            },
        };
        if let Some(borrowed) = borrowed
            && let Some(asset) = self.store.publisher().resolve_for_serving(borrowed)
        {
            sink.register(&format!("{BORROWED_HANDLE_PREFIX}{borrowed}"), &asset.url, &[], asset.version);
            registered += 1;
        }
        registered
    }

    /// Stylesheets the editor of `editing` may borrow.
    pub fn borrow_candidates(&self, editing: ContentId) -> Result<Vec<BorrowCandidate>> {
        self.store.list_borrow_candidates(editing).or_raise(|| ErrorKind::Store)
    }

    /// Remove all stored styles and published files.
    #[instrument(skip(self))]
    pub fn on_uninstall(&self) -> Result<()> {
        self.store.purge().or_raise(|| ErrorKind::Store)
    }
}
