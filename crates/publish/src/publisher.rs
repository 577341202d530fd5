//! Stylesheet publisher for the local filesystem.
//!
//! One file per content item, named `post-styles-<id>.css`, all inside a
//! single managed directory beneath the host's upload directory. Every
//! operation re-checks that the file it is about to touch resolves inside
//! that directory.

use crate::error::{ErrorKind, Result};
use crate::path::{confine, validate_directory_name};
use crate::{ContentId, ServedAsset};
use exn::ResultExt;
use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::instrument;

/// Default name of the managed directory beneath the upload directory.
pub const DEFAULT_DIRECTORY: &str = "custom-page-styles";

const INDEX_FILE: (&str, &str) = ("index.php", "<?php // Silence is golden");
const ACCESS_FILE: (&str, &str) = (
    ".htaccess",
    "# Prevent PHP execution in uploads directory\n<Files *.php>\ndeny from all\n</Files>\n",
);
const HEADER_END: &str = "\n */\n\n";

/// Publishes sanitized CSS as static stylesheet files.
///
/// # Examples
///
/// ```no_run
/// use pagestyle_publish::{ContentId, Publisher};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let publisher = Publisher::new("/var/www/uploads", "https://example.com/uploads", "custom-page-styles")?;
/// let id = ContentId::new(42).unwrap();
/// publisher.publish(id, "body{color:red}")?;
/// let asset = publisher.resolve_for_serving(id).unwrap();
/// assert!(asset.url.ends_with("post-styles-42.css"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Publisher {
    /// Managed directory: `<upload_dir>/<directory>`
    dir: PathBuf,
    /// Public URL of the managed directory, without trailing slash.
    url: String,
}
impl Publisher {
    /// Create a publisher rooted at `<upload_dir>/<directory>`.
    ///
    /// Nothing is created on disk here; the managed directory is created
    /// lazily by [`publish()`](Self::publish) or eagerly by
    /// [`ensure_directory()`](Self::ensure_directory).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if `upload_dir` is not
    /// absolute or `directory` is not a single plain path component.
    pub fn new(upload_dir: impl AsRef<Path>, upload_url: impl AsRef<str>, directory: impl AsRef<Path>) -> Result<Self> {
        let upload_dir = upload_dir.as_ref();
        if !upload_dir.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(upload_dir.to_path_buf()));
        }
        let directory = validate_directory_name(directory)?;
        let url = format!(
            "{}/{}",
            upload_url.as_ref().trim_end_matches('/'),
            directory.to_string_lossy()
        );
        Ok(Self { dir: upload_dir.join(directory), url })
    }

    /// Absolute path of the managed directory.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Deterministic filename for a content item's stylesheet.
    pub fn filename(id: ContentId) -> String {
        format!("post-styles-{id}.css")
    }

    fn target(&self, id: ContentId) -> PathBuf {
        self.dir.join(Self::filename(id))
    }

    /// Create the managed directory if it does not exist yet.
    ///
    /// On first creation the directory also receives an `index.php` and an
    /// `.htaccess` so the web server neither lists the directory nor executes
    /// anything placed in it. Failing to write those is logged, not fatal.
    ///
    /// Returns `true` if the directory was created by this call.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn ensure_directory(&self) -> Result<bool> {
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => return Ok(false),
            Ok(_) => exn::bail!(ErrorKind::DirectoryCreate(self.dir.clone())),
            Err(e) if e.kind() == IoErrorKind::NotFound => {},
            Err(e) => return Err(e).or_raise(|| ErrorKind::DirectoryCreate(self.dir.clone())),
        }
        fs::create_dir_all(&self.dir).or_raise(|| ErrorKind::DirectoryCreate(self.dir.clone()))?;
        for (name, contents) in [INDEX_FILE, ACCESS_FILE] {
            if let Err(e) = fs::write(self.dir.join(name), contents) {
                tracing::warn!(file = name, error = %e, "Could not write protective marker file");
            }
        }
        tracing::info!("Created managed stylesheet directory");
        Ok(true)
    }

    /// Write (or overwrite) the stylesheet for `id`.
    ///
    /// The file consists of a generated comment block followed by `css`
    /// verbatim. Content is staged in a temporary file in the managed
    /// directory and renamed into place.
    ///
    /// Returns the path of the written file.
    #[instrument(skip(self, css), fields(css_size = css.len()))]
    pub fn publish(&self, id: ContentId, css: &str) -> Result<PathBuf> {
        self.ensure_directory()?;
        let target = self.target(id);
        let resolved = confine(&self.dir, &target).inspect_err(|e| {
            tracing::warn!(path = %target.display(), error = %e, "Refusing to write stylesheet");
        })?;
        let contents = Self::render(id, css, OffsetDateTime::now_utc()).or_raise(|| ErrorKind::Write(target.clone()))?;

        // The staging file lives next to the target so the rename never
        // crosses filesystems.
        let staging_dir = resolved.parent().unwrap_or(&self.dir);
        let mut staged = tempfile::Builder::new()
            .prefix(".post-styles-")
            .suffix(".tmp")
            .tempfile_in(staging_dir)
            .or_raise(|| ErrorKind::Write(target.clone()))?;
        staged.write_all(contents.as_bytes()).or_raise(|| ErrorKind::Write(target.clone()))?;
        staged.flush().or_raise(|| ErrorKind::Write(target.clone()))?;
        // Temp files are created owner-only; the web server has to read these.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o644))
                .or_raise(|| ErrorKind::Write(target.clone()))?;
        }
        staged.persist(&target).map_err(|e| e.error).or_raise(|| ErrorKind::Write(target.clone()))?;
        tracing::debug!(path = %target.display(), "Published stylesheet");
        Ok(target)
    }

    /// Delete the stylesheet for `id`.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// [`PathTraversal`](ErrorKind::PathTraversal) if the file resolves
    /// outside the managed directory, [`Write`](ErrorKind::Write) if it
    /// exists but could not be deleted.
    #[instrument(skip(self))]
    pub fn remove(&self, id: ContentId) -> Result<bool> {
        let target = self.target(id);
        if target.symlink_metadata().is_err() {
            return Ok(false);
        }
        confine(&self.dir, &target).inspect_err(|e| {
            tracing::warn!(path = %target.display(), error = %e, "Refusing to delete stylesheet");
        })?;
        fs::remove_file(&target).or_raise(|| ErrorKind::Write(target.clone()))?;
        tracing::debug!(path = %target.display(), "Removed stylesheet");
        Ok(true)
    }

    /// Delete the stylesheet for `id`, reporting only whether a file went
    /// away. See [`remove()`](Self::remove) for the failure cases.
    pub fn unpublish(&self, id: ContentId) -> bool {
        match self.remove(id) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "Could not delete stylesheet");
                false
            },
        }
    }

    /// Locate the published stylesheet for `id` for linking into a page.
    ///
    /// Fails closed: a missing file, a file that resolves outside the managed
    /// directory, or unreadable metadata all yield `None`.
    #[instrument(skip(self))]
    pub fn resolve_for_serving(&self, id: ContentId) -> Option<ServedAsset> {
        let target = self.target(id);
        if target.symlink_metadata().is_err() {
            return None;
        }
        let resolved = match confine(&self.dir, &target) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(path = %target.display(), error = %e, "Refusing to serve stylesheet");
                return None;
            },
        };
        let meta = fs::metadata(&resolved).ok().filter(|meta| meta.is_file())?;
        let modified = meta.modified().ok()?;
        Some(ServedAsset {
            url: format!("{}/{}", self.url, Self::filename(id)),
            version: OffsetDateTime::from(modified).unix_timestamp(),
        })
    }

    /// Read back the CSS body of a published stylesheet (header removed).
    pub fn read(&self, id: ContentId) -> Result<String> {
        let target = self.target(id);
        if target.symlink_metadata().is_err() {
            exn::bail!(ErrorKind::NotFound(target));
        }
        let resolved = confine(&self.dir, &target)?;
        let contents = fs::read_to_string(&resolved).map_err(ErrorKind::Io)?;
        Ok(Self::body(&contents).to_string())
    }

    /// Remove the managed directory and every file in it.
    ///
    /// Returns `false` if the directory did not exist.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn purge(&self) -> Result<bool> {
        match fs::symlink_metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => {},
            // Never follow a symlinked managed directory on removal, only
            // remove the link.
            Ok(_) => {
                fs::remove_file(&self.dir).map_err(ErrorKind::Io)?;
                return Ok(true);
            },
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(false),
            Err(e) => exn::bail!(ErrorKind::Io(e)),
        }
        fs::remove_dir_all(&self.dir).map_err(ErrorKind::Io)?;
        tracing::info!("Removed managed stylesheet directory");
        Ok(true)
    }

    fn render(id: ContentId, css: &str, generated: OffsetDateTime) -> std::result::Result<String, time::error::Format> {
        let timestamp = generated.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))?;
        Ok(format!(
            "/**\n * Custom Page Styles for Post ID: {id}\n * Generated: {timestamp}{HEADER_END}{css}"
        ))
    }

    fn body(contents: &str) -> &str {
        contents.split_once(HEADER_END).map(|(_, body)| body).unwrap_or(contents)
    }
}
