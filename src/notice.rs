use derive_more::Display;
use pagestyle_publish::error::ErrorKind as PublishErrorKind;
use pagestyle_store::{Construct, SubmitOutcome};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    #[display("error")]
    Error,
    #[display("warning")]
    Warning,
}

/// A message for the editor, shown by the host after a content edit.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{level}: {message}")]
pub struct Notice {
    pub level: Level,
    /// Stable identifier, e.g. `css_validation_error`.
    pub code: &'static str,
    pub message: String,
}
impl Notice {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self { level: Level::Error, code, message: message.into() }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self { level: Level::Warning, code, message: message.into() }
    }

    pub(crate) fn removed(construct: Construct) -> Self {
        Self::warning("css_pattern_removed", format!("Removed {construct} from custom CSS."))
    }

    pub(crate) fn publish_failed(kind: &PublishErrorKind) -> Self {
        match kind {
            kind if kind.is_security_fault() => Self::error("path_traversal_error", "Invalid file path detected."),
            PublishErrorKind::DirectoryCreate(_) => Self::error("css_dir_error", "Failed to create CSS directory."),
            PublishErrorKind::FilesystemUnavailable(_) | PublishErrorKind::InvalidPath(_) => {
                Self::error("filesystem_error", "Failed to initialize filesystem.")
            },
            _ => Self::error("css_write_error", "Failed to write CSS file."),
        }
    }

    /// Notices to queue for a submission outcome. A clean save has none.
    pub fn for_outcome(outcome: &SubmitOutcome) -> Vec<Self> {
        match outcome {
            SubmitOutcome::Saved => vec![],
            SubmitOutcome::SavedWithWarnings(removed) => removed.iter().copied().map(Self::removed).collect(),
            SubmitOutcome::ValidationFailed(_) => {
                vec![Self::error("css_validation_error", "CSS validation error: Unbalanced braces detected.")]
            },
            SubmitOutcome::PublishFailed { error, removed } => std::iter::once(Self::publish_failed(error))
                .chain(removed.iter().copied().map(Self::removed))
                .collect(),
        }
    }
}
