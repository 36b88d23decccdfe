//! Error types for the shiba-watcher crate.

use camino::Utf8PathBuf;
use shiba_lint::LintError;

/// Errors that can occur while watching a target.
///
/// Only [`WatchError::Lint`] ever reaches the caller of
/// [`Watcher::from_config`](crate::Watcher::from_config); everything else is
/// logged by the watcher, which then stays idle until the next start.
///
/// [`WatchError::NonUtf8Path`] never ends a watch: the offending event is
/// skipped and the handle keeps running.
///
/// # Examples
///
/// ```
/// use shiba_watcher::WatchError;
///
/// let err = WatchError::path_not_found("notes/today.md");
/// assert_eq!(err.path().map(|p| p.as_str()), Some("notes/today.md"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watch target does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    ///
    /// Events carrying such paths are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The extension glob could not be built.
    #[error("invalid extension glob: {0}")]
    Glob(#[from] globset::Error),

    /// The configured lint backend could not be resolved.
    #[error(transparent)]
    Lint(#[from] LintError),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns the watch target this error is about, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_)
            | Self::ChannelClosed
            | Self::NonUtf8Path(_)
            | Self::Io(_)
            | Self::Glob(_)
            | Self::Lint(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("docs/missing.md");
        assert_eq!(err.path().map(|p| p.as_str()), Some("docs/missing.md"));
        assert_eq!(err.to_string(), "path does not exist: docs/missing.md");
    }

    #[test]
    fn test_watch_error_non_utf8() {
        let err = WatchError::non_utf8_path(PathBuf::from("note.md"));
        assert!(err.path().is_none());
        assert_eq!(err.to_string(), "path is not valid UTF-8: note.md");
    }

    #[test]
    fn test_watch_error_glob() {
        let glob_err = globset::Glob::new("**/*.{md").expect_err("unclosed alternation");
        let err = WatchError::from(glob_err);
        assert!(err.path().is_none());
        assert!(err.to_string().starts_with("invalid extension glob"));
    }

    #[test]
    fn test_watch_error_lint_is_transparent() {
        let err = WatchError::from(LintError::UnknownBackend {
            name: "textlint".to_owned(),
            available: vec!["mdast-lint".to_owned()],
        });
        assert!(matches!(err, WatchError::Lint(_)));
        assert!(err.to_string().contains("textlint"));
    }
}
