//! File change events delivered by a [`WatchHandle`](crate::WatchHandle).
//!
//! # Event Flow
//!
//! ```text
//! notify::Event ──► from_notify ──► FileFilter ──► FileEvent ──► Dispatcher
//! ```

use std::fmt;
use std::time::Instant;

use camino::Utf8PathBuf;
use notify::event::{EventKind, ModifyKind, RenameMode};
use smallvec::SmallVec;

use crate::error::WatchError;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    /// The file appeared (created, or renamed into place).
    Added,
    /// The file's contents changed.
    Changed,
}

impl FileEventKind {
    /// Maps a notify event kind, ignoring metadata, access and removal.
    ///
    /// ```
    /// use notify::event::{CreateKind, EventKind, MetadataKind, ModifyKind};
    /// use shiba_watcher::FileEventKind;
    ///
    /// assert_eq!(
    ///     FileEventKind::from_notify(&EventKind::Create(CreateKind::File)),
    ///     Some(FileEventKind::Added)
    /// );
    /// assert_eq!(
    ///     FileEventKind::from_notify(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
    ///     None
    /// );
    /// ```
    #[must_use]
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Added),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
                Some(Self::Added)
            }
            EventKind::Modify(ModifyKind::Name(_)) => None,
            EventKind::Modify(_) => Some(Self::Changed),
            EventKind::Access(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => {
                None
            }
        }
    }

    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
        }
    }
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file change event with a UTF-8 path guarantee.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use shiba_watcher::{FileEvent, FileEventKind};
///
/// let event = FileEvent::changed(Utf8PathBuf::from("docs/note.md"));
/// assert_eq!(event.kind, FileEventKind::Changed);
/// assert_eq!(event.extension(), Some("md"));
/// assert_eq!(event.file_name(), Some("note.md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the file.
    pub path: Utf8PathBuf,

    /// What happened to it.
    pub kind: FileEventKind,

    /// When the event was received. Monotonic, not wall-clock.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: FileEventKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Shorthand for an [`FileEventKind::Added`] event.
    #[inline]
    #[must_use]
    pub fn added(path: Utf8PathBuf) -> Self {
        Self::new(path, FileEventKind::Added)
    }

    /// Shorthand for a [`FileEventKind::Changed`] event.
    #[inline]
    #[must_use]
    pub fn changed(path: Utf8PathBuf) -> Self {
        Self::new(path, FileEventKind::Changed)
    }

    /// Returns the file extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// Converts one notify event into zero or more file events.
///
/// Rename events carrying both paths only yield the destination. Paths that
/// are not UTF-8 are logged and skipped.
pub(crate) fn from_notify(event: notify::Event) -> SmallVec<[FileEvent; 2]> {
    let Some(kind) = FileEventKind::from_notify(&event.kind) else {
        return SmallVec::new();
    };

    let paths = if matches!(event.kind, EventKind::Modify(ModifyKind::Name(RenameMode::Both))) {
        event.paths.into_iter().skip(1).collect::<Vec<_>>()
    } else {
        event.paths
    };

    paths
        .into_iter()
        .filter_map(|path| match Utf8PathBuf::try_from(path) {
            Ok(path) => Some(FileEvent::new(path, kind)),
            Err(e) => {
                let error = WatchError::non_utf8_path(e.into_path_buf());
                tracing::warn!(error = %error, "Skipping file event");
                None
            }
        })
        .collect()
}
