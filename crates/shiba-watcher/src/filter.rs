//! File filtering for watch events.
//!
//! Filters run on the blocking watcher thread, before events reach the
//! channel. The watcher combines a [`GlobFilter`] over every configured
//! extension with a [`HiddenFilter`] that skips dotfiles and dot-directories.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8Path;
//! use shiba_watcher::{CompositeFilter, FileFilter, GlobFilter, HiddenFilter};
//!
//! let root = Utf8Path::new("/notes");
//! let filter = CompositeFilter::new()
//!     .and(GlobFilter::new(root, ["md", "html"]).unwrap())
//!     .and(HiddenFilter::new(root));
//!
//! assert!(filter.should_process(Utf8Path::new("/notes/todo.md")));
//! assert!(filter.should_process(Utf8Path::new("/notes/site/index.html")));
//! assert!(!filter.should_process(Utf8Path::new("/notes/.git/HEAD.md")));
//! assert!(!filter.should_process(Utf8Path::new("/notes/logo.png")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobMatcher};
use smallvec::SmallVec;

use crate::error::WatchError;

/// A predicate deciding which file events to forward.
///
/// Filters must be [`Send`] and [`Sync`] because they are used from the
/// blocking watcher thread, and `'static` to be moved into it.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the event for `path` should be forwarded.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Matches `**/*.{ext,...}` below a root directory.
///
/// Matching is case-sensitive, like classification.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    root: Utf8PathBuf,
    extensions: SmallVec<[String; 4]>,
    matcher: GlobMatcher,
}

impl GlobFilter {
    /// Builds the glob for `extensions` rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Glob`] if an extension makes the pattern invalid.
    pub fn new<I, S>(root: &Utf8Path, extensions: I) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions: SmallVec<[String; 4]> = extensions.into_iter().map(Into::into).collect();
        let pattern = glob_pattern(&extensions);
        let matcher = Glob::new(&pattern)?.compile_matcher();
        tracing::debug!(root = %root, pattern = %pattern, "Built extension glob");
        Ok(Self {
            root: root.to_owned(),
            extensions,
            matcher,
        })
    }

    /// The extensions this filter accepts.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl FileFilter for GlobFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        // A file target is its own root.
        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_str().is_empty() => rel,
            Ok(_) => path.file_name().map_or(path, Utf8Path::new),
            Err(_) => return false,
        };
        self.matcher.is_match(relative.as_std_path())
    }
}

fn glob_pattern(extensions: &[String]) -> String {
    match extensions {
        [single] => format!("**/*.{single}"),
        many => format!("**/*.{{{}}}", many.join(",")),
    }
}

/// Rejects paths with a component starting with `.` below the root.
///
/// Components above the root are not inspected, so a target that itself
/// lives under a dot-directory is still watched.
#[derive(Debug, Clone)]
pub struct HiddenFilter {
    root: Utf8PathBuf,
}

impl HiddenFilter {
    /// Creates a filter for paths below `root`.
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
        }
    }
}

impl FileFilter for HiddenFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !relative
            .components()
            .any(|component| component.as_str().starts_with('.') && component.as_str() != ".")
    }
}

/// Combines filters with AND logic. An empty composite accepts everything.
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl CompositeFilter {
    /// Creates an empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter to the composite.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|f| f.should_process(path))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(root: &str, extensions: &[&str]) -> GlobFilter {
        GlobFilter::new(Utf8Path::new(root), extensions.iter().copied()).expect("valid glob")
    }

    #[test]
    fn test_accept_all_filter() {
        assert!(AcceptAllFilter.should_process(Utf8Path::new("anything.txt")));
        assert!(AcceptAllFilter.should_process(Utf8Path::new("")));
    }

    #[test]
    fn test_glob_pattern() {
        assert_eq!(glob_pattern(&["md".to_owned()]), "**/*.md");
        assert_eq!(
            glob_pattern(&["md".to_owned(), "html".to_owned()]),
            "**/*.{md,html}"
        );
    }

    #[test]
    fn test_glob_filter_recursive() {
        let filter = glob("/notes", &["md", "markdown", "html"]);
        assert!(filter.should_process(Utf8Path::new("/notes/a.md")));
        assert!(filter.should_process(Utf8Path::new("/notes/deep/er/b.markdown")));
        assert!(filter.should_process(Utf8Path::new("/notes/index.html")));
        assert!(!filter.should_process(Utf8Path::new("/notes/image.png")));
        assert!(!filter.should_process(Utf8Path::new("/notes/README")));
        assert_eq!(filter.extensions().len(), 3);
    }

    #[test]
    fn test_glob_filter_case_sensitive() {
        let filter = glob("/notes", &["md"]);
        assert!(!filter.should_process(Utf8Path::new("/notes/SHOUT.MD")));
    }

    #[test]
    fn test_glob_filter_outside_root() {
        let filter = glob("/notes", &["md"]);
        assert!(!filter.should_process(Utf8Path::new("/elsewhere/a.md")));
    }

    #[test]
    fn test_glob_filter_file_root() {
        let filter = glob("/notes/today.md", &["md"]);
        assert!(filter.should_process(Utf8Path::new("/notes/today.md")));
    }

    #[test]
    fn test_hidden_filter() {
        let filter = HiddenFilter::new(Utf8Path::new("/notes"));
        assert!(filter.should_process(Utf8Path::new("/notes/a.md")));
        assert!(!filter.should_process(Utf8Path::new("/notes/.draft.md")));
        assert!(!filter.should_process(Utf8Path::new("/notes/.obsidian/cache.md")));
    }

    #[test]
    fn test_hidden_filter_root_under_dot_directory() {
        let filter = HiddenFilter::new(Utf8Path::new("/home/me/.config/notes"));
        assert!(filter.should_process(Utf8Path::new("/home/me/.config/notes/a.md")));
    }

    #[test]
    fn test_composite_filter() {
        let root = Utf8Path::new("/notes");
        let filter = CompositeFilter::new()
            .and(glob("/notes", &["md"]))
            .and(HiddenFilter::new(root));
        assert!(filter.should_process(Utf8Path::new("/notes/a.md")));
        assert!(!filter.should_process(Utf8Path::new("/notes/.a.md")));
        assert!(!filter.should_process(Utf8Path::new("/notes/a.txt")));
        assert!(CompositeFilter::default().should_process(Utf8Path::new("x")));
    }

    #[test]
    fn test_shared_filter() {
        let shared: std::sync::Arc<dyn FileFilter> = std::sync::Arc::new(HiddenFilter::new(
            Utf8Path::new("/notes"),
        ));
        assert!(shared.should_process(Utf8Path::new("/notes/a.md")));
    }
}
