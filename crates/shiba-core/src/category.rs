//! Document categories and extension classification.
//!
//! A changed file is routed through one of two pipelines depending on its
//! [`Category`]. The category is derived from the file extension by looking it
//! up in the configured `file_ext` lists, see [`classify`].
//!
//! # Case policy
//!
//! Extensions are compared literally, without case folding. A file named
//! `README.MD` is *not* classified as markdown unless `MD` itself appears in
//! the configured list.
//!
//! ```
//! use shiba_core::{classify, Category, Config};
//!
//! let config = Config::default();
//! assert_eq!(classify("md", &config), Some(Category::Markdown));
//! assert_eq!(classify("html", &config), Some(Category::Html));
//! assert_eq!(classify("MD", &config), None);
//! assert_eq!(classify("", &config), None);
//! ```

use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// The kind of document a watched file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Markdown source, rendered to HTML before display.
    Markdown,
    /// HTML document, handed to the display sink by path.
    Html,
}

impl Category {
    /// Every category the pipeline knows how to process.
    pub const ALL: [Self; 2] = [Self::Markdown, Self::Html];

    /// Returns the configuration key naming this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `file_ext` key does not name a known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            other => Err(UnknownCategory(other.to_owned())),
        }
    }
}

/// Resolves the category of a file extension (given without the leading dot).
///
/// The `file_ext` lists are searched in document order and the first list
/// containing `extension` decides. Returns `None` for an empty extension, for
/// an extension absent from every list, and for a list whose key is not a
/// known [`Category`].
#[must_use]
pub fn classify(extension: &str, config: &Config) -> Option<Category> {
    if extension.is_empty() {
        return None;
    }

    config
        .file_ext
        .iter()
        .find(|(_, extensions)| extensions.iter().any(|e| e == extension))
        .and_then(|(key, _)| key.parse().ok())
}

/// Resolves the category of a path from its extension.
#[must_use]
pub fn classify_path(path: &Utf8Path, config: &Config) -> Option<Category> {
    path.extension().and_then(|ext| classify(ext, config))
}
