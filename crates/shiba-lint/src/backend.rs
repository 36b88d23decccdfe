//! The lint backend seam and the registry that resolves backends by name.
//!
//! A backend is anything implementing [`LintBackend`]. Backends are created
//! through a [`LinterRegistry`] from the name stored in the configuration,
//! so an unknown name is reported once when the linter is built instead of
//! on every lint call.
//!
//! # Examples
//!
//! ```
//! use async_trait::async_trait;
//! use shiba_lint::{Diagnostic, LintBackend, LintError, LinterRegistry};
//!
//! struct Silent;
//!
//! #[async_trait]
//! impl LintBackend for Silent {
//!     fn name(&self) -> &str {
//!         "silent"
//!     }
//!
//!     fn rule_url(&self) -> &str {
//!         "https://example.com/rules"
//!     }
//!
//!     async fn lint(&self, _file_name: &str, _text: &str) -> Result<Vec<Diagnostic>, LintError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let mut registry = LinterRegistry::builtin();
//! registry.register("silent", |_options| Ok(Box::new(Silent)));
//! assert!(registry.contains("silent"));
//! ```

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_yaml_ng::Value;

use crate::backends::{markdownlint::MarkdownLint, mdast::MdastLint};
use crate::error::LintError;
use crate::result::Diagnostic;

/// A named lint implementation.
///
/// Implementations must be [`Send`] and [`Sync`] because lint calls are
/// spawned as independent tasks sharing one backend.
#[async_trait]
pub trait LintBackend: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &str;

    /// Documentation for the rules this backend reports.
    fn rule_url(&self) -> &str;

    /// Lints `text`, the contents of the file named `file_name`.
    async fn lint(&self, file_name: &str, text: &str) -> Result<Vec<Diagnostic>, LintError>;
}

/// Builds a backend from its `lint_options`.
pub type BackendFactory = fn(Option<&Value>) -> Result<Box<dyn LintBackend>, LintError>;

/// Backend constructors keyed by name.
#[derive(Clone, Default)]
pub struct LinterRegistry {
    factories: FxHashMap<String, BackendFactory>,
}

impl std::fmt::Debug for LinterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinterRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl LinterRegistry {
    /// Creates a registry without any backend.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in `mdast-lint` and `markdownlint`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(MdastLint::NAME, |options| {
            Ok(Box::new(MdastLint::from_options(options)?))
        });
        registry.register(MarkdownLint::NAME, |options| {
            Ok(Box::new(MarkdownLint::from_options(options)?))
        });
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Returns `true` if a backend is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Creates the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::UnknownBackend`] if nothing is registered under
    /// `name`, or whatever the factory reports for bad options.
    pub fn create(
        &self,
        name: &str,
        options: Option<&Value>,
    ) -> Result<Box<dyn LintBackend>, LintError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LintError::UnknownBackend {
                name: name.to_owned(),
                available: self.names(),
            })?;
        factory(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = LinterRegistry::builtin();
        assert_eq!(registry.names(), ["markdownlint", "mdast-lint"]);
        assert!(registry.contains("mdast-lint"));
        assert!(!registry.contains("remark"));
    }

    #[test]
    fn test_create_known() {
        let registry = LinterRegistry::builtin();
        let backend = registry.create("markdownlint", None).expect("known backend");
        assert_eq!(backend.name(), "markdownlint");
        assert!(backend.rule_url().starts_with("https://"));
    }

    #[test]
    fn test_create_unknown() {
        let registry = LinterRegistry::builtin();
        match registry.create("textlint", None) {
            Err(LintError::UnknownBackend { name, available }) => {
                assert_eq!(name, "textlint");
                assert_eq!(available.len(), 2);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown backend must not resolve"),
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = LinterRegistry::empty();
        assert!(registry.names().is_empty());
        assert!(registry.create("mdast-lint", None).is_err());
    }
}
