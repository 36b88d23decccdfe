//! The linter adapter used by the watcher.
//!
//! [`Linter`] wraps one resolved [`LintBackend`] and absorbs its failures:
//! a failing lint is logged and reported as "no diagnostics for this update"
//! so that rendering is never held up by the linter.

use serde_yaml_ng::Value;
use shiba_core::Config;

use crate::backend::{LintBackend, LinterRegistry};
use crate::error::LintError;
use crate::result::LintResult;

/// Backend name that turns linting off.
pub const DISABLED_LINTER: &str = "none";

/// A resolved lint backend.
///
/// # Examples
///
/// ```
/// use shiba_lint::Linter;
///
/// let linter = Linter::new("markdownlint", None).unwrap();
/// assert_eq!(linter.backend_name(), "markdownlint");
/// assert!(Linter::new("no-such-linter", None).is_err());
/// ```
pub struct Linter {
    backend: Box<dyn LintBackend>,
}

impl std::fmt::Debug for Linter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linter")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Linter {
    /// Resolves `name` among the built-in backends.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::UnknownBackend`] or [`LintError::InvalidOptions`].
    pub fn new(name: &str, options: Option<&Value>) -> Result<Self, LintError> {
        Self::with_registry(&LinterRegistry::builtin(), name, options)
    }

    /// Resolves `name` in `registry`.
    pub fn with_registry(
        registry: &LinterRegistry,
        name: &str,
        options: Option<&Value>,
    ) -> Result<Self, LintError> {
        let backend = registry.create(name, options)?;
        tracing::debug!(backend = backend.name(), "Lint backend resolved");
        Ok(Self { backend })
    }

    /// Wraps an already constructed backend.
    #[must_use]
    pub fn from_backend(backend: Box<dyn LintBackend>) -> Self {
        Self { backend }
    }

    /// Resolves the backend named by `config.linter` with `config.lint_options`.
    ///
    /// Returns `Ok(None)` when linting is turned off (`none` or an empty name).
    pub fn from_config(config: &Config) -> Result<Option<Self>, LintError> {
        Self::from_config_with_registry(&LinterRegistry::builtin(), config)
    }

    /// Same as [`Linter::from_config`] with a custom registry.
    pub fn from_config_with_registry(
        registry: &LinterRegistry,
        config: &Config,
    ) -> Result<Option<Self>, LintError> {
        let name = config.linter.trim();
        if name.is_empty() || name == DISABLED_LINTER {
            tracing::info!("Linting disabled by configuration");
            return Ok(None);
        }
        Self::with_registry(registry, name, config.lint_options.as_ref()).map(Some)
    }

    /// Name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Documentation for the active ruleset.
    #[must_use]
    pub fn lint_rule_url(&self) -> &str {
        self.backend.rule_url()
    }

    /// Lints `text` and propagates backend failures.
    pub async fn try_lint(&self, file_name: &str, text: &str) -> Result<LintResult, LintError> {
        let diagnostics = self.backend.lint(file_name, text).await?;
        Ok(LintResult::new(file_name, diagnostics))
    }

    /// Lints `text`, logging and swallowing backend failures.
    pub async fn lint(&self, file_name: &str, text: &str) -> Option<LintResult> {
        match self.try_lint(file_name, text).await {
            Ok(result) => {
                tracing::debug!(
                    file = file_name,
                    diagnostics = result.diagnostics.len(),
                    "Lint finished"
                );
                Some(result)
            }
            Err(error) => {
                tracing::warn!(file = file_name, error = %error, "Lint failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Diagnostic;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl LintBackend for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn rule_url(&self) -> &str {
            "https://example.com/failing"
        }

        async fn lint(&self, _file_name: &str, _text: &str) -> Result<Vec<Diagnostic>, LintError> {
            Err(LintError::backend("failing", "malformed input"))
        }
    }

    #[test]
    fn test_new_known_backend() {
        let linter = Linter::new("mdast-lint", None).expect("builtin");
        assert_eq!(linter.backend_name(), "mdast-lint");
        assert_eq!(
            linter.lint_rule_url(),
            "https://github.com/remarkjs/remark-lint#rules"
        );
    }

    #[test]
    fn test_new_unknown_backend() {
        assert!(matches!(
            Linter::new("remark-lint-legacy", None),
            Err(LintError::UnknownBackend { .. })
        ));
    }

    #[test]
    fn test_from_config_default() {
        let linter = Linter::from_config(&Config::default())
            .expect("defaults resolve")
            .expect("linting enabled");
        assert_eq!(linter.backend_name(), "mdast-lint");
    }

    #[test]
    fn test_from_config_disabled() {
        let config = Config {
            linter: "none".to_owned(),
            ..Config::default()
        };
        assert!(Linter::from_config(&config).expect("ok").is_none());
    }

    #[test]
    fn test_from_config_bad_options() {
        let config = Config {
            linter: "markdownlint".to_owned(),
            lint_options: Some(serde_yaml_ng::from_str("line_length: -3").expect("yaml")),
            ..Config::default()
        };
        assert!(matches!(
            Linter::from_config(&config),
            Err(LintError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = LinterRegistry::empty();
        registry.register("failing", |_| Ok(Box::new(Failing)));
        let linter = Linter::with_registry(&registry, "failing", None).expect("registered");
        assert_eq!(linter.backend_name(), "failing");
    }

    #[tokio::test]
    async fn test_lint_reports_file_name() {
        let linter = Linter::new("markdownlint", None).expect("builtin");
        let result = linter
            .lint("note.md", "trailing \n")
            .await
            .expect("diagnostics");
        assert_eq!(result.file_name, "note.md");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].rule_id, "MD009");
    }

    #[tokio::test]
    async fn test_lint_failure_is_absorbed() {
        let linter = Linter::from_backend(Box::new(Failing));
        assert!(linter.lint("note.md", "# hi\n").await.is_none());
        assert!(matches!(
            linter.try_lint("note.md", "# hi\n").await,
            Err(LintError::Backend { .. })
        ));
    }
}
