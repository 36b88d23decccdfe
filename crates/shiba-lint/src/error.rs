//! Error types for the shiba-lint crate.

/// Errors raised while resolving or running a lint backend.
///
/// [`LintError::UnknownBackend`] and [`LintError::InvalidOptions`] are raised
/// once, when the linter is built. [`LintError::Backend`] is raised per
/// document and only costs that document its diagnostics.
///
/// # Examples
///
/// ```
/// use shiba_lint::LintError;
///
/// let err = LintError::backend("mdast-lint", "unexpected end of input");
/// assert!(matches!(err, LintError::Backend { .. }));
/// assert!(err.to_string().contains("mdast-lint"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// No backend is registered under the requested name.
    #[error("unknown lint backend '{name}' (available: {})", available.join(", "))]
    UnknownBackend {
        /// The requested backend name.
        name: String,
        /// Names registered at lookup time.
        available: Vec<String>,
    },

    /// The backend rejected its `lint_options`.
    #[error("invalid options for lint backend '{backend}': {reason}")]
    InvalidOptions {
        /// The backend that rejected the options.
        backend: String,
        /// Why the options were rejected.
        reason: String,
    },

    /// The backend failed while linting a document.
    #[error("lint backend '{backend}' failed: {message}")]
    Backend {
        /// The failing backend.
        backend: String,
        /// Description of the failure.
        message: String,
    },
}

impl LintError {
    /// Creates a [`LintError::InvalidOptions`] error.
    pub fn invalid_options(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`LintError::Backend`] error.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
