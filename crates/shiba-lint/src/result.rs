//! Diagnostic types delivered to the host.

use serde::{Deserialize, Serialize};

/// Severity level for diagnostics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed.
    Error,
    /// Should be reviewed.
    #[default]
    Warning,
    /// Informational.
    Info,
}

impl Severity {
    /// Lowercase name, as serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding reported by a lint rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The rule that produced this diagnostic.
    pub rule_id: String,

    /// Human readable message.
    pub message: String,

    /// 1-based line.
    pub line: usize,

    /// 1-based column, in characters.
    pub column: usize,

    /// Severity level.
    #[serde(default)]
    pub severity: Severity,
}

impl Diagnostic {
    /// Creates a warning at `line`:`column`.
    pub fn new(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            line,
            column,
            severity: Severity::Warning,
        }
    }

    /// Sets the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Diagnostics for one document, keyed by its file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResult {
    /// Base name of the linted file.
    pub file_name: String,

    /// Findings, in document order.
    pub diagnostics: Vec<Diagnostic>,
}

impl LintResult {
    /// Creates a result for `file_name`.
    pub fn new(file_name: impl Into<String>, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));
        Self {
            file_name: file_name.into(),
            diagnostics,
        }
    }

    /// Returns `true` if no rule reported anything.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Counts diagnostics at `severity`.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}
