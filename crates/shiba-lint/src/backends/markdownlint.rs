//! `markdownlint`: line-oriented rules named after markdownlint's rule ids.
//!
//! | rule  | checks                                  |
//! |-------|-----------------------------------------|
//! | MD009 | trailing spaces (two for a hard break are fine) |
//! | MD010 | hard tabs                               |
//! | MD012 | multiple consecutive blank lines        |
//! | MD013 | line length (`line_length`, default 80) |
//! | MD047 | file should end with a single newline   |

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml_ng::Value;

use super::{RuleToggles, column_of, parse_options, parse_toggles};
use crate::backend::LintBackend;
use crate::error::LintError;
use crate::result::Diagnostic;

const DEFAULT_LINE_LENGTH: usize = 80;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings {
    line_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            line_length: DEFAULT_LINE_LENGTH,
        }
    }
}

/// Line-based markdown rules.
#[derive(Debug, Clone)]
pub struct MarkdownLint {
    line_length: usize,
    toggles: RuleToggles,
}

impl Default for MarkdownLint {
    fn default() -> Self {
        Self {
            line_length: DEFAULT_LINE_LENGTH,
            toggles: RuleToggles::default(),
        }
    }
}

impl MarkdownLint {
    /// Registry name.
    pub const NAME: &'static str = "markdownlint";

    /// Rule documentation.
    pub const RULE_URL: &'static str =
        "https://github.com/DavidAnson/markdownlint/blob/main/doc/Rules.md";

    /// Creates the backend from `lint_options`.
    ///
    /// Recognises `line_length` plus rule id → bool switches.
    pub fn from_options(options: Option<&Value>) -> Result<Self, LintError> {
        let settings: Settings = parse_options(Self::NAME, options)?;
        if settings.line_length == 0 {
            return Err(LintError::invalid_options(
                Self::NAME,
                "line_length must be positive",
            ));
        }
        Ok(Self {
            line_length: settings.line_length,
            toggles: parse_toggles(Self::NAME, options, &["line_length"])?,
        })
    }

    fn check(&self, text: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut blank_run = 0usize;

        for (index, line) in text.lines().enumerate() {
            let number = index + 1;

            if self.toggles.is_enabled("MD009") {
                let trimmed = line.trim_end_matches([' ', '\t']);
                let trailing = line.len() - trimmed.len();
                let hard_break = trailing == 2 && line.ends_with("  ") && !trimmed.is_empty();
                if trailing > 0 && !hard_break {
                    diagnostics.push(Diagnostic::new(
                        "MD009",
                        format!("Trailing spaces [Expected: 0 or 2; Actual: {trailing}]"),
                        number,
                        column_of(line, trimmed.len()),
                    ));
                }
            }

            if self.toggles.is_enabled("MD010") {
                if let Some(tab) = line.find('\t') {
                    diagnostics.push(Diagnostic::new(
                        "MD010",
                        "Hard tabs",
                        number,
                        column_of(line, tab),
                    ));
                }
            }

            if line.trim().is_empty() {
                blank_run += 1;
                if blank_run == 2 && self.toggles.is_enabled("MD012") {
                    diagnostics.push(Diagnostic::new(
                        "MD012",
                        "Multiple consecutive blank lines",
                        number,
                        1,
                    ));
                }
            } else {
                blank_run = 0;
            }

            if self.toggles.is_enabled("MD013") {
                let length = line.chars().count();
                // Lines with no whitespace past the limit (long URLs) are allowed.
                let breakable = line
                    .chars()
                    .skip(self.line_length)
                    .any(char::is_whitespace);
                if length > self.line_length && breakable {
                    diagnostics.push(Diagnostic::new(
                        "MD013",
                        format!(
                            "Line length [Expected: {}; Actual: {length}]",
                            self.line_length
                        ),
                        number,
                        self.line_length + 1,
                    ));
                }
            }
        }

        if self.toggles.is_enabled("MD047") && !text.is_empty() && !text.ends_with('\n') {
            let last_line = text.lines().count();
            let column = text
                .lines()
                .last()
                .map_or(1, |line| line.chars().count() + 1);
            diagnostics.push(Diagnostic::new(
                "MD047",
                "Files should end with a single newline character",
                last_line,
                column,
            ));
        }

        diagnostics
    }
}

#[async_trait]
impl LintBackend for MarkdownLint {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn rule_url(&self) -> &str {
        Self::RULE_URL
    }

    async fn lint(&self, _file_name: &str, text: &str) -> Result<Vec<Diagnostic>, LintError> {
        Ok(self.check(text))
    }
}
