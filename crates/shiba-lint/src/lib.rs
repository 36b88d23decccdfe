//! Markdown linting behind a pluggable backend.
//!
//! The configuration names a backend (`linter`) and passes it free-form
//! options (`lint_options`). [`Linter`] resolves that name through a
//! [`LinterRegistry`] once, then lints whole documents on demand.
//!
//! ```text
//! Config.linter ──► LinterRegistry ──► Box<dyn LintBackend> ──► Linter::lint
//!                                                                   │
//!                                                       Option<LintResult>
//! ```
//!
//! Two backends are built in, see [`backends`].
//!
//! # Usage
//!
//! ```
//! use shiba_lint::Linter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let linter = Linter::new("markdownlint", None).unwrap();
//! let result = linter.lint("README.md", "# Title\n\ntext\n").await.unwrap();
//! assert!(result.is_clean());
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod backend;
pub mod backends;
pub mod error;
pub mod linter;
pub mod result;

pub use backend::{BackendFactory, LintBackend, LinterRegistry};
pub use backends::RuleToggles;
pub use error::LintError;
pub use linter::{DISABLED_LINTER, Linter};
pub use result::{Diagnostic, LintResult, Severity};
