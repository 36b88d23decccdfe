//! Live preview engine: watch a document or directory, render and lint on change.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── Watcher ─────────────────────────────┐
//! │  state: Idle | Watching        target: Utf8PathBuf                 │
//! │                                                                    │
//! │  WatchHandle ──► pump task ──► Dispatcher ──► spawned pipeline     │
//! │  (notify +       (cancelled     (classify,     (read, lint, render │
//! │   filters)        on stop)       sequence)      ──► PreviewSink)   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! shiba-cli ──► shiba-watcher ──► shiba-lint ──► shiba-core
//!                            └───────────────────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use camino::Utf8Path;
//! use shiba_core::ConfigStore;
//! use shiba_lint::LintResult;
//! use shiba_watcher::{PreviewSink, RenderPayload, Watcher};
//!
//! struct Log;
//!
//! impl PreviewSink for Log {
//!     fn render(&self, payload: RenderPayload) {
//!         println!("render {}", payload.category());
//!     }
//!
//!     fn lint_result(&self, file_name: &str, result: LintResult) {
//!         println!("{file_name}: {} problems", result.diagnostics.len());
//!     }
//!
//!     fn add_recent_document(&self, path: &Utf8Path) {
//!         println!("opened {path}");
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), shiba_watcher::WatchError> {
//!     let store = ConfigStore::user_default();
//!     let mut watcher = Watcher::from_config("README.md", store.load(), Arc::new(Log))?;
//!     watcher.start("README.md").await;
//!     tokio::signal::ctrl_c().await?;
//!     watcher.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Only an unresolvable lint backend is reported to the caller, by
//! [`Watcher::from_config`]. Missing targets, unreadable files, failing
//! lints and unclassified files are logged and skipped.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod handle;
pub mod pipeline;
pub mod render;
pub mod sequence;
pub mod watcher;

pub use error::WatchError;
pub use events::{FileEvent, FileEventKind};
pub use filter::{AcceptAllFilter, CompositeFilter, FileFilter, GlobFilter, HiddenFilter};
pub use handle::WatchHandle;
pub use pipeline::{Dispatcher, PreviewSink, RenderPayload};
pub use render::{GfmRenderer, MarkdownRenderer};
pub use sequence::Sequencer;
pub use watcher::{WatchState, Watcher};
