//! Per-event dispatch: classify, read, lint and render.
//!
//! ```text
//!                     ┌─ html ─────► sink.render(Html(path))
//! FileEvent ─► classify
//!                     └─ markdown ─► read ─┬─► linter.lint ──► sink.lint_result
//!                                          └─► to_html + emoji ─► sink.render(Markdown(html))
//! ```
//!
//! Every dispatched event runs in its own task. Lint and render of one
//! document run concurrently and independently: a failing lint never
//! holds back the render. Results are delivered only while their event is
//! still the newest one for that path (see [`Sequencer`]).

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use shiba_core::{Category, Config, classify, emoji};
use shiba_lint::{LintResult, Linter};
use tokio::task::JoinHandle;

use crate::events::FileEvent;
use crate::render::{GfmRenderer, MarkdownRenderer};
use crate::sequence::Sequencer;

/// What the display should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPayload {
    /// Converted markdown, already passed through the emoji transform.
    Markdown(String),
    /// An HTML document the display loads itself.
    Html(Utf8PathBuf),
}

impl RenderPayload {
    /// The category this payload belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Markdown(_) => Category::Markdown,
            Self::Html(_) => Category::Html,
        }
    }

    /// The HTML fragment or the document path.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Markdown(html) => html,
            Self::Html(path) => path.as_str(),
        }
    }
}

/// The display side of the pipeline.
///
/// Calls come from pipeline tasks, never from inside
/// [`Watcher::start`](crate::Watcher::start) or
/// [`Watcher::change_watching_dir`](crate::Watcher::change_watching_dir)
/// themselves. Implementations should return quickly.
pub trait PreviewSink: Send + Sync + 'static {
    /// Shows new content.
    fn render(&self, payload: RenderPayload);

    /// Receives diagnostics for the document named `file_name`.
    fn lint_result(&self, file_name: &str, result: LintResult);

    /// Records a markdown document as recently opened.
    fn add_recent_document(&self, _path: &Utf8Path) {}
}

/// Routes file events through the render and lint pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<Config>,
    linter: Option<Arc<Linter>>,
    renderer: Arc<dyn MarkdownRenderer>,
    sink: Arc<dyn PreviewSink>,
    sequencer: Arc<Sequencer>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("linter", &self.linter)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher using the GFM renderer.
    ///
    /// Without a linter, markdown documents are rendered but never linted.
    #[must_use]
    pub fn new(config: Arc<Config>, linter: Option<Linter>, sink: Arc<dyn PreviewSink>) -> Self {
        Self {
            config,
            linter: linter.map(Arc::new),
            renderer: Arc::new(GfmRenderer),
            sink,
            sequencer: Arc::new(Sequencer::new()),
        }
    }

    /// Replaces the markdown renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The configuration events are classified against.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The active linter, if any.
    #[must_use]
    pub fn linter(&self) -> Option<&Linter> {
        self.linter.as_deref()
    }

    /// Spawns the pipeline for `event`.
    ///
    /// Returns `None` when the event is discarded: no extension, or an
    /// extension no category claims. Must be called within a tokio runtime.
    pub fn dispatch(&self, event: FileEvent) -> Option<JoinHandle<()>> {
        let Some(extension) = event.extension().filter(|ext| !ext.is_empty()) else {
            tracing::trace!(path = %event.path, "Ignoring file without extension");
            return None;
        };
        let Some(category) = classify(extension, &self.config) else {
            tracing::trace!(path = %event.path, extension, "Ignoring unclassified file");
            return None;
        };

        let generation = self.sequencer.bump(&event.path);
        tracing::debug!(
            path = %event.path,
            kind = %event.kind,
            category = %category,
            generation,
            "Dispatching file event"
        );

        let this = self.clone();
        let task = match category {
            Category::Markdown => tokio::spawn(async move {
                this.process_markdown(&event.path, generation).await;
                this.sequencer.finish(&event.path, generation);
            }),
            Category::Html => tokio::spawn(async move {
                if this.sequencer.is_current(&event.path, generation) {
                    this.sink.render(RenderPayload::Html(event.path.clone()));
                }
                this.sequencer.finish(&event.path, generation);
            }),
        };
        Some(task)
    }

    async fn process_markdown(&self, path: &Utf8Path, generation: u64) {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "Failed to read document");
                return;
            }
        };

        self.sink.add_recent_document(path);
        let file_name = path.file_name().unwrap_or(path.as_str());

        let lint = async {
            let Some(linter) = self.linter.as_deref() else {
                return;
            };
            let Some(result) = linter.lint(file_name, &text).await else {
                return;
            };
            if self.sequencer.is_current(path, generation) {
                self.sink.lint_result(file_name, result);
            } else {
                tracing::debug!(path = %path, generation, "Dropping stale lint result");
            }
        };

        let render = async {
            let html = self.renderer.to_html(&text);
            let html = emoji::replace_all(&html).into_owned();
            if self.sequencer.is_current(path, generation) {
                self.sink.render(RenderPayload::Markdown(html));
            } else {
                tracing::debug!(path = %path, generation, "Dropping stale render");
            }
        };

        tokio::join!(lint, render);
    }
}
