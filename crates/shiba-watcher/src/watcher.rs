//! The watcher state machine.
//!
//! ```text
//!            start(path) ok
//!   Idle ─────────────────────► Watching
//!    ▲  ▲                          │ │
//!    │  └── stop() / Drop ─────────┘ │ change_watching_dir(new)
//!    │                               ▼
//!    └──── open failed ◄──── stop, then start(new)
//! ```
//!
//! A [`Watcher`] owns at most one [`WatchHandle`], held by a pump task that
//! forwards its events to the [`Dispatcher`]. Rebinding always stops the
//! pump and waits for the handle to be released before opening the next
//! one, so two handles never overlap.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use shiba_core::Config;
use shiba_lint::Linter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::WatchError;
use crate::events::FileEvent;
use crate::filter::{CompositeFilter, GlobFilter, HiddenFilter};
use crate::handle::WatchHandle;
use crate::pipeline::{Dispatcher, PreviewSink};

/// Whether a watch handle is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchState {
    /// No handle open.
    #[default]
    Idle,
    /// A handle is open on the current target.
    Watching,
}

/// The running pump task and its stop signal.
struct Pump {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Watches one file or directory and feeds changes to a [`PreviewSink`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use shiba_core::ConfigStore;
/// use shiba_lint::LintResult;
/// use shiba_watcher::{PreviewSink, RenderPayload, Watcher};
///
/// struct Stdout;
///
/// impl PreviewSink for Stdout {
///     fn render(&self, payload: RenderPayload) {
///         println!("{}: {} bytes", payload.category(), payload.content().len());
///     }
///
///     fn lint_result(&self, file_name: &str, result: LintResult) {
///         println!("{file_name}: {} diagnostics", result.diagnostics.len());
///     }
/// }
///
/// # async fn example() -> Result<(), shiba_watcher::WatchError> {
/// let config = ConfigStore::user_default().load();
/// let mut watcher = Watcher::from_config("notes", config, Arc::new(Stdout))?;
/// watcher.start("notes").await;
/// watcher.change_watching_dir("drafts/today.md").await;
/// watcher.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Watcher {
    dispatcher: Dispatcher,
    target: Utf8PathBuf,
    state: WatchState,
    pump: Option<Pump>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates an idle watcher for `path`. Call [`Watcher::start`] to begin.
    #[must_use]
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        config: Arc<Config>,
        linter: Option<Linter>,
        sink: Arc<dyn PreviewSink>,
    ) -> Self {
        Self::with_dispatcher(path, Dispatcher::new(config, linter, sink))
    }

    /// Creates an idle watcher around a prepared dispatcher.
    #[must_use]
    pub fn with_dispatcher(path: impl Into<Utf8PathBuf>, dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            target: path.into(),
            state: WatchState::Idle,
            pump: None,
        }
    }

    /// Creates an idle watcher with the linter named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Lint`] if the configured backend is unknown or
    /// rejects its options. Nothing is watched in that case.
    pub fn from_config(
        path: impl Into<Utf8PathBuf>,
        config: Arc<Config>,
        sink: Arc<dyn PreviewSink>,
    ) -> Result<Self, WatchError> {
        let linter = Linter::from_config(&config)?;
        Ok(Self::new(path, config, linter, sink))
    }

    /// Creates a watcher and starts watching `path` right away.
    pub async fn spawn(
        path: impl Into<Utf8PathBuf>,
        config: Arc<Config>,
        linter: Option<Linter>,
        sink: Arc<dyn PreviewSink>,
    ) -> Self {
        let path = path.into();
        let mut watcher = Self::new(path.clone(), config, linter, sink);
        watcher.start(path).await;
        watcher
    }

    /// Watches `path`, releasing any previous handle first.
    ///
    /// A file target is rendered once right away. Failures are logged and
    /// leave the watcher [`WatchState::Idle`].
    pub async fn start(&mut self, path: impl Into<Utf8PathBuf>) {
        self.stop().await;
        self.target = path.into();

        match self.open().await {
            Ok(()) => info!(path = %self.target, "Watching"),
            Err(error) => match error.path() {
                Some(path) => warn!(path = %path, error = %error, "Watch target unavailable"),
                None => error!(path = %self.target, error = %error, "Failed to start watching"),
            },
        }
    }

    /// Switches to `new_path` unless it already is the target.
    pub async fn change_watching_dir(&mut self, new_path: impl Into<Utf8PathBuf>) {
        let new_path = new_path.into();
        if new_path == self.target {
            debug!(path = %new_path, "Watch target unchanged");
            return;
        }
        info!(from = %self.target, to = %new_path, "Changing watch target");
        self.start(new_path).await;
    }

    /// Releases the handle and waits until it is gone. Idempotent.
    ///
    /// Pipeline tasks already spawned still complete.
    pub async fn stop(&mut self) {
        if let Some(Pump { token, task }) = self.pump.take() {
            token.cancel();
            if let Err(error) = task.await {
                warn!(error = %error, "Watch pump task failed");
            }
            info!(path = %self.target, "Stopped watching");
        }
        self.state = WatchState::Idle;
    }

    /// Documentation URL of the active lint rules, if linting is on.
    #[must_use]
    pub fn lint_rule_url(&self) -> Option<&str> {
        self.dispatcher.linter().map(Linter::lint_rule_url)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Current target, as given.
    #[must_use]
    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    async fn open(&mut self) -> Result<(), WatchError> {
        if !self.target.exists() {
            return Err(WatchError::path_not_found(&self.target));
        }
        let root = self.target.canonicalize_utf8()?;

        // A file is watched through its directory so that editors replacing
        // the file on save keep producing events.
        let is_file = root.is_file();
        let watch_path = if is_file {
            root.parent().map_or_else(|| root.clone(), Utf8Path::to_path_buf)
        } else {
            root.clone()
        };
        let recursive = watch_path == root;

        let filter = CompositeFilter::new()
            .and(GlobFilter::new(
                &root,
                self.dispatcher.config().all_extensions(),
            )?)
            .and(HiddenFilter::new(&root));
        let handle = WatchHandle::open(&watch_path, recursive, filter).await?;

        // Registered first, so an edit racing the initial read still arrives.
        if is_file {
            self.dispatcher.dispatch(FileEvent::changed(root));
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(pump(handle, self.dispatcher.clone(), token.clone()));
        self.pump = Some(Pump { token, task });
        self.state = WatchState::Watching;
        Ok(())
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        // The pump shuts its handle down on its own once cancelled.
        if let Some(pump) = &self.pump {
            pump.token.cancel();
        }
    }
}

/// Forwards handle events to the dispatcher until cancelled.
async fn pump(mut handle: WatchHandle, dispatcher: Dispatcher, token: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            event = handle.recv() => match event {
                Some(event) => {
                    dispatcher.dispatch(event);
                }
                None => {
                    warn!(path = %handle.target(), "Watch handle closed unexpectedly");
                    break;
                }
            },
        }
    }

    if let Err(error) = handle.shutdown().await {
        warn!(error = %error, "Error releasing watch handle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RenderPayload;
    use crate::pipeline::tests::{Delivery, drain, recording_sink};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(dir.path())
            .expect("Invalid path")
            .canonicalize_utf8()
            .expect("canonical temp dir")
    }

    async fn next(rx: &mut UnboundedReceiver<Delivery>) -> Option<Delivery> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    async fn quiet_for(rx: &mut UnboundedReceiver<Delivery>, millis: u64) -> bool {
        tokio::time::timeout(Duration::from_millis(millis), rx.recv())
            .await
            .is_err()
    }

    fn default_linter() -> Option<Linter> {
        Some(Linter::new("mdast-lint", None).expect("builtin"))
    }

    #[tokio::test]
    async fn test_new_is_idle() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let (sink, mut rx) = recording_sink();
        let watcher = Watcher::new(utf8(&temp_dir), Arc::default(), default_linter(), sink);

        assert_eq!(watcher.state(), WatchState::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_start_missing_path_stays_idle() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = utf8(&temp_dir).join("missing");
        let (sink, mut rx) = recording_sink();
        let watcher = Watcher::spawn(&missing, Arc::default(), default_linter(), sink).await;

        assert_eq!(watcher.state(), WatchState::Idle);
        assert_eq!(watcher.target(), missing);
        assert!(quiet_for(&mut rx, 100).await);
    }

    #[tokio::test]
    async fn test_start_on_file_renders_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = utf8(&temp_dir).join("note.md");
        fs::write(&file, "# Hi :smile:\n").expect("Failed to write file");

        let (sink, mut rx) = recording_sink();
        let mut watcher = Watcher::spawn(&file, Arc::default(), default_linter(), sink).await;
        assert_eq!(watcher.state(), WatchState::Watching);

        let mut deliveries = Vec::new();
        for _ in 0..3 {
            deliveries.push(next(&mut rx).await.expect("bootstrap delivery"));
        }
        assert!(deliveries.contains(&Delivery::Recent(file.clone())));
        assert!(deliveries.iter().any(|d| matches!(
            d,
            Delivery::Render(RenderPayload::Markdown(html)) if html.contains("\u{1f604}")
        )));
        assert!(deliveries
            .iter()
            .any(|d| matches!(d, Delivery::Lint(name, _) if name == "note.md")));

        // Nothing else fires until the file changes.
        assert!(quiet_for(&mut rx, 300).await);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_start_on_directory_has_no_bootstrap() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(utf8(&temp_dir).join("old.md"), "# old\n").expect("Failed to write file");

        let (sink, mut rx) = recording_sink();
        let mut watcher =
            Watcher::spawn(utf8(&temp_dir), Arc::default(), default_linter(), sink).await;

        assert_eq!(watcher.state(), WatchState::Watching);
        assert!(quiet_for(&mut rx, 300).await);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_change_watching_dir_same_target_is_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = utf8(&temp_dir).join("note.md");
        fs::write(&file, "# Note\n").expect("Failed to write file");

        let (sink, mut rx) = recording_sink();
        let mut watcher = Watcher::spawn(&file, Arc::default(), None, sink).await;
        for _ in 0..2 {
            next(&mut rx).await.expect("bootstrap delivery");
        }

        watcher.change_watching_dir(&file).await;
        assert_eq!(watcher.state(), WatchState::Watching);
        assert!(quiet_for(&mut rx, 300).await);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_change_watching_dir_releases_old_target() {
        let old_dir = TempDir::new().expect("Failed to create temp directory");
        let new_dir = TempDir::new().expect("Failed to create temp directory");
        let (sink, mut rx) = recording_sink();
        let mut watcher =
            Watcher::spawn(utf8(&old_dir), Arc::default(), default_linter(), sink).await;

        watcher.change_watching_dir(utf8(&new_dir)).await;
        assert_eq!(watcher.state(), WatchState::Watching);
        assert_eq!(watcher.target(), utf8(&new_dir));

        fs::write(utf8(&old_dir).join("stale.md"), "# old\n").expect("Failed to write file");
        assert!(quiet_for(&mut rx, 500).await, "old target must be released");

        let fresh = utf8(&new_dir).join("fresh.md");
        fs::write(&fresh, "# new :tada:\n").expect("Failed to write file");
        let rendered = tokio::time::timeout(Duration::from_secs(5), async {
            let mut recent = false;
            while let Some(delivery) = rx.recv().await {
                match delivery {
                    Delivery::Recent(path) if path == fresh => recent = true,
                    Delivery::Render(RenderPayload::Markdown(html)) if recent => return html,
                    _ => {}
                }
            }
            String::new()
        })
        .await
        .expect("new target delivers a render");
        assert!(rendered.contains("\u{1f389}"));

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_new_target_skips_hidden_and_unclassified() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = utf8(&temp_dir);
        fs::create_dir(root.join(".git")).expect("Failed to create directory");
        let (sink, mut rx) = recording_sink();
        let mut watcher = Watcher::spawn(&root, Arc::default(), None, sink).await;

        fs::write(root.join(".hidden.md"), "# hidden\n").expect("Failed to write file");
        fs::write(root.join(".git").join("x.md"), "# git\n").expect("Failed to write file");
        fs::write(root.join("pic.png"), "png").expect("Failed to write file");
        assert!(quiet_for(&mut rx, 500).await);

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_file_edit_after_start_is_delivered() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = utf8(&temp_dir).join("note.md");
        fs::write(&file, "# first\n").expect("Failed to write file");

        let (sink, mut rx) = recording_sink();
        let mut watcher = Watcher::spawn(&file, Arc::default(), None, sink).await;
        // The handle is live by the time start returns.
        fs::write(&file, "# second\n").expect("Failed to write file");

        let second = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(delivery) = rx.recv().await {
                if matches!(
                    &delivery,
                    Delivery::Render(RenderPayload::Markdown(html)) if html.contains("second")
                ) {
                    return true;
                }
            }
            false
        })
        .await
        .expect("edit after start is rendered");
        assert!(second);

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let (sink, _rx) = recording_sink();
        let mut watcher = Watcher::spawn(utf8(&temp_dir), Arc::default(), None, sink).await;

        watcher.stop().await;
        assert_eq!(watcher.state(), WatchState::Idle);
        watcher.stop().await;
        assert_eq!(watcher.state(), WatchState::Idle);

        // The same target can be watched again.
        watcher.start(utf8(&temp_dir)).await;
        assert_eq!(watcher.state(), WatchState::Watching);
    }

    #[tokio::test]
    async fn test_from_config_unknown_backend() {
        let config = Arc::new(Config {
            linter: "textlint".to_owned(),
            ..Config::default()
        });
        let (sink, _rx) = recording_sink();

        match Watcher::from_config("notes", config, sink) {
            Err(WatchError::Lint(_)) => {}
            other => panic!("Expected a lint error, got {other:?}"),
        }
    }

    #[test]
    fn test_lint_rule_url() {
        let (sink, _rx) = recording_sink();
        let watcher =
            Watcher::from_config("notes", Arc::default(), Arc::clone(&sink)).expect("defaults");
        assert_eq!(
            watcher.lint_rule_url(),
            Some("https://github.com/remarkjs/remark-lint#rules")
        );

        let disabled = Arc::new(Config {
            linter: "none".to_owned(),
            ..Config::default()
        });
        let watcher = Watcher::from_config("notes", disabled, sink).expect("linting off");
        assert_eq!(watcher.lint_rule_url(), None);
    }
}
