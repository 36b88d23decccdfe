//! The watch handle: one open notify watcher streaming into async code.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── spawn_blocking ─────────────────────────┐
//! │  RecommendedWatcher ──► from_notify ──► FileFilter ──► tx        │
//! │  (lives here until the shutdown signal, then dropped)      │     │
//! └────────────────────────────────────────────────────────────│─────┘
//!                                               blocking_send │
//!                                                             ▼
//! ┌──────────────────────────── tokio ──────────────────────────────┐
//! │  WatchHandle::recv ◄── mpsc::Receiver<FileEvent>                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening waits for the blocking task to report whether notify accepted
//! the path, so a failed open never leaves a half-started handle behind.
//! [`WatchHandle::shutdown`] returns only after the notify watcher has been
//! dropped.

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecursiveMode, Watcher as _};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::WatchError;
use crate::events::{FileEvent, from_notify};
use crate::filter::FileFilter;

/// Default channel capacity for file events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// An open watch on one path.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use shiba_watcher::{AcceptAllFilter, WatchHandle};
///
/// # async fn example() -> Result<(), shiba_watcher::WatchError> {
/// let mut handle = WatchHandle::open(Utf8Path::new("./docs"), true, AcceptAllFilter).await?;
/// if let Some(event) = handle.recv().await {
///     println!("{} {}", event.kind, event.path);
/// }
/// handle.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct WatchHandle {
    /// Signals the blocking task to drop the notify watcher.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// The blocking task owning the notify watcher.
    task_handle: Option<JoinHandle<()>>,

    event_rx: mpsc::Receiver<FileEvent>,

    /// Canonical path being watched.
    target: Utf8PathBuf,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("target", &self.target)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl WatchHandle {
    /// Starts watching `path`, forwarding events accepted by `filter`.
    ///
    /// No events are produced for files that already exist.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist and
    /// [`WatchError::Notify`] if notify refuses it.
    pub async fn open<F: FileFilter>(
        path: &Utf8Path,
        recursive: bool,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(path, recursive, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Like [`WatchHandle::open`] with a custom channel capacity.
    pub async fn with_capacity<F: FileFilter>(
        path: &Utf8Path,
        recursive: bool,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }
        let target = path.canonicalize_utf8()?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        let task_path = target.clone();
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watch_loop(&task_path, mode, event_tx, ready_tx, shutdown_rx, filter);
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                shutdown_tx: Some(shutdown_tx),
                task_handle: Some(task_handle),
                event_rx,
                target,
            }),
            Ok(Err(error)) => {
                // The task already returned; reap it.
                let _ = task_handle.await;
                Err(error)
            }
            Err(_) => Err(WatchError::ChannelClosed),
        }
    }

    /// Receives the next event. `None` once the handle is shut down.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }

    /// Receives an event without waiting.
    pub fn try_recv(&mut self) -> Result<FileEvent, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    /// Returns `true` while the notify watcher is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Releases the watch and waits until notify has let go of the path.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the watcher task panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        // Unblock a notify thread stuck on a full channel.
        self.event_rx.close();

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|_| WatchError::ChannelClosed)?;
        }

        Ok(())
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        // Drop is sync: signal only, the task finishes on its own.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Owns the notify watcher for the lifetime of the handle.
fn run_watch_loop<F: FileFilter>(
    path: &Utf8Path,
    mode: RecursiveMode,
    event_tx: mpsc::Sender<FileEvent>,
    ready_tx: oneshot::Sender<Result<(), WatchError>>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) {
    let handler = move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            for file_event in from_notify(event) {
                if !filter.should_process(&file_event.path) {
                    tracing::trace!(path = %file_event.path, "Filtered out file event");
                    continue;
                }
                if event_tx.blocking_send(file_event).is_err() {
                    tracing::debug!("Event channel closed, dropping file event");
                    break;
                }
            }
        }
        Err(error) => tracing::warn!(error = %error, "Notify error"),
    };

    let started = notify::recommended_watcher(handler).and_then(|mut watcher| {
        watcher.watch(path.as_std_path(), mode)?;
        Ok(watcher)
    });

    let watcher = match started {
        Ok(watcher) => watcher,
        Err(error) => {
            let _ = ready_tx.send(Err(error.into()));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));
    tracing::info!(
        path = %path,
        recursive = matches!(mode, RecursiveMode::Recursive),
        "Watch handle opened"
    );

    let _ = shutdown_rx.blocking_recv();

    drop(watcher);
    tracing::info!(path = %path, "Watch handle released");
}
