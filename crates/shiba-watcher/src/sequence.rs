//! Per-path generations for discarding stale completions.
//!
//! Every dispatched event for a path takes a fresh generation. A render or
//! lint result is delivered only if no newer event for the same path was
//! dispatched in the meantime, so a slow read of an old version can never
//! overwrite the preview of a newer one.
//!
//! Generations come from one counter shared by all paths, so an entry can be
//! dropped once its chain finishes without a later event reusing its number.

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Generations {
    next: u64,
    latest: FxHashMap<Utf8PathBuf, u64>,
}

/// Latest generation keyed by path, for chains still in flight.
#[derive(Debug, Default)]
pub struct Sequencer {
    inner: Mutex<Generations>,
}

impl Sequencer {
    /// Creates an empty sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation for `path` and returns it.
    pub fn bump(&self, path: &Utf8Path) -> u64 {
        let mut inner = self.inner.lock();
        inner.next += 1;
        let generation = inner.next;
        inner.latest.insert(path.to_owned(), generation);
        generation
    }

    /// Returns `true` if `generation` is still the newest for `path`.
    #[must_use]
    pub fn is_current(&self, path: &Utf8Path, generation: u64) -> bool {
        self.inner.lock().latest.get(path).copied() == Some(generation)
    }

    /// Forgets `path` once the chain for `generation` is done, unless a newer
    /// event has been dispatched since.
    pub fn finish(&self, path: &Utf8Path, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.latest.get(path).copied() == Some(generation) {
            inner.latest.remove(path);
        }
    }

    /// Number of paths with a chain in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().latest.len()
    }

    /// Returns `true` if no chain is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
