//! Per-path debounce state.
//!
//! The clock is passed in, so the state machine runs the same under a real
//! watcher and under tests with synthetic instants.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::event::{ContentHash, FileChangeEvent};

/// What [`Debouncer::observe`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Same content hash as last recorded; dropped.
    Unchanged,
    /// The path was idle and now has a pending reload.
    Armed,
    /// The path already had a pending reload; its window restarted.
    Rearmed,
}

#[derive(Debug)]
struct Pending {
    event: FileChangeEvent,
    due: Instant,
}

/// Pending reloads and last known content hashes, keyed by path.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    hashes: HashMap<PathBuf, ContentHash>,
    pending: HashMap<PathBuf, Pending>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            hashes: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Record `hash` as the known contents of `path` without scheduling
    /// anything.
    pub fn seed(&mut self, path: impl Into<PathBuf>, hash: ContentHash) {
        self.hashes.insert(path.into(), hash);
    }

    pub fn last_hash(&self, path: &Path) -> Option<ContentHash> {
        self.hashes.get(path).copied()
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Feed one event observed at `now`.
    pub fn observe(&mut self, event: FileChangeEvent, now: Instant) -> Observation {
        match event.hash {
            Some(hash) if !event.is_deletion() => {
                if self.hashes.get(&event.path) == Some(&hash) {
                    return Observation::Unchanged;
                }
                self.hashes.insert(event.path.clone(), hash);
            }
            _ => {
                self.hashes.remove(&event.path);
            }
        }

        let due = now + self.delay;
        match self.pending.insert(event.path.clone(), Pending { event, due }) {
            Some(_) => Observation::Rearmed,
            None => Observation::Armed,
        }
    }

    /// Remove and return every pending event whose window has closed, oldest
    /// deadline first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<FileChangeEvent> {
        let due_paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(path, _)| path.clone())
            .collect();
        let mut due: Vec<Pending> = due_paths
            .iter()
            .filter_map(|path| self.pending.remove(path))
            .collect();
        due.sort_by_key(|p| p.due);
        due.into_iter().map(|p| p.event).collect()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Drop every pending reload. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
