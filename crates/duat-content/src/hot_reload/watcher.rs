//! Watch threads: notify callback, debounce loop, reload worker.
//!
//! ```text
//! notify ──WatchMessage──▶ debounce thread ──FileChangeEvent──▶ reload worker
//! ```
//! Both channels are bounded. Dropping the session stops the notify
//! watcher, sends `Shutdown`, and joins both threads; reloads already
//! queued for the worker still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, warn};

use super::debounce::Observation;
use super::event::{ChangeKind, FileChangeEvent};
use super::{ReloadError, ReloadShared};
use crate::loader::is_content_file;
use crate::xref::panic_message;

pub(crate) enum WatchMessage {
    Change(FileChangeEvent),
    Shutdown,
}

/// Content-file changes described by one notify event.
pub(crate) fn classify(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let all = |kind: ChangeKind| event.paths.iter().map(|p| (p.clone(), kind)).collect::<Vec<_>>();
    let changes = match &event.kind {
        EventKind::Create(_) => all(ChangeKind::Created),
        EventKind::Remove(_) => all(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = if i == 0 {
                    ChangeKind::Deleted
                } else {
                    ChangeKind::Created
                };
                (p.clone(), kind)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Modified
                } else {
                    ChangeKind::Deleted
                };
                (p.clone(), kind)
            })
            .collect(),
        EventKind::Modify(_) => all(ChangeKind::Modified),
        EventKind::Any | EventKind::Access(_) | EventKind::Other => Vec::new(),
    };
    changes
        .into_iter()
        .filter(|(path, _)| is_content_file(path))
        .collect()
}

/// A running watch: the notify watcher and the two worker threads.
pub(crate) struct WatchSession {
    watcher: Option<RecommendedWatcher>,
    raw_tx: Sender<WatchMessage>,
    threads: Vec<JoinHandle<()>>,
}

impl WatchSession {
    pub(crate) fn start(
        shared: Arc<ReloadShared>,
        dirs: &[PathBuf],
        capacity: usize,
    ) -> Result<Self, ReloadError> {
        let (raw_tx, raw_rx) = bounded(capacity);
        let (reload_tx, reload_rx) = bounded(capacity);
        let mut session = Self {
            watcher: None,
            raw_tx: raw_tx.clone(),
            threads: Vec::with_capacity(2),
        };

        let worker_shared = Arc::clone(&shared);
        session.threads.push(
            thread::Builder::new()
                .name("duat-reload".to_string())
                .spawn(move || run_worker(&worker_shared, reload_rx))
                .map_err(ReloadError::Thread)?,
        );
        session.threads.push(
            thread::Builder::new()
                .name("duat-debounce".to_string())
                .spawn(move || run_debounce(&shared, raw_rx, reload_tx))
                .map_err(ReloadError::Thread)?,
        );

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => forward(&raw_tx, &event),
                Err(e) => warn!(error = %e, "file watcher error"),
            }
        })?;
        for dir in dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            debug!(dir = %dir.display(), "watching content directory");
        }
        session.watcher = Some(watcher);
        Ok(session)
    }

    pub(crate) fn shutdown(&mut self) {
        if self.watcher.take().is_none() && self.threads.is_empty() {
            return;
        }
        if self.raw_tx.send(WatchMessage::Shutdown).is_err() {
            debug!("debounce thread already gone");
        }
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                error!("watch thread panicked");
            }
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs on the notify thread: classify, hash, enqueue.
fn forward(raw_tx: &Sender<WatchMessage>, event: &Event) {
    let observed = catch_unwind(AssertUnwindSafe(|| {
        classify(event)
            .into_iter()
            .map(|(path, kind)| FileChangeEvent::observe(path, kind))
            .collect::<Vec<_>>()
    }));
    match observed {
        Ok(changes) => {
            for change in changes {
                debug!(file = %change.path.display(), kind = %change.kind, "file change received");
                if raw_tx.send(WatchMessage::Change(change)).is_err() {
                    return;
                }
            }
        }
        Err(payload) => {
            error!(detail = %panic_message(payload.as_ref()), "file event handler panicked");
        }
    }
}

fn run_debounce(
    shared: &ReloadShared,
    raw_rx: Receiver<WatchMessage>,
    reload_tx: Sender<FileChangeEvent>,
) {
    loop {
        let deadline = shared.debouncer.lock().next_deadline();
        let message = match deadline {
            Some(deadline) => raw_rx.recv_deadline(deadline),
            None => raw_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match message {
            Ok(WatchMessage::Change(event)) => {
                let path = event.path.clone();
                match shared.debouncer.lock().observe(event, Instant::now()) {
                    Observation::Unchanged => {
                        debug!(file = %path.display(), "ignored change, content hash unchanged");
                    }
                    Observation::Armed => debug!(file = %path.display(), "reload scheduled"),
                    Observation::Rearmed => debug!(file = %path.display(), "reload rescheduled"),
                }
            }
            Ok(WatchMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let due = shared.debouncer.lock().drain_due(Instant::now());
        for event in due {
            if reload_tx.send(event).is_err() {
                warn!("reload worker gone, stopping debounce loop");
                return;
            }
        }
    }

    let dropped = shared.debouncer.lock().cancel_all();
    if dropped > 0 {
        debug!(dropped, "dropped pending reloads on shutdown");
    }
}

fn run_worker(shared: &ReloadShared, reload_rx: Receiver<FileChangeEvent>) {
    for event in reload_rx {
        match catch_unwind(AssertUnwindSafe(|| shared.reload_file(&event))) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(file = %event.path.display(), error = %e, "reload failed"),
            Err(payload) => error!(
                file = %event.path.display(),
                detail = %panic_message(payload.as_ref()),
                "reload panicked"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::path::Path;

    fn kinds(event: Event) -> Vec<ChangeKind> {
        classify(&event).into_iter().map(|(_, k)| k).collect()
    }

    #[test]
    fn create_modify_remove() {
        let path = Path::new("/pack/cards/starter.yaml");
        assert_eq!(
            kinds(Event::new(EventKind::Create(CreateKind::File)).add_path(path.into())),
            [ChangeKind::Created]
        );
        assert_eq!(
            kinds(
                Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                    .add_path(path.into())
            ),
            [ChangeKind::Modified]
        );
        assert_eq!(
            kinds(
                Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)))
                    .add_path(path.into())
            ),
            [ChangeKind::Modified]
        );
        assert_eq!(
            kinds(Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.into())),
            [ChangeKind::Deleted]
        );
    }

    #[test]
    fn renames() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/pack/cards/old.yaml".into())
            .add_path("/pack/cards/new.yml".into());
        let changes = classify(&event);
        assert_eq!(
            changes,
            [
                (PathBuf::from("/pack/cards/old.yaml"), ChangeKind::Deleted),
                (PathBuf::from("/pack/cards/new.yml"), ChangeKind::Created),
            ]
        );
        assert_eq!(
            kinds(
                Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
                    .add_path("/pack/cards/a.yaml".into())
            ),
            [ChangeKind::Deleted]
        );
    }

    #[test]
    fn ignores_non_content_files_and_access() {
        let swap = Event::new(EventKind::Create(CreateKind::File)).add_path("/pack/cards/.a.yaml.swp".into());
        assert!(classify(&swap).is_empty());
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path("/pack/cards/a.yaml".into());
        assert!(classify(&access).is_empty());
    }
}
