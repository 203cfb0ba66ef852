//! Hot reloading of a content pack.
//!
//! [`HotReloadManager::start_watching`] watches every content type
//! directory. Changes are debounced per file, unchanged contents (same md5)
//! are ignored, and each settled change reloads the owning content type,
//! validates the changed file, and notifies registered callbacks. Full
//! validation rebuilds the cross-reference database and publishes it
//! atomically.

mod debounce;
mod event;
mod watcher;

use std::collections::BTreeMap;
use std::error::Error;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

use duat_schema::ContentType;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub use debounce::{Debouncer, Observation};
pub use event::{ChangeKind, ContentHash, FileChangeEvent, hash_file};

use self::watcher::WatchSession;
use crate::config::ContentConfig;
use crate::loader::{DataLoadError, discover_content_files};
use crate::report::ValidationReport;
use crate::store::ContentStore;
use crate::validator::{ContentBundle, ContentValidator, load_issue};
use crate::xref::{CrossReferenceValidator, ReferenceStatistics, panic_message};

// ===========================================================================
// Errors and public types
// ===========================================================================

/// Failures while processing a change. None of these stop the watcher.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("cannot determine content type for {path}")]
    UnknownContentType { path: PathBuf },

    #[error("file watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error(transparent)]
    Load(#[from] DataLoadError),

    #[error("failed to spawn watch thread: {0}")]
    Thread(#[source] io::Error),

    #[error("reload callback '{name}' failed: {message}")]
    Callback { name: String, message: String },
}

/// Error type reload callbacks return.
pub type CallbackError = Box<dyn Error + Send + Sync>;

/// A consumer notified after every reload.
pub type ReloadCallback =
    Arc<dyn Fn(ContentType, &Path, &FileChangeEvent) -> Result<(), CallbackError> + Send + Sync>;

/// Result of processing one change.
#[derive(Debug)]
pub struct ReloadOutcome {
    pub content_type: ContentType,
    /// Validation of the changed file; `None` for deletions or when
    /// validation is disabled.
    pub report: Option<ValidationReport>,
    pub callback_errors: Vec<ReloadError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub is_valid: bool,
    pub errors: usize,
    pub warnings: usize,
    pub total_issues: usize,
}

impl From<&ValidationReport> for ValidationSummary {
    fn from(report: &ValidationReport) -> Self {
        Self {
            is_valid: report.is_valid(),
            errors: report.errors.len(),
            warnings: report.warnings.len(),
            total_issues: report.total_issues(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReloadStatistics {
    pub total_reloads: u64,
    pub total_reload_time: Duration,
    pub average_reload_time: Duration,
    pub watched_files_count: usize,
    pub is_watching: bool,
    pub validation_enabled: bool,
    pub last_validation: Option<ValidationSummary>,
}

// ===========================================================================
// Shared state
// ===========================================================================

#[derive(Debug, Default)]
struct ReloadCounters {
    total_reloads: u64,
    total_reload_time: Duration,
}

/// State shared by the manager and its watch threads.
pub(crate) struct ReloadShared {
    store: Arc<ContentStore>,
    validator: ContentValidator,
    xref: CrossReferenceValidator,
    callbacks: RwLock<Vec<(String, ReloadCallback)>>,
    counters: Mutex<ReloadCounters>,
    validation_enabled: AtomicBool,
    /// Latest full validation report with the database generation it checked.
    last_report: RwLock<Option<(u64, Arc<ValidationReport>)>>,
    /// Watched files with their last seen modification time.
    watched: Mutex<BTreeMap<PathBuf, Option<SystemTime>>>,
    debouncer: Mutex<Debouncer>,
    full_validation_interval: Option<u32>,
}

impl ReloadShared {
    fn validation_enabled(&self) -> bool {
        self.validation_enabled.load(Ordering::Acquire)
    }

    /// Record every content file under `dirs` as watched and remember its
    /// hash, so re-saving identical contents never triggers a reload.
    fn scan(&self, dirs: &[PathBuf]) {
        let mut found = Vec::new();
        for dir in dirs {
            match discover_content_files(dir) {
                Ok(files) => found.extend(files),
                Err(e) => warn!(dir = %dir.display(), error = %e, "cannot scan content directory"),
            }
        }
        let hashes: Vec<(PathBuf, Option<ContentHash>)> = found
            .iter()
            .map(|path| (path.clone(), hash_file(path).ok()))
            .collect();

        {
            let mut watched = self.watched.lock();
            for path in &found {
                watched.insert(path.clone(), modified_time(path));
            }
        }
        let mut debouncer = self.debouncer.lock();
        for (path, hash) in hashes {
            if let Some(hash) = hash {
                debouncer.seed(path, hash);
            }
        }
    }

    fn reload_file(&self, event: &FileChangeEvent) -> Result<ReloadOutcome, ReloadError> {
        let start = Instant::now();
        let content_type = self
            .store
            .content_type_of(&event.path)
            .ok_or_else(|| ReloadError::UnknownContentType {
                path: event.path.clone(),
            })?;

        if event.is_deletion() {
            self.watched.lock().remove(&event.path);
            info!(file = %event.path.display(), "content file deleted");
        } else if let Some(mtime) = modified_time(&event.path) {
            self.watched.lock().insert(event.path.clone(), Some(mtime));
        }
        if let Some(hash) = event.hash {
            self.debouncer.lock().seed(event.path.clone(), hash);
        }

        self.store.load_content_directory(content_type)?;
        let elapsed = start.elapsed();
        let total_reloads = {
            let mut counters = self.counters.lock();
            counters.total_reloads += 1;
            counters.total_reload_time += elapsed;
            counters.total_reloads
        };

        let report = (self.validation_enabled() && !event.is_deletion())
            .then(|| self.validator.validate_content_file(&event.path, content_type));
        if let Some(report) = &report {
            if report.is_valid() {
                debug!(file = %event.path.display(), warnings = report.warnings.len(), "file validation passed");
            } else {
                warn!(
                    file = %event.path.display(),
                    errors = report.errors.len(),
                    warnings = report.warnings.len(),
                    "file validation found errors"
                );
                for issue in &report.errors {
                    warn!(kind = %issue.kind.as_str(), "{}", issue.message);
                }
            }
        }

        let callback_errors = self.notify_callbacks(content_type, event);
        info!(
            content_type = %content_type,
            file = %event.path.display(),
            kind = %event.kind,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "reloaded content"
        );

        if let Some(interval) = self.full_validation_interval {
            if interval > 0 && total_reloads % u64::from(interval) == 0 && self.validation_enabled() {
                debug!(total_reloads, "running periodic full validation");
                self.full_validation();
            }
        }

        Ok(ReloadOutcome {
            content_type,
            report,
            callback_errors,
        })
    }

    /// Call every callback in registration order. A failing or panicking
    /// callback is logged and the rest still run.
    fn notify_callbacks(&self, content_type: ContentType, event: &FileChangeEvent) -> Vec<ReloadError> {
        let callbacks = self.callbacks.read().clone();
        let mut failures = Vec::new();
        for (name, callback) in callbacks {
            let result = catch_unwind(AssertUnwindSafe(|| callback(content_type, &event.path, event)));
            let message = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            error!(callback = %name, error = %message, "reload callback failed");
            failures.push(ReloadError::Callback { name, message });
        }
        failures
    }

    /// Reload everything, rebuild the cross-reference database, and store
    /// the merged report.
    fn full_validation(&self) -> Arc<ValidationReport> {
        let start = Instant::now();
        let mut report = ValidationReport::new();
        let mut bundle = ContentBundle::default();

        for (content_type, loaded) in self.store.reload_all() {
            match loaded {
                Ok(content) => report.merge(self.validator.validate_content_map(&content, &mut bundle)),
                Err(e) => {
                    warn!(content_type = %content_type, error = %e, "cannot load content type");
                    report.push(load_issue(&e));
                }
            }
        }
        match self.store.load_manifest() {
            Ok(Some(manifest)) => report.extend(self.validator.check_manifest(&manifest, &bundle)),
            Ok(None) => {}
            Err(e) => report.push(load_issue(&e)),
        }

        let db = self.xref.populate_from_bundle(bundle);
        let generation = db.generation();
        let cross = self.xref.validate_database(&db);
        report.extend(cross.errors);
        report.extend(cross.warnings);
        report.validation_time = start.elapsed();

        info!(
            generation,
            files = report.total_files,
            items = report.total_items,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            elapsed_ms = report.validation_time.as_secs_f64() * 1000.0,
            "full validation finished"
        );

        let report = Arc::new(report);
        self.store_report(generation, Arc::clone(&report));
        report
    }

    /// Keep `report` unless a report for a newer generation is already stored.
    fn store_report(&self, generation: u64, report: Arc<ValidationReport>) {
        let mut last = self.last_report.write();
        match last.as_ref() {
            Some((stored, _)) if *stored > generation => {
                debug!(generation, stored, "dropping stale validation report");
            }
            _ => *last = Some((generation, report)),
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ===========================================================================
// Manager
// ===========================================================================

/// Watches a content pack and keeps its cache and validation current.
pub struct HotReloadManager {
    shared: Arc<ReloadShared>,
    channel_capacity: usize,
    session: Option<WatchSession>,
}

impl HotReloadManager {
    pub fn new(store: Arc<ContentStore>, config: &ContentConfig) -> Self {
        let shared = ReloadShared {
            store,
            validator: ContentValidator::from_config(config),
            xref: CrossReferenceValidator::new(config.tuning.clone()),
            callbacks: RwLock::new(Vec::new()),
            counters: Mutex::new(ReloadCounters::default()),
            validation_enabled: AtomicBool::new(config.enable_validation),
            last_report: RwLock::new(None),
            watched: Mutex::new(BTreeMap::new()),
            debouncer: Mutex::new(Debouncer::new(config.debounce_duration())),
            full_validation_interval: config.full_validation_interval,
        };
        Self {
            shared: Arc::new(shared),
            channel_capacity: config.channel_capacity.max(1),
            session: None,
        }
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.shared.store
    }

    pub fn cross_references(&self) -> &CrossReferenceValidator {
        &self.shared.xref
    }

    // -----------------------------------------------------------------------
    // Watching
    // -----------------------------------------------------------------------

    /// Start watching every existing content type directory. Does nothing if
    /// already watching. Runs a full validation when validation is enabled.
    pub fn start_watching(&mut self, debounce_delay: Duration) -> Result<(), ReloadError> {
        if self.session.is_some() {
            return Ok(());
        }
        self.shared.debouncer.lock().set_delay(debounce_delay);

        let dirs: Vec<PathBuf> = ContentType::ALL
            .iter()
            .map(|ct| self.shared.store.type_dir(*ct))
            .filter(|dir| dir.is_dir())
            .collect();
        self.shared.scan(&dirs);

        let session = WatchSession::start(Arc::clone(&self.shared), &dirs, self.channel_capacity)?;
        self.session = Some(session);
        info!(
            root = %self.shared.store.root().display(),
            directories = dirs.len(),
            debounce_ms = debounce_delay.as_millis() as u64,
            validation = self.shared.validation_enabled(),
            "hot reload started"
        );

        if self.shared.validation_enabled() {
            self.shared.full_validation();
        }
        Ok(())
    }

    /// Stop watching and join the watch threads. Pending debounced changes
    /// are dropped; a reload already handed to the worker completes.
    pub fn stop_watching(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown();
            info!("hot reload stopped");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    /// Reload every content type, rebuild the cross-reference database, and
    /// run full validation.
    pub fn force_reload_all(&self) -> Arc<ValidationReport> {
        info!("force reloading all content");
        self.shared.full_validation()
    }

    /// Process one change immediately, bypassing the debounce window.
    pub fn reload_file(&self, event: &FileChangeEvent) -> Result<ReloadOutcome, ReloadError> {
        self.shared.reload_file(event)
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    /// Register `callback` under `name`, replacing any callback of that name.
    pub fn register_reload_callback<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(ContentType, &Path, &FileChangeEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let name = name.into();
        let callback: ReloadCallback = Arc::new(callback);
        let mut callbacks = self.shared.callbacks.write();
        match callbacks.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = callback,
            None => callbacks.push((name.clone(), callback)),
        }
        debug!(callback = %name, "registered reload callback");
    }

    /// Returns whether a callback was registered under `name`.
    pub fn unregister_reload_callback(&self, name: &str) -> bool {
        let mut callbacks = self.shared.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| existing != name);
        let removed = callbacks.len() < before;
        if removed {
            debug!(callback = %name, "unregistered reload callback");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn is_validation_enabled(&self) -> bool {
        self.shared.validation_enabled()
    }

    /// Turn validation on. Runs a full validation if watching.
    pub fn enable_validation(&self) {
        if !self.shared.validation_enabled.swap(true, Ordering::AcqRel) {
            info!("validation enabled");
            if self.is_watching() {
                self.shared.full_validation();
            }
        }
    }

    /// Turn validation off and forget the last report.
    pub fn disable_validation(&self) {
        if self.shared.validation_enabled.swap(false, Ordering::AcqRel) {
            *self.shared.last_report.write() = None;
            info!("validation disabled");
        }
    }

    /// Report of the most recent full validation.
    pub fn validation_report(&self) -> Option<Arc<ValidationReport>> {
        self.shared.last_report.read().as_ref().map(|(_, report)| Arc::clone(report))
    }

    pub fn reference_statistics(&self) -> ReferenceStatistics {
        self.shared.xref.get_reference_statistics()
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.shared.watched.lock().keys().cloned().collect()
    }

    pub fn is_file_watched(&self, path: &Path) -> bool {
        let watched = self.shared.watched.lock();
        watched.contains_key(path)
            || std::fs::canonicalize(path).is_ok_and(|canonical| watched.contains_key(&canonical))
    }

    pub fn get_reload_statistics(&self) -> ReloadStatistics {
        let (total_reloads, total_reload_time) = {
            let counters = self.shared.counters.lock();
            (counters.total_reloads, counters.total_reload_time)
        };
        let average_reload_time = u32::try_from(total_reloads.max(1))
            .map(|n| total_reload_time / n)
            .unwrap_or_default();
        ReloadStatistics {
            total_reloads,
            total_reload_time,
            average_reload_time,
            watched_files_count: self.shared.watched.lock().len(),
            is_watching: self.is_watching(),
            validation_enabled: self.is_validation_enabled(),
            last_validation: self
                .validation_report()
                .map(|report| ValidationSummary::from(report.as_ref())),
        }
    }
}

impl Drop for HotReloadManager {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::IssueKind;
    use crate::test_utils::{ContentPackBuilder, card_yaml, deck_yaml};
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn pack(dir: &TempDir) -> PathBuf {
        ContentPackBuilder::new(dir.path())
            .cards("starter.yaml", &[card_yaml("strike", 1), card_yaml("guard", 2)])
            .decks("decks.yaml", &[deck_yaml("starter", &["strike"; 12])])
            .write()
    }

    fn manager(root: &Path) -> HotReloadManager {
        let store = Arc::new(ContentStore::open(root).unwrap());
        HotReloadManager::new(store, &ContentConfig::new(root))
    }

    #[test_log::test]
    fn reload_file_updates_cache_and_counters() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        let path = manager.store().type_dir(ContentType::Cards).join("starter.yaml");

        fs::write(&path, [card_yaml("strike", 1), card_yaml("smite", 3)].concat()).unwrap();
        let outcome = manager
            .reload_file(&FileChangeEvent::observe(&path, ChangeKind::Modified))
            .unwrap();

        assert_eq!(outcome.content_type, ContentType::Cards);
        assert!(outcome.report.unwrap().is_valid());
        let cards = manager.store().get_content(ContentType::Cards, false).unwrap();
        assert!(cards.get("smite").is_some());
        assert!(cards.get("guard").is_none());

        let stats = manager.get_reload_statistics();
        assert_eq!(stats.total_reloads, 1);
        assert!(!stats.is_watching);
        assert!(stats.validation_enabled);
    }

    #[test_log::test]
    fn deletion_drops_items_and_skips_validation() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        let path = manager.store().type_dir(ContentType::Cards).join("starter.yaml");
        fs::remove_file(&path).unwrap();

        let outcome = manager
            .reload_file(&FileChangeEvent::observe(&path, ChangeKind::Deleted))
            .unwrap();
        assert!(outcome.report.is_none());
        assert!(manager.store().get_content(ContentType::Cards, false).unwrap().is_empty());
        assert!(!manager.is_file_watched(&path));
    }

    #[test]
    fn unknown_content_type() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        let stray = root.join("notes.yaml");
        let err = manager
            .reload_file(&FileChangeEvent::new(stray, ChangeKind::Modified))
            .unwrap_err();
        assert!(matches!(err, ReloadError::UnknownContentType { .. }));
        assert_eq!(manager.get_reload_statistics().total_reloads, 0);
    }

    #[test_log::test]
    fn callbacks_isolated_from_failures() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        let calls = Arc::new(AtomicUsize::new(0));

        manager.register_reload_callback("failing", |_, _, _| Err("boom".into()));
        manager.register_reload_callback("panicking", |_, _, _| panic!("kaboom"));
        let counter = Arc::clone(&calls);
        manager.register_reload_callback("counting", move |ct, _, event| {
            assert_eq!(ct, ContentType::Cards);
            assert_eq!(event.kind, ChangeKind::Modified);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let path = manager.store().type_dir(ContentType::Cards).join("starter.yaml");
        let outcome = manager
            .reload_file(&FileChangeEvent::observe(&path, ChangeKind::Modified))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.callback_errors.len(), 2);
        assert!(outcome.callback_errors[1].to_string().contains("kaboom"));

        assert!(manager.unregister_reload_callback("failing"));
        assert!(!manager.unregister_reload_callback("failing"));
    }

    #[test]
    fn register_replaces_same_name() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        let calls = Arc::new(AtomicUsize::new(0));
        manager.register_reload_callback("ui", |_, _, _| Err("stale".into()));
        let counter = Arc::clone(&calls);
        manager.register_reload_callback("ui", move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let path = manager.store().type_dir(ContentType::Cards).join("starter.yaml");
        let outcome = manager
            .reload_file(&FileChangeEvent::observe(&path, ChangeKind::Modified))
            .unwrap();
        assert!(outcome.callback_errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test]
    fn force_reload_all_publishes_report() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        assert!(manager.validation_report().is_none());

        let report = manager.force_reload_all();
        assert_eq!(report.total_files, 2);
        assert_eq!(report.total_items, 3);
        assert!(report.is_valid(), "{report}");
        assert!(report.count(IssueKind::SandCostGap) > 0);

        let stats = manager.get_reload_statistics();
        let summary = stats.last_validation.unwrap();
        assert!(summary.is_valid);
        assert_eq!(summary.warnings, report.warnings.len());
        assert_eq!(manager.reference_statistics().total_cards, 2);

        manager.disable_validation();
        assert!(manager.validation_report().is_none());
        assert!(!manager.get_reload_statistics().validation_enabled);
    }

    #[test]
    fn disabled_validation_skips_file_report() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);
        manager.disable_validation();
        let path = manager.store().type_dir(ContentType::Cards).join("starter.yaml");
        let outcome = manager
            .reload_file(&FileChangeEvent::observe(&path, ChangeKind::Modified))
            .unwrap();
        assert!(outcome.report.is_none());
    }

    #[test]
    fn periodic_full_validation() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let store = Arc::new(ContentStore::open(&root).unwrap());
        let config = ContentConfig {
            full_validation_interval: Some(2),
            ..ContentConfig::new(&root)
        };
        let manager = HotReloadManager::new(store, &config);
        let path = manager.store().type_dir(ContentType::Cards).join("starter.yaml");
        let event = FileChangeEvent::observe(&path, ChangeKind::Modified);

        manager.reload_file(&event).unwrap();
        assert!(manager.validation_report().is_none());
        manager.reload_file(&event).unwrap();
        assert!(manager.validation_report().is_some());
    }

    #[test]
    fn stale_full_validation_never_replaces_newer_report() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let manager = manager(&root);

        let first = manager.force_reload_all();
        let generation = manager.cross_references().database().generation();
        manager
            .shared
            .store_report(generation - 1, Arc::new(ValidationReport::new()));
        assert!(Arc::ptr_eq(&manager.validation_report().unwrap(), &first));

        let second = manager.force_reload_all();
        assert!(Arc::ptr_eq(&manager.validation_report().unwrap(), &second));
        assert!(manager.cross_references().database().generation() > generation);
    }

    #[test_log::test]
    fn start_and_stop_watching() {
        let dir = TempDir::new().unwrap();
        let root = pack(&dir);
        let mut manager = manager(&root);

        manager.start_watching(Duration::from_millis(50)).unwrap();
        assert!(manager.is_watching());
        assert_eq!(manager.watched_files().len(), 2);
        let cards = manager.store().type_dir(ContentType::Cards).join("starter.yaml");
        assert!(manager.is_file_watched(&cards));
        assert!(manager.validation_report().is_some());
        // Second start is a no-op.
        manager.start_watching(Duration::from_millis(50)).unwrap();

        manager.stop_watching();
        assert!(!manager.is_watching());
        let stats = manager.get_reload_statistics();
        assert!(!stats.is_watching);
        assert_eq!(stats.watched_files_count, 2);
    }
}
