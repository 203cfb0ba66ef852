//! Duat Content -- loading, validation, and hot reload for Sands of Duat
//! content packs.
//!
//! A content pack is a directory with one subdirectory per content type
//! (`cards/`, `enemies/`, `events/`, `decks/`), each holding YAML files that
//! map item ids to item fields.
//!
//! # Pipeline
//!
//! 1. **Load** -- [`store::ContentStore`] parses every file of a content type
//!    into raw items and caches the result.
//! 2. **Schema validation** -- [`validator::ContentValidator`] builds typed
//!    entities, recording every field error and per-item heuristic warning.
//! 3. **Cross-reference validation** -- [`xref::CrossReferenceValidator`]
//!    indexes all entities in a freshly built database, publishes it with an
//!    atomic swap, and checks references, keywords, and progression.
//! 4. **Hot reload** -- [`hot_reload::HotReloadManager`] watches the pack,
//!    debounces changes per file, and re-runs steps 1-3 as files change.
//!
//! Every problem ends up in a [`report::ValidationReport`]; a bad item never
//! prevents the rest of the pack from loading.
//!
//! ```rust,ignore
//! let store = Arc::new(ContentStore::open("content")?);
//! let mut manager = HotReloadManager::new(store, &ContentConfig::new("content"));
//! manager.start_watching(Duration::from_millis(500))?;
//! let report = manager.force_reload_all();
//! ```

pub mod config;
mod heuristics;
pub mod hot_reload;
pub mod loader;
pub mod report;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod validator;
pub mod xref;

pub use config::{BalanceTuning, ConfigError, ContentConfig};
pub use hot_reload::{
    ChangeKind, FileChangeEvent, HotReloadManager, ReloadError, ReloadOutcome, ReloadStatistics,
};
pub use loader::DataLoadError;
pub use report::{IssueKind, Severity, ValidationIssue, ValidationReport};
pub use store::{ContentMap, ContentStore, RawItem};
pub use validator::{ContentBundle, ContentValidator};
pub use xref::{CrossReferenceDatabase, CrossReferenceValidator, ReferenceStatistics};
