//! The content cache: last parsed raw items per content type.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use duat_schema::{ContentManifest, ContentType};
use parking_lot::RwLock;
use serde_yaml_ng::Value;
use tracing::{debug, warn};

use crate::loader::{DataLoadError, discover_content_files, find_content_file, read_content_file, read_yaml};

/// File name (without extension) of the optional pack manifest.
pub const MANIFEST_NAME: &str = "manifest";

/// An unvalidated item as it appeared in its file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    /// Top-level key in the file; the provisional id.
    pub id: String,
    pub source: PathBuf,
    pub fields: Value,
}

/// Everything loaded from one content type directory.
#[derive(Debug)]
pub struct ContentMap {
    pub content_type: ContentType,
    pub items: BTreeMap<String, RawItem>,
    /// Files that were read, in load order.
    pub files: Vec<PathBuf>,
    /// Per-file failures. A failing file contributes no items; the rest of
    /// the directory still loads.
    pub errors: Vec<DataLoadError>,
}

impl ContentMap {
    fn empty(content_type: ContentType) -> Self {
        Self {
            content_type,
            items: BTreeMap::new(),
            files: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RawItem> {
        self.items.get(id)
    }

    /// Items that came from `file`.
    pub fn items_from<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a RawItem> + 'a {
        self.items.values().filter(move |item| item.source == file)
    }
}

/// Owns the content root and the per-type cache of parsed files.
///
/// Each reload parses a directory off to the side and then replaces the
/// cached map in one step, so readers holding the previous `Arc` keep a
/// complete view.
#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
    cache: RwLock<HashMap<ContentType, Arc<ContentMap>>>,
}

impl ContentStore {
    /// Create a store over `root`. The path is canonicalized when it exists
    /// so it can be compared with paths reported by the file watcher.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Like [`new`](Self::new), but the root must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DataLoadError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DataLoadError::MissingRoot { root });
        }
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding files of `content_type`.
    pub fn type_dir(&self, content_type: ContentType) -> PathBuf {
        self.root.join(content_type.dir_name())
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Parse every file of `content_type` from disk and replace the cache.
    pub fn load_content_directory(
        &self,
        content_type: ContentType,
    ) -> Result<Arc<ContentMap>, DataLoadError> {
        let dir = self.type_dir(content_type);
        let mut map = ContentMap::empty(content_type);

        for path in discover_content_files(&dir)? {
            match read_content_file(&path) {
                Ok(file) => {
                    for (id, fields) in file.entries {
                        if let Some(existing) = map.items.get(&id) {
                            map.errors.push(DataLoadError::DuplicateId {
                                file: path.clone(),
                                id,
                                first: existing.source.clone(),
                            });
                            continue;
                        }
                        let item = RawItem {
                            id: id.clone(),
                            source: path.clone(),
                            fields,
                        };
                        map.items.insert(id, item);
                    }
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable content file");
                    map.errors.push(e);
                }
            }
            map.files.push(path);
        }

        debug!(
            content_type = %content_type,
            items = map.items.len(),
            files = map.files.len(),
            errors = map.errors.len(),
            "loaded content directory"
        );

        let map = Arc::new(map);
        self.cache.write().insert(content_type, Arc::clone(&map));
        Ok(map)
    }

    /// The cached map for `content_type`, loading it on first use or when
    /// `reload` is set.
    pub fn get_content(
        &self,
        content_type: ContentType,
        reload: bool,
    ) -> Result<Arc<ContentMap>, DataLoadError> {
        if !reload {
            if let Some(map) = self.cache.read().get(&content_type) {
                return Ok(Arc::clone(map));
            }
        }
        self.load_content_directory(content_type)
    }

    pub fn get_content_item(
        &self,
        content_type: ContentType,
        id: &str,
    ) -> Result<Option<RawItem>, DataLoadError> {
        Ok(self.get_content(content_type, false)?.get(id).cloned())
    }

    /// Reload every content type from disk.
    pub fn reload_all(&self) -> Vec<(ContentType, Result<Arc<ContentMap>, DataLoadError>)> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            ContentType::ALL
                .par_iter()
                .map(|ct| (*ct, self.load_content_directory(*ct)))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            ContentType::ALL
                .iter()
                .map(|ct| (*ct, self.load_content_directory(*ct)))
                .collect()
        }
    }

    /// Drop all cached maps.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Content types currently cached.
    pub fn cached_types(&self) -> Vec<ContentType> {
        let cache = self.cache.read();
        let mut types: Vec<_> = cache.keys().copied().collect();
        types.sort();
        types
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    /// The content type owning `path`, i.e. `path` lies in
    /// `root/<type>/`. Works for files that no longer exist.
    pub fn content_type_of(&self, path: &Path) -> Option<ContentType> {
        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                let parent = std::fs::canonicalize(path.parent()?).ok()?;
                parent.join(path.file_name()?).strip_prefix(&self.root).ok()?.to_path_buf()
            }
        };
        let mut components = relative.components();
        let dir = components.next()?.as_os_str().to_str()?;
        components.next()?;
        dir.parse().ok()
    }

    // -----------------------------------------------------------------------
    // Manifest
    // -----------------------------------------------------------------------

    /// Load `manifest.{yaml,yml}` from the root, if present.
    pub fn load_manifest(&self) -> Result<Option<ContentManifest>, DataLoadError> {
        let Some(path) = find_content_file(&self.root, MANIFEST_NAME) else {
            return Ok(None);
        };
        let value = read_yaml(&path)?;
        ContentManifest::from_value(&value)
            .map(Some)
            .map_err(|source| DataLoadError::Manifest { file: path, source })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ContentPackBuilder, card_yaml};
    use std::fs;
    use tempfile::TempDir;

    fn pack() -> (TempDir, ContentStore) {
        let dir = TempDir::new().unwrap();
        ContentPackBuilder::new(dir.path())
            .cards("starter.yaml", &[card_yaml("strike", 1), card_yaml("guard", 1)])
            .cards("rare.yml", &[card_yaml("sunburst", 4)])
            .write();
        let store = ContentStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn loads_yaml_and_yml() {
        let (_dir, store) = pack();
        let cards = store.load_content_directory(ContentType::Cards).unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards.files.len(), 2);
        assert!(cards.errors.is_empty());
        assert!(cards.get("sunburst").unwrap().source.ends_with("rare.yml"));
    }

    #[test]
    fn missing_type_directory_is_empty() {
        let (_dir, store) = pack();
        let events = store.load_content_directory(ContentType::Events).unwrap();
        assert!(events.is_empty());
        assert!(events.errors.is_empty());
    }

    #[test]
    fn malformed_file_does_not_block_siblings() {
        let (dir, store) = pack();
        fs::write(dir.path().join("cards/broken.yaml"), "oops: [\n").unwrap();

        let cards = store.load_content_directory(ContentType::Cards).unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards.errors.len(), 1);
        assert!(matches!(cards.errors[0], DataLoadError::Parse { .. }));
    }

    #[test]
    fn duplicate_ids_keep_first_file() {
        let (dir, store) = pack();
        fs::write(dir.path().join("cards/zz_copy.yaml"), card_yaml("strike", 3)).unwrap();

        let cards = store.load_content_directory(ContentType::Cards).unwrap();
        assert_eq!(cards.len(), 3);
        assert!(cards.get("strike").unwrap().source.ends_with("starter.yaml"));
        assert!(matches!(
            &cards.errors[0],
            DataLoadError::DuplicateId { id, .. } if id == "strike"
        ));
    }

    #[test]
    fn get_content_uses_cache_until_reload() {
        let (dir, store) = pack();
        let first = store.get_content(ContentType::Cards, false).unwrap();
        fs::remove_file(dir.path().join("cards/rare.yml")).unwrap();

        let cached = store.get_content(ContentType::Cards, false).unwrap();
        assert!(Arc::ptr_eq(&first, &cached));

        let reloaded = store.get_content(ContentType::Cards, true).unwrap();
        assert_eq!(reloaded.len(), 2);
        // The old snapshot is untouched.
        assert_eq!(first.len(), 3);
        assert_eq!(store.get_content_item(ContentType::Cards, "sunburst").unwrap(), None);
    }

    #[test]
    fn repeated_loads_are_identical() {
        let (_dir, store) = pack();
        let a = store.load_content_directory(ContentType::Cards).unwrap();
        let b = store.load_content_directory(ContentType::Cards).unwrap();
        assert_eq!(a.items, b.items);
        assert_eq!(a.files, b.files);
    }

    #[test]
    fn reload_all_covers_every_type() {
        let (_dir, store) = pack();
        let results = store.reload_all();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(store.cached_types(), ContentType::ALL.to_vec());
        store.clear_cache();
        assert!(store.cached_types().is_empty());
    }

    #[test]
    fn content_type_from_path() {
        let (dir, store) = pack();
        let root = store.root().to_path_buf();
        assert_eq!(
            store.content_type_of(&root.join("cards/starter.yaml")),
            Some(ContentType::Cards)
        );
        assert_eq!(
            store.content_type_of(&root.join("decks/deleted.yaml")),
            Some(ContentType::Decks)
        );
        assert_eq!(store.content_type_of(&root.join("cards")), None);
        assert_eq!(store.content_type_of(&root.join("music/theme.yaml")), None);
        assert_eq!(
            store.content_type_of(&dir.path().join("cards/starter.yaml")),
            Some(ContentType::Cards)
        );
    }

    #[test]
    fn open_requires_root() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ContentStore::open(dir.path().join("nope")),
            Err(DataLoadError::MissingRoot { .. })
        ));
    }

    #[test]
    fn manifest_loading() {
        let (dir, store) = pack();
        assert!(store.load_manifest().unwrap().is_none());

        fs::write(dir.path().join("manifest.yaml"), "name: Core\nversion: 1\n").unwrap();
        assert!(matches!(store.load_manifest(), Err(DataLoadError::Manifest { .. })));
    }
}
