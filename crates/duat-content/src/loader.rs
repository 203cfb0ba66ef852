//! File discovery and parsing for content directories.
//!
//! Provides format detection (YAML only), directory scanning, and parsing of
//! a content file into its top-level `id -> fields` entries. Nothing here
//! validates item fields; that is the validator's job.

use std::path::{Path, PathBuf};

use duat_schema::SchemaValidationError;
use serde_yaml_ng::Value;
use walkdir::WalkDir;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during content loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The content root directory does not exist.
    #[error("content root {root} does not exist")]
    MissingRoot { root: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// The file is not valid YAML.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file parsed, but its top level is not an id-keyed mapping.
    #[error("{file} must contain a mapping of item ids to items")]
    NotAMapping { file: PathBuf },

    /// Two files of one content type define the same id.
    #[error("duplicate id '{id}' in {file} (first defined in {first})")]
    DuplicateId {
        file: PathBuf,
        id: String,
        first: PathBuf,
    },

    /// The content pack manifest failed schema checks.
    #[error("invalid manifest {file}: {source}")]
    Manifest {
        file: PathBuf,
        #[source]
        source: SchemaValidationError,
    },

    /// An I/O error occurred.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl DataLoadError {
    /// The file this error is about, if it concerns a single file.
    pub fn file(&self) -> Option<&Path> {
        match self {
            DataLoadError::UnsupportedFormat { file }
            | DataLoadError::Parse { file, .. }
            | DataLoadError::NotAMapping { file }
            | DataLoadError::DuplicateId { file, .. }
            | DataLoadError::Manifest { file, .. } => Some(file),
            DataLoadError::Io { path, .. } => Some(path),
            DataLoadError::MissingRoot { .. } | DataLoadError::Walk(_) => None,
        }
    }
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported content file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => Ok(Format::Yaml),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Whether `path` names a content file.
pub fn is_content_file(path: &Path) -> bool {
    detect_format(path).is_ok()
}

// ===========================================================================
// File discovery
// ===========================================================================

/// List the content files directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn discover_content_files(dir: &Path) -> Result<Vec<PathBuf>, DataLoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_content_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Find `{base_name}.yaml` or `{base_name}.yml` in `dir`, preferring `.yaml`.
pub fn find_content_file(dir: &Path, base_name: &str) -> Option<PathBuf> {
    ["yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{base_name}.{ext}")))
        .find(|candidate| candidate.is_file())
}

// ===========================================================================
// Parsing
// ===========================================================================

/// One parsed content file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFile {
    pub path: PathBuf,
    /// Top-level entries in file order.
    pub entries: Vec<(String, Value)>,
    pub size_bytes: u64,
}

impl ContentFile {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a YAML document from disk without interpreting its shape.
pub fn read_yaml(path: &Path) -> Result<Value, DataLoadError> {
    detect_format(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml_ng::from_str(&text).map_err(|e| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Read and parse a content file into its top-level entries.
///
/// An empty document yields a file with no entries. Scalar keys (numbers,
/// booleans) are kept as strings so the item still reaches validation.
pub fn read_content_file(path: &Path) -> Result<ContentFile, DataLoadError> {
    let document = read_yaml(path)?;
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let entries = match document {
        Value::Null => Vec::new(),
        Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, fields) in map {
                let key = match key {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(DataLoadError::Parse {
                            file: path.to_path_buf(),
                            detail: "item keys must be strings".to_string(),
                        });
                    }
                };
                entries.push((key, fields));
            }
            entries
        }
        _ => {
            return Err(DataLoadError::NotAMapping {
                file: path.to_path_buf(),
            });
        }
    };

    Ok(ContentFile {
        path: path.to_path_buf(),
        entries,
        size_bytes,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
