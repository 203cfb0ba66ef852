//! Schema validation: raw items to typed entities plus a report.

use std::path::Path;
use std::time::Instant;

use duat_schema::{Card, ContentEntity, ContentManifest, ContentType, Deck, Enemy, Event, SchemaValidationError};
use serde_yaml_ng::Value;
use tracing::debug;

use crate::config::{BalanceTuning, ContentConfig};
use crate::heuristics::ItemLint;
use crate::loader::{DataLoadError, read_content_file};
use crate::report::{IssueKind, PerformanceStats, ValidationIssue, ValidationReport};
use crate::store::ContentMap;

/// Typed entities that passed schema construction, across all types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentBundle {
    pub cards: Vec<Card>,
    pub enemies: Vec<Enemy>,
    pub events: Vec<Event>,
    pub decks: Vec<Deck>,
}

impl ContentBundle {
    pub fn count(&self, content_type: ContentType) -> usize {
        match content_type {
            ContentType::Cards => self.cards.len(),
            ContentType::Enemies => self.enemies.len(),
            ContentType::Events => self.events.len(),
            ContentType::Decks => self.decks.len(),
        }
    }

    pub fn total(&self) -> usize {
        ContentType::ALL.iter().map(|ct| self.count(*ct)).sum()
    }
}

/// Builds typed entities from raw content and reports every problem found.
#[derive(Debug, Clone, Default)]
pub struct ContentValidator {
    tuning: BalanceTuning,
    performance_tracking: bool,
}

impl ContentValidator {
    pub fn new(tuning: BalanceTuning) -> Self {
        Self {
            tuning,
            performance_tracking: false,
        }
    }

    pub fn from_config(config: &ContentConfig) -> Self {
        Self::new(config.tuning.clone()).with_performance_tracking(config.performance_tracking)
    }

    pub fn with_performance_tracking(mut self, enabled: bool) -> Self {
        self.performance_tracking = enabled;
        self
    }

    pub fn tuning(&self) -> &BalanceTuning {
        &self.tuning
    }

    /// Validate one file on disk as content of `content_type`.
    pub fn validate_content_file(&self, path: &Path, content_type: ContentType) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();
        report.total_files = 1;
        let mut size_bytes = 0;

        match read_content_file(path) {
            Ok(file) if file.is_empty() => {
                report.push(
                    ValidationIssue::new(
                        IssueKind::EmptyFile,
                        "File is empty or contains no YAML content",
                    )
                    .in_file(Some(path)),
                );
            }
            Ok(file) => {
                size_bytes = file.size_bytes;
                report.total_items = file.entries.len();
                let mut bundle = ContentBundle::default();
                for (key, value) in &file.entries {
                    self.check_entry(content_type, key, value, Some(path), &mut bundle, &mut report);
                }
            }
            Err(e) => report.push(load_issue(&e)),
        }

        report.validation_time = start.elapsed();
        if self.performance_tracking {
            let secs = report.validation_time.as_secs_f64();
            report.performance_stats = Some(PerformanceStats {
                file_size_bytes: size_bytes,
                items_per_second: report.total_items as f64 / secs.max(0.001),
                validation_time_ms: secs * 1000.0,
            });
        }

        debug!(
            file = %path.display(),
            content_type = %content_type,
            items = report.total_items,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validated content file"
        );
        report
    }

    /// Validate a loaded directory, appending surviving entities to `bundle`.
    pub fn validate_content_map(&self, content: &ContentMap, bundle: &mut ContentBundle) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();
        report.total_files = content.files.len();
        report.total_items = content.len();

        for error in &content.errors {
            report.push(load_issue(error));
        }
        for file in &content.files {
            let has_items = content.items_from(file).next().is_some();
            let has_errors = content.errors.iter().any(|e| e.file() == Some(file.as_path()));
            if !has_items && !has_errors {
                report.push(
                    ValidationIssue::new(
                        IssueKind::EmptyFile,
                        "File is empty or contains no YAML content",
                    )
                    .in_file(Some(file)),
                );
            }
        }
        for item in content.items.values() {
            self.check_entry(
                content.content_type,
                &item.id,
                &item.fields,
                Some(&item.source),
                bundle,
                &mut report,
            );
        }

        report.validation_time = start.elapsed();
        report
    }

    fn check_entry(
        &self,
        content_type: ContentType,
        key: &str,
        value: &Value,
        file: Option<&Path>,
        bundle: &mut ContentBundle,
        report: &mut ValidationReport,
    ) {
        match content_type {
            ContentType::Cards => bundle.cards.extend(self.check_item::<Card>(key, value, file, report)),
            ContentType::Enemies => {
                bundle.enemies.extend(self.check_item::<Enemy>(key, value, file, report))
            }
            ContentType::Events => {
                bundle.events.extend(self.check_item::<Event>(key, value, file, report))
            }
            ContentType::Decks => bundle.decks.extend(self.check_item::<Deck>(key, value, file, report)),
        }
    }

    fn check_item<T: ContentEntity + ItemLint>(
        &self,
        key: &str,
        value: &Value,
        file: Option<&Path>,
        report: &mut ValidationReport,
    ) -> Option<T> {
        match T::from_value(key, value) {
            Ok(item) => {
                item.lint(&self.tuning, file, report);
                Some(item)
            }
            Err(e) => {
                report.push(schema_issue(T::CONTENT_TYPE, &e, file));
                None
            }
        }
    }

    /// Compare manifest counts with what actually validated.
    pub fn check_manifest(&self, manifest: &ContentManifest, bundle: &ContentBundle) -> Vec<ValidationIssue> {
        ContentType::ALL
            .iter()
            .filter_map(|ct| {
                let declared = manifest.declared_count(*ct) as usize;
                let actual = bundle.count(*ct);
                (declared != actual).then(|| {
                    ValidationIssue::new(
                        IssueKind::ManifestCountMismatch,
                        format!(
                            "Manifest '{}' declares {declared} {ct} but {actual} were loaded",
                            manifest.name
                        ),
                    )
                    .on_field(format!("{}_count", ct.as_str()))
                })
            })
            .collect()
    }
}

fn schema_issue(content_type: ContentType, error: &SchemaValidationError, file: Option<&Path>) -> ValidationIssue {
    let mut issue = ValidationIssue::new(
        IssueKind::SchemaValidation,
        format!("{} {error}", content_type.item_noun()),
    )
    .for_item(&error.item_id)
    .in_file(file);
    if let [only] = error.errors.as_slice() {
        issue = issue.on_field(&only.field);
    }
    issue
}

/// Report entry for a loader failure.
pub fn load_issue(error: &DataLoadError) -> ValidationIssue {
    let kind = match error {
        DataLoadError::Parse { .. } => IssueKind::ParseError,
        DataLoadError::NotAMapping { .. } | DataLoadError::Manifest { .. } => {
            IssueKind::FileSchemaValidation
        }
        DataLoadError::DuplicateId { .. } => IssueKind::DuplicateId,
        DataLoadError::MissingRoot { .. }
        | DataLoadError::UnsupportedFormat { .. }
        | DataLoadError::Io { .. }
        | DataLoadError::Walk(_) => IssueKind::ValidationException,
    };
    let issue = ValidationIssue::new(kind, error.to_string()).in_file(error.file());
    match error {
        DataLoadError::DuplicateId { id, .. } => issue.for_item(id),
        _ => issue,
    }
}
