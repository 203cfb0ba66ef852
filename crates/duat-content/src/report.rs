//! Validation reports.
//!
//! Every check in the pipeline records a [`ValidationIssue`] instead of
//! returning an error, so one bad item never hides the others. A report is
//! produced fresh by each validation call.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Serializer};

// ===========================================================================
// Issue kinds
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// What a validation issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    // File level
    ParseError,
    EmptyFile,
    FileSchemaValidation,
    ValidationException,
    DuplicateId,
    // Item level
    SchemaValidation,
    BalanceWarning,
    ThemeConsistency,
    AccessibilityWarning,
    PlayabilityWarning,
    // Cross references
    InvalidCardReference,
    InvalidEnemyReference,
    InvalidPoolReference,
    InvalidKeywordReference,
    InvalidBlessingType,
    InvalidCurseType,
    InvalidBuffType,
    InvalidDebuffType,
    DeckBalanceWarning,
    KeywordConsistencyWarning,
    ConflictingKeywords,
    MissingHourContent,
    EmptyHour,
    SandCostGap,
    DifficultyRegression,
    ManifestCountMismatch,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::ParseError => "parse_error",
            IssueKind::EmptyFile => "empty_file",
            IssueKind::FileSchemaValidation => "file_schema_validation",
            IssueKind::ValidationException => "validation_exception",
            IssueKind::DuplicateId => "duplicate_id",
            IssueKind::SchemaValidation => "schema_validation",
            IssueKind::BalanceWarning => "balance_warning",
            IssueKind::ThemeConsistency => "theme_consistency",
            IssueKind::AccessibilityWarning => "accessibility_warning",
            IssueKind::PlayabilityWarning => "playability_warning",
            IssueKind::InvalidCardReference => "invalid_card_reference",
            IssueKind::InvalidEnemyReference => "invalid_enemy_reference",
            IssueKind::InvalidPoolReference => "invalid_pool_reference",
            IssueKind::InvalidKeywordReference => "invalid_keyword_reference",
            IssueKind::InvalidBlessingType => "invalid_blessing_type",
            IssueKind::InvalidCurseType => "invalid_curse_type",
            IssueKind::InvalidBuffType => "invalid_buff_type",
            IssueKind::InvalidDebuffType => "invalid_debuff_type",
            IssueKind::DeckBalanceWarning => "deck_balance_warning",
            IssueKind::KeywordConsistencyWarning => "keyword_consistency_warning",
            IssueKind::ConflictingKeywords => "conflicting_keywords",
            IssueKind::MissingHourContent => "missing_hour_content",
            IssueKind::EmptyHour => "empty_hour",
            IssueKind::SandCostGap => "sand_cost_gap",
            IssueKind::DifficultyRegression => "difficulty_regression",
            IssueKind::ManifestCountMismatch => "manifest_count_mismatch",
        }
    }

    /// Severity an issue of this kind gets unless overridden.
    pub fn default_severity(self) -> Severity {
        match self {
            IssueKind::ParseError
            | IssueKind::EmptyFile
            | IssueKind::FileSchemaValidation
            | IssueKind::ValidationException
            | IssueKind::DuplicateId
            | IssueKind::SchemaValidation
            | IssueKind::InvalidCardReference
            | IssueKind::InvalidEnemyReference
            | IssueKind::InvalidPoolReference
            | IssueKind::InvalidKeywordReference
            | IssueKind::ConflictingKeywords => Severity::Error,
            IssueKind::BalanceWarning
            | IssueKind::ThemeConsistency
            | IssueKind::AccessibilityWarning
            | IssueKind::PlayabilityWarning
            | IssueKind::InvalidBlessingType
            | IssueKind::InvalidCurseType
            | IssueKind::InvalidBuffType
            | IssueKind::InvalidDebuffType
            | IssueKind::DeckBalanceWarning
            | IssueKind::KeywordConsistencyWarning
            | IssueKind::MissingHourContent
            | IssueKind::EmptyHour
            | IssueKind::SandCostGap
            | IssueKind::DifficultyRegression
            | IssueKind::ManifestCountMismatch => Severity::Warning,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===========================================================================
// Issues
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            file: None,
            item_id: None,
            field: None,
        }
    }

    pub fn in_file(mut self, file: Option<&Path>) -> Self {
        self.file = file.map(Path::to_path_buf);
        self
    }

    pub fn for_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({})", file.display())?;
        }
        Ok(())
    }
}

// ===========================================================================
// Reports
// ===========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub file_size_bytes: u64,
    pub items_per_second: f64,
    pub validation_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_files: usize,
    pub total_items: usize,
    #[serde(rename = "validation_time_secs", serialize_with = "as_secs")]
    pub validation_time: Duration,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_stats: Option<PerformanceStats>,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue in the list matching its severity.
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    /// Fold another report into this one: counts and time add up, issues
    /// are appended in order.
    pub fn merge(&mut self, other: ValidationReport) {
        self.total_files += other.total_files;
        self.total_items += other.total_items;
        self.validation_time += other.validation_time;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        if self.performance_stats.is_none() {
            self.performance_stats = other.performance_stats;
        }
    }

    /// No errors. Warnings never affect validity.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// Errors then warnings.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn of_kind(&self, kind: IssueKind) -> Vec<&ValidationIssue> {
        self.issues().filter(|i| i.kind == kind).collect()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues().filter(|i| i.kind == kind).count()
    }

    /// Issue counts per kind.
    pub fn counts_by_kind(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in self.issues() {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }
}

const SUMMARY_ERROR_LIMIT: usize = 10;
const SUMMARY_WARNING_LIMIT: usize = 5;

/// Human-readable summary, truncated to the first few issues of each list.
impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Validation Report ===")?;
        writeln!(f, "Files validated: {}", self.total_files)?;
        writeln!(f, "Items validated: {}", self.total_items)?;
        writeln!(f, "Validation time: {:.3}s", self.validation_time.as_secs_f64())?;
        if self.is_valid() {
            writeln!(f, "Validation PASSED")?;
        } else {
            writeln!(f, "Validation FAILED")?;
        }

        for (label, issues, limit) in [
            ("Errors", &self.errors, SUMMARY_ERROR_LIMIT),
            ("Warnings", &self.warnings, SUMMARY_WARNING_LIMIT),
        ] {
            if issues.is_empty() {
                continue;
            }
            writeln!(f, "\n{label} ({}):", issues.len())?;
            for issue in issues.iter().take(limit) {
                writeln!(f, "  - {issue}")?;
            }
            if issues.len() > limit {
                writeln!(f, "  ... and {} more", issues.len() - limit)?;
            }
        }

        let counts = self.counts_by_kind();
        if !counts.is_empty() {
            writeln!(f, "\nBy kind:")?;
            for (kind, n) in counts {
                writeln!(f, "  {kind}: {n}")?;
            }
        }

        if let Some(perf) = &self.performance_stats {
            writeln!(f, "\nPerformance:")?;
            writeln!(f, "  Items/second: {:.1}", perf.items_per_second)?;
            writeln!(f, "  Validation time: {:.1}ms", perf.validation_time_ms)?;
        }
        Ok(())
    }
}
