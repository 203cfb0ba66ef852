//! Subcommand implementations. Each returns the process exit code or a
//! fatal error.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use duat_content::{
    ConfigError, ContentConfig, ContentStore, ContentValidator, DataLoadError, HotReloadManager,
    ReferenceStatistics, ReloadError, ValidationReport,
};
use duat_schema::ContentType;
use tracing::info;

/// Pack is valid.
pub const EXIT_VALID: u8 = 0;
/// Pack loaded but has errors.
pub const EXIT_INVALID: u8 = 1;
/// Nothing could be validated.
pub const EXIT_FATAL: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] DataLoadError),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error("cannot tell the content type of {0}; pass --type")]
    UnknownType(PathBuf),

    #[error("invalid debounce delay: {0}")]
    Debounce(String),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Resolve the configuration from `--config` and `--root`.
pub fn load_config(config: Option<&Path>, root: Option<&Path>) -> Result<ContentConfig, CliError> {
    let mut loaded = match config {
        Some(path) => ContentConfig::from_toml_file(path)?,
        None => ContentConfig::default(),
    };
    if let Some(root) = root {
        loaded.content_root = root.to_path_buf();
    }
    Ok(loaded)
}

/// Open the pack and fail fast on an unparseable manifest.
fn open_store(config: &ContentConfig) -> Result<Arc<ContentStore>, CliError> {
    let store = ContentStore::open(&config.content_root)?;
    if let Some(manifest) = store.load_manifest()? {
        info!(name = %manifest.name, version = %manifest.version, "loaded manifest");
    }
    Ok(Arc::new(store))
}

fn exit_for(report: &ValidationReport) -> ExitCode {
    ExitCode::from(if report.is_valid() {
        EXIT_VALID
    } else {
        EXIT_INVALID
    })
}

fn print_report(out: &mut impl Write, report: &ValidationReport, json: bool) -> Result<(), CliError> {
    if json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
    } else {
        write!(out, "{report}")?;
    }
    Ok(())
}

pub fn validate(config: &ContentConfig, json: bool, out: &mut impl Write) -> Result<ExitCode, CliError> {
    let store = open_store(config)?;
    let manager = HotReloadManager::new(store, config);
    let report = manager.force_reload_all();
    print_report(out, &report, json)?;
    Ok(exit_for(&report))
}

pub fn check_file(
    config: &ContentConfig,
    path: &Path,
    content_type: Option<ContentType>,
    json: bool,
    out: &mut impl Write,
) -> Result<ExitCode, CliError> {
    let content_type = match content_type {
        Some(ct) => ct,
        None => ContentStore::new(&config.content_root)
            .content_type_of(path)
            .or_else(|| infer_from_parent(path))
            .ok_or_else(|| CliError::UnknownType(path.to_path_buf()))?,
    };
    let report = ContentValidator::from_config(config)
        .with_performance_tracking(true)
        .validate_content_file(path, content_type);
    print_report(out, &report, json)?;
    Ok(exit_for(&report))
}

/// `.../cards/x.yaml` is a cards file wherever the pack lives.
fn infer_from_parent(path: &Path) -> Option<ContentType> {
    path.parent()?.file_name()?.to_str()?.parse().ok()
}

pub fn stats(config: &ContentConfig, json: bool, out: &mut impl Write) -> Result<ExitCode, CliError> {
    let store = open_store(config)?;
    let manager = HotReloadManager::new(store, config);
    let report = manager.force_reload_all();
    let stats = manager.reference_statistics();
    if json {
        serde_json::to_writer_pretty(&mut *out, &stats)?;
        writeln!(out)?;
    } else {
        print_stats(out, &stats)?;
    }
    Ok(exit_for(&report))
}

fn print_stats(out: &mut impl Write, stats: &ReferenceStatistics) -> io::Result<()> {
    writeln!(
        out,
        "{} cards, {} enemies, {} events, {} decks",
        stats.total_cards, stats.total_enemies, stats.total_events, stats.total_decks
    )?;
    writeln!(out, "\nCards by sand cost:")?;
    for (cost, count) in &stats.cards_by_cost {
        writeln!(out, "  {cost}: {count}")?;
    }
    writeln!(out, "\nContent by hour (enemies / events):")?;
    for (hour, enemies) in &stats.enemies_by_hour {
        let events = stats.events_by_hour.get(hour).copied().unwrap_or_default();
        writeln!(out, "  {hour:<14} {enemies:>3} / {events}")?;
    }
    writeln!(out, "\nKeywords in use:")?;
    for (keyword, count) in stats.keyword_usage.iter().filter(|(_, n)| **n > 0) {
        writeln!(out, "  {keyword}: {count}")?;
    }
    writeln!(out, "\nEffect types in use:")?;
    for (effect, count) in &stats.effect_usage {
        writeln!(out, "  {effect}: {count}")?;
    }
    Ok(())
}

pub fn watch(config: &ContentConfig, debounce: Option<f64>, out: &mut impl Write) -> Result<ExitCode, CliError> {
    let delay = match debounce {
        Some(secs) => {
            Duration::try_from_secs_f64(secs).map_err(|e| CliError::Debounce(e.to_string()))?
        }
        None => config.debounce_duration(),
    };
    let store = open_store(config)?;
    let mut manager = HotReloadManager::new(store, config);
    manager.register_reload_callback("cli", |content_type, path, event| {
        eprintln!("{} {} ({content_type})", event.kind, path.display());
        Ok(())
    });
    manager.start_watching(delay)?;
    if let Some(report) = manager.validation_report() {
        print_report(out, &report, false)?;
    }
    writeln!(out, "Watching {} (press Enter to stop)", config.content_root.display())?;
    out.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    manager.stop_watching();

    let stats = manager.get_reload_statistics();
    writeln!(
        out,
        "{} reloads, average {:.1} ms",
        stats.total_reloads,
        stats.average_reload_time.as_secs_f64() * 1000.0
    )?;
    let report = manager.force_reload_all();
    Ok(exit_for(&report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duat_content::test_utils::{ContentPackBuilder, card_yaml, deck_yaml};
    use tempfile::TempDir;

    fn config(root: &Path) -> ContentConfig {
        load_config(None, Some(root)).unwrap()
    }

    #[test]
    fn validate_exit_codes() {
        let dir = TempDir::new().unwrap();
        let root = ContentPackBuilder::new(dir.path())
            .cards("starter.yaml", &[card_yaml("strike", 1)])
            .write();
        let mut out = Vec::new();
        let code = validate(&config(&root), false, &mut out).unwrap();
        assert_eq!(code, ExitCode::from(EXIT_VALID));

        let broken = ContentPackBuilder::new(dir.path())
            .decks("decks.yaml", &[deck_yaml("starter", &["ghost"; 10])])
            .write();
        let mut out = Vec::new();
        let code = validate(&config(&broken), true, &mut out).unwrap();
        assert_eq!(code, ExitCode::from(EXIT_INVALID));
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let errors = json["errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e["kind"] == "invalid_card_reference"));
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = validate(&config(&dir.path().join("nope")), false, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Load(DataLoadError::MissingRoot { .. })));
    }

    #[test]
    fn unparseable_manifest_is_fatal() {
        let dir = TempDir::new().unwrap();
        let root = ContentPackBuilder::new(dir.path()).raw("manifest.yaml", "name: [").write();
        let err = validate(&config(&root), false, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Load(DataLoadError::Parse { .. })));
    }

    #[test]
    fn check_file_infers_type() {
        let dir = TempDir::new().unwrap();
        let root = ContentPackBuilder::new(dir.path())
            .cards("starter.yaml", &[card_yaml("strike", 1)])
            .write();
        let path = root.join("cards/starter.yaml");
        let code = check_file(&config(&root), &path, None, false, &mut Vec::new()).unwrap();
        assert_eq!(code, ExitCode::from(EXIT_VALID));

        let code = check_file(&config(&root), &path, Some(ContentType::Enemies), false, &mut Vec::new()).unwrap();
        assert_eq!(code, ExitCode::from(EXIT_INVALID));

        let stray = dir.path().join("stray.yaml");
        let err = check_file(&config(&root), &stray, None, false, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::UnknownType(_)));
    }

    #[test]
    fn stats_json() {
        let dir = TempDir::new().unwrap();
        let root = ContentPackBuilder::new(dir.path())
            .cards("starter.yaml", &[card_yaml("strike", 1), card_yaml("guard", 1)])
            .write();
        let mut out = Vec::new();
        stats(&config(&root), true, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["total_cards"], 2);
        assert_eq!(json["cards_by_cost"]["1"], 2);

        let mut text = Vec::new();
        stats(&config(&root), false, &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("2 cards"));
    }
}
