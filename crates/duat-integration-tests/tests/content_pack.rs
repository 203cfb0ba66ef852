//! End-to-end validation of on-disk content packs.
//!
//! Each test writes a small pack to a temp directory, runs the full
//! pipeline (load, schema checks, cross references) through
//! `HotReloadManager::force_reload_all`, and inspects the merged report.

use std::sync::Arc;
use std::thread;

use duat_content::test_utils::*;
use duat_content::{
    ContentConfig, ContentStore, CrossReferenceValidator, HotReloadManager, IssueKind,
    ValidationReport,
};
use duat_schema::{ContentType, HourOfNight};
use tempfile::TempDir;

fn manager(root: &std::path::Path) -> HotReloadManager {
    let store = Arc::new(ContentStore::open(root).unwrap());
    HotReloadManager::new(store, &ContentConfig::new(root))
}

fn validate(root: &std::path::Path) -> Arc<ValidationReport> {
    manager(root).force_reload_all()
}

// ===========================================================================
// Schema layer
// ===========================================================================

#[test]
fn key_id_mismatch_reports_one_error_and_keeps_siblings() {
    let dir = TempDir::new().unwrap();
    let mismatched = card_yaml("fire_ball", 2).replacen("fire_ball:", "fireball:", 1);
    let root = ContentPackBuilder::new(dir.path())
        .cards("starter.yaml", &[card_yaml("strike", 1), mismatched, card_yaml("guard", 1)])
        .write();

    let report = validate(&root);
    let schema_errors = report.of_kind(IssueKind::SchemaValidation);
    assert_eq!(schema_errors.len(), 1);
    assert_eq!(schema_errors[0].item_id.as_deref(), Some("fireball"));
    assert!(schema_errors[0].message.contains("fire_ball"));
    assert!(!report.is_valid());

    let manager = manager(&root);
    let cards = manager.store().get_content(ContentType::Cards, false).unwrap();
    assert!(cards.get("strike").is_some());
    assert!(cards.get("guard").is_some());
}

#[test]
fn unparseable_file_does_not_hide_other_files() {
    let dir = TempDir::new().unwrap();
    let root = ContentPackBuilder::new(dir.path())
        .cards("good.yaml", &[card_yaml("strike", 1)])
        .raw("cards/broken.yaml", "strike: [unclosed")
        .write();

    let manager = manager(&root);
    let report = manager.force_reload_all();
    let parse_errors = report.of_kind(IssueKind::ParseError);
    assert_eq!(parse_errors.len(), 1);
    let file = parse_errors[0].file.as_deref().unwrap();
    assert_eq!(file.file_name().unwrap(), "broken.yaml");
    assert_eq!(manager.reference_statistics().total_cards, 1);
}

// ===========================================================================
// Cross references
// ===========================================================================

#[test]
fn deck_with_missing_card() {
    let dir = TempDir::new().unwrap();
    let mut cards: Vec<&str> = vec!["a", "b"];
    cards.extend(["a"; 9]);
    cards.push("missing_card");
    let root = ContentPackBuilder::new(dir.path())
        .cards("starter.yaml", &[card_yaml("a", 1), card_yaml("b", 2)])
        .decks("decks.yaml", &[deck_yaml("starter", &cards)])
        .write();

    let report = validate(&root);
    let missing = report.of_kind(IssueKind::InvalidCardReference);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].item_id.as_deref(), Some("starter"));
    assert!(missing[0].message.contains("missing_card"));
    assert!(!report.is_valid());
}

#[test]
fn regression_between_hours() {
    let dir = TempDir::new().unwrap();
    let root = ContentPackBuilder::new(dir.path())
        .enemies(
            "night.yaml",
            &[
                enemy_yaml("gatekeeper", 350, 5, Some(HourOfNight::First)),
                enemy_yaml("jackal", 200, 5, Some(HourOfNight::Second)),
            ],
        )
        .write();

    let report = validate(&root);
    let regressions = report.of_kind(IssueKind::DifficultyRegression);
    assert_eq!(regressions.len(), 1);
    assert!(regressions[0].message.contains("250.0"));
    assert!(regressions[0].message.contains("400.0"));
}

#[test]
fn small_drop_within_tolerance() {
    let dir = TempDir::new().unwrap();
    let root = ContentPackBuilder::new(dir.path())
        .enemies(
            "night.yaml",
            &[
                enemy_yaml("gatekeeper", 350, 5, Some(HourOfNight::First)),
                enemy_yaml("jackal", 300, 5, Some(HourOfNight::Second)),
            ],
        )
        .write();

    assert_eq!(validate(&root).count(IssueKind::DifficultyRegression), 0);
}

#[test]
fn sand_cost_gaps() {
    let dir = TempDir::new().unwrap();
    let costs = [0u8, 1, 1, 2, 3, 5, 5];
    let snippets: Vec<String> = costs
        .iter()
        .enumerate()
        .map(|(i, cost)| card_yaml(&format!("card_{i}"), *cost))
        .collect();
    let root = ContentPackBuilder::new(dir.path())
        .cards("curve.yaml", &snippets)
        .write();

    let report = validate(&root);
    let gaps = report.of_kind(IssueKind::SandCostGap);
    assert_eq!(gaps.len(), 2);
    assert!(gaps[0].message.contains('4'));
    assert!(gaps[1].message.contains('6'));
    assert!(report.is_valid());
}

#[test]
fn complete_night_has_no_hour_warnings() {
    let dir = TempDir::new().unwrap();
    let (enemies, events): (Vec<String>, Vec<String>) = HourOfNight::ALL
        .iter()
        .enumerate()
        .map(|(i, hour)| {
            let health = 20 + 10 * u32::try_from(i).unwrap();
            (
                enemy_yaml(&format!("enemy_{i}"), health, 3, Some(*hour)),
                event_yaml(&format!("event_{i}"), Some(*hour)),
            )
        })
        .unzip();
    let root = ContentPackBuilder::new(dir.path())
        .enemies("night.yaml", &enemies)
        .events("night.yaml", &events)
        .write();

    let report = validate(&root);
    assert_eq!(report.count(IssueKind::MissingHourContent), 0);
    assert_eq!(report.count(IssueKind::EmptyHour), 0);
    assert_eq!(report.count(IssueKind::DifficultyRegression), 0);
}

#[test]
fn manifest_counts_checked() {
    let dir = TempDir::new().unwrap();
    let manifest = "name: Core
version: 1.0.0
description: The core Sands of Duat pack.
cards_count: 3
enemies_count: 0
events_count: 0
decks_count: 0
";
    let root = ContentPackBuilder::new(dir.path())
        .cards("starter.yaml", &[card_yaml("strike", 1), card_yaml("guard", 1)])
        .raw("manifest.yaml", manifest)
        .write();

    let report = validate(&root);
    let mismatches = report.of_kind(IssueKind::ManifestCountMismatch);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].field.as_deref(), Some("cards_count"));
    assert!(report.is_valid());
}

// ===========================================================================
// Loading and publishing
// ===========================================================================

#[test]
fn repeated_loads_are_identical() {
    let dir = TempDir::new().unwrap();
    let root = ContentPackBuilder::new(dir.path())
        .cards("a.yaml", &[card_yaml("strike", 1), card_yaml("guard", 2)])
        .cards("b.yml", &[card_yaml("smite", 3)])
        .write();
    let store = ContentStore::open(&root).unwrap();

    let first = store.load_content_directory(ContentType::Cards).unwrap();
    let second = store.load_content_directory(ContentType::Cards).unwrap();
    assert_eq!(first.items, second.items);
    assert_eq!(first.files, second.files);
    assert_eq!(first.len(), 3);
}

#[test]
fn readers_never_see_a_partial_database() {
    let validator = Arc::new(CrossReferenceValidator::default());
    let writer = {
        let validator = Arc::clone(&validator);
        thread::spawn(move || {
            for n in 1..=40usize {
                let cards: Vec<_> = (0..n).map(|i| card(&format!("card_{i}"), 1)).collect();
                let decks: Vec<_> = (0..n).map(|i| deck(&format!("deck_{i}"), &["card_0"; 10])).collect();
                validator.populate_database(cards, Vec::new(), Vec::new(), decks);
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..500 {
                    let stats = validator.get_reference_statistics();
                    assert_eq!(stats.total_cards, stats.total_decks);
                    assert!(stats.generation >= last);
                    last = stats.generation;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(validator.get_reference_statistics().total_cards, 40);
}
