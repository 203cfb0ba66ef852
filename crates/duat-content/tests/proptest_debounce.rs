//! Property-based tests for change debouncing on a synthetic clock.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use duat_content::hot_reload::{ChangeKind, ContentHash, Debouncer, FileChangeEvent};
use proptest::prelude::*;

const DELAY_MS: u64 = 100;

// ===========================================================================
// Helpers
// ===========================================================================

fn change(path: &str, content: u32) -> FileChangeEvent {
    FileChangeEvent::new(PathBuf::from(path), ChangeKind::Modified)
        .with_hash(ContentHash::of(&content.to_le_bytes()))
}

/// Feed one path's changes at the given gaps and count the reloads that
/// come out, draining the debouncer before each arrival.
fn reloads_for(gaps_ms: &[u64], same_content: bool) -> usize {
    let mut debouncer = Debouncer::new(Duration::from_millis(DELAY_MS));
    let mut now = Instant::now();
    let mut reloads = 0;
    for (i, gap) in gaps_ms.iter().enumerate() {
        now += Duration::from_millis(*gap);
        reloads += debouncer.drain_due(now).len();
        let content = if same_content { 0 } else { u32::try_from(i).unwrap() + 1 };
        debouncer.observe(change("cards/starter.yaml", content), now);
    }
    reloads + debouncer.drain_due(now + Duration::from_secs(60)).len()
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Changes closer together than the window collapse into one reload.
    #[test]
    fn burst_inside_window_reloads_once(gaps in proptest::collection::vec(0..DELAY_MS, 1..30)) {
        prop_assert_eq!(reloads_for(&gaps, false), 1);
    }

    /// Changes further apart than the window each reload.
    #[test]
    fn spaced_changes_each_reload(gaps in proptest::collection::vec(DELAY_MS + 1..10 * DELAY_MS, 1..30)) {
        prop_assert_eq!(reloads_for(&gaps, false), gaps.len());
    }

    /// Rewriting the same bytes never reloads twice.
    #[test]
    fn identical_content_reloads_once(gaps in proptest::collection::vec(0..10 * DELAY_MS, 1..30)) {
        prop_assert_eq!(reloads_for(&gaps, true), 1);
    }

    /// Independent paths never suppress each other.
    #[test]
    fn paths_debounce_independently(paths in 1usize..8) {
        let mut debouncer = Debouncer::new(Duration::from_millis(DELAY_MS));
        let now = Instant::now();
        for i in 0..paths {
            debouncer.observe(change(&format!("cards/file_{i}.yaml"), 7), now);
        }
        prop_assert_eq!(debouncer.pending_count(), paths);
        prop_assert!(debouncer.drain_due(now).is_empty());
        prop_assert_eq!(debouncer.drain_due(now + Duration::from_millis(DELAY_MS)).len(), paths);
    }
}
