//! Cross-reference database and validator.
//!
//! [`CrossReferenceValidator::populate_database`] builds a complete
//! [`CrossReferenceDatabase`] off to the side and then publishes it with a
//! single pointer swap. Readers clone the published `Arc` and keep a
//! consistent generation for as long as they hold it.

mod checks;
mod database;
mod stats;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use duat_schema::{Card, Deck, Enemy, Event};
use parking_lot::RwLock;
use tracing::{debug, error, info};

pub use database::{CrossReferenceDatabase, DatabaseBuilder};
pub use stats::ReferenceStatistics;

use crate::config::BalanceTuning;
use crate::report::{IssueKind, ValidationIssue, ValidationReport};
use crate::validator::ContentBundle;

/// Owns the published database and runs the cross-reference passes.
#[derive(Debug)]
pub struct CrossReferenceValidator {
    published: RwLock<Arc<CrossReferenceDatabase>>,
    next_generation: AtomicU64,
    tuning: BalanceTuning,
}

impl Default for CrossReferenceValidator {
    fn default() -> Self {
        Self::new(BalanceTuning::default())
    }
}

impl CrossReferenceValidator {
    pub fn new(tuning: BalanceTuning) -> Self {
        Self {
            published: RwLock::new(Arc::new(CrossReferenceDatabase::default())),
            next_generation: AtomicU64::new(1),
            tuning,
        }
    }

    pub fn tuning(&self) -> &BalanceTuning {
        &self.tuning
    }

    /// Replace the database with one built from these entities. Returns the
    /// database that was built, which is the published one unless a newer
    /// generation got there first.
    pub fn populate_database(
        &self,
        cards: impl IntoIterator<Item = Card>,
        enemies: impl IntoIterator<Item = Enemy>,
        events: impl IntoIterator<Item = Event>,
        decks: impl IntoIterator<Item = Deck>,
    ) -> Arc<CrossReferenceDatabase> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut builder = DatabaseBuilder::new(generation);
        let mut shadowed = 0usize;
        for card in cards {
            shadowed += usize::from(!builder.add_card(card));
        }
        for enemy in enemies {
            shadowed += usize::from(!builder.add_enemy(enemy));
        }
        for event in events {
            shadowed += usize::from(!builder.add_event(event));
        }
        for deck in decks {
            shadowed += usize::from(!builder.add_deck(deck));
        }
        let db = Arc::new(builder.build());

        debug!(
            generation,
            cards = db.cards().len(),
            enemies = db.enemies().len(),
            events = db.events().len(),
            decks = db.decks().len(),
            shadowed,
            "built cross-reference database"
        );

        let mut published = self.published.write();
        // A slower concurrent build must not replace a newer generation.
        if published.generation() < generation {
            *published = Arc::clone(&db);
        }
        db
    }

    pub fn populate_from_bundle(&self, bundle: ContentBundle) -> Arc<CrossReferenceDatabase> {
        let ContentBundle {
            cards,
            enemies,
            events,
            decks,
        } = bundle;
        self.populate_database(cards, enemies, events, decks)
    }

    /// The currently published database.
    pub fn database(&self) -> Arc<CrossReferenceDatabase> {
        Arc::clone(&self.published.read())
    }

    /// Run every pass against the published database.
    pub fn validate_all_cross_references(&self) -> ValidationReport {
        self.validate_database(&self.database())
    }

    /// Run every pass against `db`. A pass that panics is reported as a
    /// `validation_exception`; the others still run.
    pub fn validate_database(&self, db: &CrossReferenceDatabase) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();
        report.total_items =
            db.cards().len() + db.enemies().len() + db.events().len() + db.decks().len();

        for (name, pass) in checks::PASSES {
            match catch_unwind(AssertUnwindSafe(|| pass(db, &self.tuning))) {
                Ok(issues) => report.extend(issues),
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    error!(pass = name, detail = %detail, "cross-reference pass panicked");
                    report.push(ValidationIssue::new(
                        IssueKind::ValidationException,
                        format!("cross-reference pass '{name}' failed: {detail}"),
                    ));
                }
            }
        }

        report.validation_time = start.elapsed();
        info!(
            generation = db.generation(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "cross-reference validation finished"
        );
        report
    }

    pub fn get_reference_statistics(&self) -> ReferenceStatistics {
        ReferenceStatistics::from_database(&self.database())
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
