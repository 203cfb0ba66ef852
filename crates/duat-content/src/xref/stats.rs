//! Read-only aggregate counts over one database generation.

use std::collections::BTreeMap;

use duat_schema::{EffectType, HourOfNight, Keyword};
use serde::Serialize;

use super::checks::cost_histogram;
use super::database::CrossReferenceDatabase;

/// Aggregate counts for tooling. Every field comes from the same generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceStatistics {
    pub generation: u64,
    pub total_cards: usize,
    pub total_enemies: usize,
    pub total_events: usize,
    pub total_decks: usize,
    /// Card count per sand cost 0..=6.
    pub cards_by_cost: BTreeMap<u8, usize>,
    /// Every hour, including those with no content.
    pub enemies_by_hour: BTreeMap<HourOfNight, usize>,
    pub events_by_hour: BTreeMap<HourOfNight, usize>,
    /// Every keyword, including unused ones.
    pub keyword_usage: BTreeMap<Keyword, usize>,
    /// Effect types used by at least one card.
    pub effect_usage: BTreeMap<EffectType, usize>,
}

impl ReferenceStatistics {
    pub fn from_database(db: &CrossReferenceDatabase) -> Self {
        let cards_by_cost = cost_histogram(db)
            .iter()
            .enumerate()
            .filter_map(|(cost, count)| Some((u8::try_from(cost).ok()?, *count)))
            .collect();
        Self {
            generation: db.generation(),
            total_cards: db.cards().len(),
            total_enemies: db.enemies().len(),
            total_events: db.events().len(),
            total_decks: db.decks().len(),
            cards_by_cost,
            enemies_by_hour: HourOfNight::ALL
                .iter()
                .map(|h| (*h, db.enemy_count_at(*h)))
                .collect(),
            events_by_hour: HourOfNight::ALL
                .iter()
                .map(|h| (*h, db.event_count_at(*h)))
                .collect(),
            keyword_usage: Keyword::ALL
                .iter()
                .map(|k| (*k, db.keyword_usage(*k)))
                .collect(),
            effect_usage: EffectType::ALL
                .iter()
                .map(|e| (*e, db.effect_usage(*e)))
                .filter(|(_, n)| *n > 0)
                .collect(),
        }
    }

    /// Total entities across all four content types.
    pub fn total(&self) -> usize {
        self.total_cards + self.total_enemies + self.total_events + self.total_decks
    }
}
