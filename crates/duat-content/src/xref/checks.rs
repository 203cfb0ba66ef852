//! Cross-reference passes. Each pass reads one database generation and
//! returns its issues; passes do not depend on one another.

use duat_schema::card::MAX_SAND_COST;
use duat_schema::fields::render;
use duat_schema::{CardPool, Effect, HourOfNight, Keyword, MetadataVocabulary, Requirement};
use serde_yaml_ng::Value;

use super::database::CrossReferenceDatabase;
use crate::config::BalanceTuning;
use crate::report::{IssueKind, ValidationIssue};

/// A named cross-reference pass.
pub(crate) type Pass = fn(&CrossReferenceDatabase, &BalanceTuning) -> Vec<ValidationIssue>;

pub(crate) const PASSES: [(&str, Pass); 7] = [
    ("deck_references", deck_references),
    ("event_references", event_references),
    ("requirement_references", requirement_references),
    ("effect_metadata", effect_metadata),
    ("keyword_consistency", keyword_consistency),
    ("hour_distribution", hour_distribution),
    ("progression", progression),
];

// ===========================================================================
// References
// ===========================================================================

/// Deck card ids must resolve; the mean cost of resolved cards must fall in
/// the tuned band.
pub(crate) fn deck_references(db: &CrossReferenceDatabase, tuning: &BalanceTuning) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (deck_id, deck) in db.decks() {
        for card_id in deck.unique_cards() {
            if !db.has_card(card_id) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::InvalidCardReference,
                        format!("Deck '{deck_id}' references non-existent card '{card_id}'"),
                    )
                    .for_item(deck_id)
                    .on_field("cards"),
                );
            }
        }

        let costs: Vec<f64> = deck
            .cards
            .iter()
            .filter_map(|id| db.card(id))
            .map(|card| f64::from(card.sand_cost))
            .collect();
        if costs.is_empty() {
            continue;
        }
        let mean = costs.iter().sum::<f64>() / costs.len() as f64;
        let verdict = if mean > tuning.deck_max_average_cost {
            Some("high")
        } else if mean < tuning.deck_min_average_cost {
            Some("low")
        } else {
            None
        };
        if let Some(verdict) = verdict {
            issues.push(
                ValidationIssue::new(
                    IssueKind::DeckBalanceWarning,
                    format!("Deck '{deck_id}' has {verdict} average sand cost ({mean:.1})"),
                )
                .for_item(deck_id),
            );
        }
    }
    issues
}

/// Card, enemy, and pool names carried in event effect metadata.
pub(crate) fn event_references(db: &CrossReferenceDatabase, _tuning: &BalanceTuning) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (event_id, event) in db.events() {
        for effect in event.all_effects() {
            if let Some(value) = effect.metadata.get("card_id") {
                if !reference(value).is_some_and(|id| db.has_card(id)) {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::InvalidCardReference,
                            format!("Event '{event_id}' references non-existent card {}", render(value)),
                        )
                        .for_item(event_id),
                    );
                }
            }
            if let Some(value) = effect.metadata.get("enemy_id") {
                if !reference(value).is_some_and(|id| db.has_enemy(id)) {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::InvalidEnemyReference,
                            format!("Event '{event_id}' references non-existent enemy {}", render(value)),
                        )
                        .for_item(event_id),
                    );
                }
            }
            if let Some(value) = effect.metadata.get("pool") {
                if !reference(value).is_some_and(|pool| pool.parse::<CardPool>().is_ok()) {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::InvalidPoolReference,
                            format!("Event '{event_id}' references unknown card pool {}", render(value)),
                        )
                        .for_item(event_id),
                    );
                }
            }
        }
    }
    issues
}

/// `card_in_deck` and `card_with_keyword` predicates on events and deck
/// unlocks.
pub(crate) fn requirement_references(
    db: &CrossReferenceDatabase,
    _tuning: &BalanceTuning,
) -> Vec<ValidationIssue> {
    let events = db
        .events()
        .iter()
        .flat_map(|(id, event)| event.all_requirements().map(move |r| ("Event", id, r)));
    let decks = db
        .decks()
        .iter()
        .flat_map(|(id, deck)| deck.unlock_requirements.iter().map(move |r| ("Deck", id, r)));

    events
        .chain(decks)
        .filter_map(|(owner, id, requirement)| check_requirement(db, owner, id, requirement))
        .collect()
}

fn check_requirement(
    db: &CrossReferenceDatabase,
    owner: &str,
    item_id: &str,
    requirement: &Requirement,
) -> Option<ValidationIssue> {
    match requirement.kind()? {
        Requirement::CARD_IN_DECK => {
            let value = requirement.param_value("card_id")?;
            (!reference(value).is_some_and(|id| db.has_card(id))).then(|| {
                ValidationIssue::new(
                    IssueKind::InvalidCardReference,
                    format!(
                        "{owner} '{item_id}' requirement references non-existent card {}",
                        render(value)
                    ),
                )
                .for_item(item_id)
            })
        }
        Requirement::CARD_WITH_KEYWORD => {
            let value = requirement.param_value("keyword")?;
            (!reference(value).is_some_and(|kw| kw.parse::<Keyword>().is_ok())).then(|| {
                ValidationIssue::new(
                    IssueKind::InvalidKeywordReference,
                    format!(
                        "{owner} '{item_id}' requirement references unknown keyword {}",
                        render(value)
                    ),
                )
                .for_item(item_id)
            })
        }
        _ => None,
    }
}

/// The id a reference value names. Only strings name anything.
fn reference(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Metadata keys tied to closed vocabularies (`blessing_type` and friends)
/// on card, enemy ability, and event effects.
pub(crate) fn effect_metadata(db: &CrossReferenceDatabase, _tuning: &BalanceTuning) -> Vec<ValidationIssue> {
    let cards = db
        .cards()
        .iter()
        .flat_map(|(id, card)| card.all_effects().map(move |e| ("Card", id, e)));
    let enemies = db.enemies().iter().flat_map(|(id, enemy)| {
        enemy
            .abilities
            .iter()
            .flat_map(|a| a.effects.iter())
            .map(move |e| ("Enemy", id, e))
    });
    let events = db
        .events()
        .iter()
        .flat_map(|(id, event)| event.all_effects().map(move |e| ("Event", id, e)));

    cards
        .chain(enemies)
        .chain(events)
        .filter_map(|(owner, id, effect)| check_metadata(owner, id, effect))
        .collect()
}

fn check_metadata(owner: &str, item_id: &str, effect: &Effect) -> Option<ValidationIssue> {
    let vocabulary = effect.effect_type.metadata_vocabulary()?;
    let value = effect.metadata.get(vocabulary.key())?;
    let text = value.as_str().unwrap_or_default();
    if vocabulary.accepts(text) {
        return None;
    }
    let kind = match vocabulary {
        MetadataVocabulary::Blessing => IssueKind::InvalidBlessingType,
        MetadataVocabulary::Curse => IssueKind::InvalidCurseType,
        MetadataVocabulary::Buff => IssueKind::InvalidBuffType,
        MetadataVocabulary::Debuff => IssueKind::InvalidDebuffType,
    };
    let shown = if text.is_empty() {
        render(value)
    } else {
        text.to_string()
    };
    Some(
        ValidationIssue::new(
            kind,
            format!("{owner} '{item_id}' uses unknown {} '{shown}'", vocabulary.key().replace('_', " ")),
        )
        .for_item(item_id)
        .on_field(format!("metadata.{}", vocabulary.key())),
    )
}

// ===========================================================================
// Keywords
// ===========================================================================

pub(crate) fn keyword_consistency(
    db: &CrossReferenceDatabase,
    _tuning: &BalanceTuning,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (card_id, keywords) in db.all_card_keywords() {
        let gods: Vec<&str> = keywords
            .iter()
            .filter(|kw| kw.is_god())
            .map(|kw| kw.as_str())
            .collect();
        if gods.len() > 1 {
            issues.push(
                ValidationIssue::new(
                    IssueKind::KeywordConsistencyWarning,
                    format!("Card '{card_id}' has multiple god keywords: {}", gods.join(", ")),
                )
                .for_item(card_id),
            );
        }
        for (first, second) in Keyword::CONFLICTING_PAIRS {
            if keywords.contains(&first) && keywords.contains(&second) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::ConflictingKeywords,
                        format!("Card '{card_id}' has conflicting keywords: {first} and {second}"),
                    )
                    .for_item(card_id),
                );
            }
        }
    }
    issues
}

// ===========================================================================
// Progression
// ===========================================================================

/// Every hour needs enemies and events. Hours lacking either are listed
/// together; an hour lacking both also gets its own issue.
pub(crate) fn hour_distribution(
    db: &CrossReferenceDatabase,
    _tuning: &BalanceTuning,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let without_events: Vec<&str> = HourOfNight::ALL
        .iter()
        .filter(|h| db.event_count_at(**h) == 0)
        .map(|h| h.as_str())
        .collect();
    let without_enemies: Vec<&str> = HourOfNight::ALL
        .iter()
        .filter(|h| db.enemy_count_at(**h) == 0)
        .map(|h| h.as_str())
        .collect();

    if !without_events.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::MissingHourContent,
            format!("Hours without events: {}", without_events.join(", ")),
        ));
    }
    if !without_enemies.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::MissingHourContent,
            format!("Hours without enemies: {}", without_enemies.join(", ")),
        ));
    }
    for hour in HourOfNight::ALL {
        if db.event_count_at(*hour) == 0 && db.enemy_count_at(*hour) == 0 {
            issues.push(ValidationIssue::new(
                IssueKind::EmptyHour,
                format!("Hour '{hour}' has no content (enemies or events)"),
            ));
        }
    }
    issues
}

/// Sand-cost gaps in the card pool and per-hour difficulty regressions.
pub(crate) fn progression(db: &CrossReferenceDatabase, tuning: &BalanceTuning) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !db.cards().is_empty() {
        let histogram = cost_histogram(db);
        for (cost, count) in histogram.iter().enumerate() {
            if *count == 0 {
                issues.push(ValidationIssue::new(
                    IssueKind::SandCostGap,
                    format!("No cards with sand cost {cost}; the cost curve has a gap"),
                ));
            }
        }
    }

    let mut previous: Option<(HourOfNight, f64)> = None;
    for hour in HourOfNight::ALL {
        let Some(difficulty) = hour_difficulty(db, *hour, tuning) else {
            continue;
        };
        if let Some((prev_hour, prev)) = previous {
            if difficulty < prev * tuning.difficulty_regression_tolerance {
                issues.push(ValidationIssue::new(
                    IssueKind::DifficultyRegression,
                    format!(
                        "Hour '{hour}' enemies are easier than '{prev_hour}' ({difficulty:.1} < {prev:.1})"
                    ),
                ));
            }
        }
        previous = Some((*hour, difficulty));
    }
    issues
}

/// Card count per sand cost, 0 through the maximum cost.
pub(crate) fn cost_histogram(db: &CrossReferenceDatabase) -> [usize; MAX_SAND_COST as usize + 1] {
    let mut histogram = [0; MAX_SAND_COST as usize + 1];
    for card in db.cards().values() {
        if let Some(slot) = histogram.get_mut(usize::from(card.sand_cost)) {
            *slot += 1;
        }
    }
    histogram
}

/// Mean difficulty of the enemies tagged with `hour`.
pub(crate) fn hour_difficulty(
    db: &CrossReferenceDatabase,
    hour: HourOfNight,
    tuning: &BalanceTuning,
) -> Option<f64> {
    let scores: Vec<f64> = db
        .enemies_at(hour)
        .map(|e| e.difficulty(tuning.difficulty_health_weight, tuning.difficulty_sand_weight))
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}
