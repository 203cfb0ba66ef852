//! Per-item balance and theme checks. These only ever add warnings.

use std::path::Path;

use duat_schema::{Card, Deck, EffectType, Enemy, Event, Keyword};

use crate::config::BalanceTuning;
use crate::report::{IssueKind, ValidationIssue, ValidationReport};

/// Heuristic checks run on an item after it passed schema construction.
pub(crate) trait ItemLint {
    fn lint(&self, tuning: &BalanceTuning, file: Option<&Path>, report: &mut ValidationReport);
}

fn warn(
    kind: IssueKind,
    item_id: &str,
    file: Option<&Path>,
    message: String,
) -> ValidationIssue {
    ValidationIssue::new(kind, message).for_item(item_id).in_file(file)
}

impl ItemLint for Card {
    fn lint(&self, tuning: &BalanceTuning, file: Option<&Path>, report: &mut ValidationReport) {
        let allowance = u32::from(self.sand_cost).saturating_mul(tuning.damage_per_sand);
        for effect in &self.effects {
            if effect.effect_type == EffectType::Damage && effect.value > allowance {
                report.push(warn(
                    IssueKind::BalanceWarning,
                    &self.id,
                    file,
                    format!(
                        "Card '{}' may be overpowered: {} damage for {} sand",
                        self.id, effect.value, self.sand_cost
                    ),
                ));
            }
        }

        let themed = self
            .keywords
            .iter()
            .any(|kw| Keyword::EGYPTIAN_THEMED.contains(kw));
        let description = self.description.to_lowercase();
        if themed && !description.contains("egypt") && !description.contains("sand") {
            report.push(warn(
                IssueKind::ThemeConsistency,
                &self.id,
                file,
                format!(
                    "Card '{}' has Egyptian keywords but its description does not reflect the theme",
                    self.id
                ),
            ));
        }
    }
}

impl ItemLint for Enemy {
    fn lint(&self, tuning: &BalanceTuning, file: Option<&Path>, report: &mut ValidationReport) {
        let total_cost = self.total_ability_cost();
        let budget = u32::from(self.max_sand).saturating_mul(tuning.ability_cost_sand_factor);
        if total_cost > budget {
            report.push(warn(
                IssueKind::BalanceWarning,
                &self.id,
                file,
                format!(
                    "Enemy '{}' abilities total cost ({total_cost}) may be too high for max sand ({})",
                    self.id, self.max_sand
                ),
            ));
        }

        let ratio = f64::from(self.max_health) / f64::from(self.max_sand);
        if ratio > tuning.max_health_per_sand {
            report.push(warn(
                IssueKind::BalanceWarning,
                &self.id,
                file,
                format!(
                    "Enemy '{}' may be too tanky: {} health / {} sand = {ratio:.1}",
                    self.id, self.max_health, self.max_sand
                ),
            ));
        }
    }
}

impl ItemLint for Event {
    fn lint(&self, _tuning: &BalanceTuning, file: Option<&Path>, report: &mut ValidationReport) {
        if !self.has_open_option() {
            report.push(warn(
                IssueKind::AccessibilityWarning,
                &self.id,
                file,
                format!(
                    "Event '{}' has no option without requirements and may be inaccessible",
                    self.id
                ),
            ));
        }
    }
}

impl ItemLint for Deck {
    fn lint(&self, tuning: &BalanceTuning, file: Option<&Path>, report: &mut ValidationReport) {
        if self.cards.len() < tuning.min_playable_deck_size {
            report.push(warn(
                IssueKind::PlayabilityWarning,
                &self.id,
                file,
                format!(
                    "Deck '{}' may be too small ({} cards) for good gameplay",
                    self.id,
                    self.cards.len()
                ),
            ));
        }
    }
}
