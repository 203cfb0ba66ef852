//! Enemies and their abilities.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::effect::Effect;
use crate::entity::ContentEntity;
use crate::fields::{ABILITY_NAME_PATTERN, FieldReader};
use crate::vocab::{AiPattern, ContentType, HourOfNight, Keyword};

/// An action an enemy can take on its turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ability {
    pub name: String,
    pub sand_cost: u8,
    pub effects: Vec<Effect>,
    pub description: Option<String>,
    pub cooldown: Option<u32>,
    /// AI preference, 1 (lowest) to 10.
    pub priority: u8,
}

impl Ability {
    pub fn new(name: &str, sand_cost: u8, effects: Vec<Effect>) -> Self {
        Self {
            name: name.to_string(),
            sand_cost,
            effects,
            description: None,
            cooldown: None,
            priority: 5,
        }
    }

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let name = r.text("name", 1, 50).and_then(|name| {
            r.pattern(
                "name",
                name,
                &ABILITY_NAME_PATTERN,
                "must start with a letter and contain only letters, numbers, spaces, and hyphens",
            )
        });
        let sand_cost = r.int("sand_cost", 0, 6);
        let effects = r.required_list("effects", 1, None, Effect::read);
        let description = r.optional_text("description", 200);
        let cooldown = r
            .optional::<i64>("cooldown")
            .and_then(|turns| r.bounded("cooldown", turns, 0, i64::from(u32::MAX)));
        let priority = r.int_or("priority", 5, 1, 10);

        Some(Self {
            name: name?,
            sand_cost: u8::try_from(sand_cost?).ok()?,
            effects: effects?,
            description,
            cooldown: cooldown.and_then(|c| u32::try_from(c).ok()),
            priority: u8::try_from(priority?).ok()?,
        })
    }
}

/// Loot drops: either amounts (gold ranges) or item ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LootTable {
    Amounts(Vec<i64>),
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enemy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub health: u32,
    pub max_health: u32,
    pub max_sand: u8,
    pub sand_regen_rate: f64,
    pub ai_pattern: AiPattern,
    pub abilities: Vec<Ability>,
    pub keywords: BTreeSet<Keyword>,
    pub resistances: BTreeMap<String, f64>,
    pub immunities: Vec<String>,
    pub loot: BTreeMap<String, LootTable>,
    pub hour_of_night: Option<HourOfNight>,
}

impl Enemy {
    /// A minimal valid enemy, for building content in code.
    pub fn new(id: &str, name: &str, max_health: u32, max_sand: u8, abilities: Vec<Ability>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} stalks the halls of the Duat."),
            health: max_health,
            max_health,
            max_sand,
            sand_regen_rate: 1.0,
            ai_pattern: AiPattern::Balanced,
            abilities,
            keywords: BTreeSet::new(),
            resistances: BTreeMap::new(),
            immunities: Vec::new(),
            loot: BTreeMap::new(),
            hour_of_night: None,
        }
    }

    pub fn at_hour(mut self, hour: HourOfNight) -> Self {
        self.hour_of_night = Some(hour);
        self
    }

    /// Combined sand cost of every ability.
    pub fn total_ability_cost(&self) -> u32 {
        self.abilities.iter().map(|a| u32::from(a.sand_cost)).sum()
    }

    /// Weighted toughness: `health_weight * max_health + sand_weight * max_sand`.
    pub fn difficulty(&self, health_weight: f64, sand_weight: f64) -> f64 {
        health_weight * f64::from(self.max_health) + sand_weight * f64::from(self.max_sand)
    }
}

impl ContentEntity for Enemy {
    const CONTENT_TYPE: ContentType = ContentType::Enemies;

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let id = r.id();
        let name = r.text("name", 1, 50);
        let description = r.text("description", 10, 200);
        let health = r.int("health", 1, 9999);
        let max_health = r.int("max_health", 1, 9999);
        if let (Some(health), Some(max_health)) = (health, max_health) {
            if health > max_health {
                r.fail(
                    "health",
                    Some(health.to_string()),
                    format!("cannot exceed max_health ({max_health})"),
                );
            }
        }
        let max_sand = r.int("max_sand", 1, 10);
        let sand_regen_rate = match r.raw("sand_regen_rate") {
            Some(_) => r
                .optional::<f64>("sand_regen_rate")
                .and_then(|rate| r.bounded("sand_regen_rate", rate, 0.1, 5.0)),
            None => Some(1.0),
        };
        let ai_pattern: Option<AiPattern> = r.required("ai_pattern");
        let abilities = r.required_list("abilities", 1, None, Ability::read);
        let keywords: BTreeSet<Keyword> = r.or_default("keywords");
        let resistances: BTreeMap<String, f64> = r.or_default("resistances");
        for (damage_type, resistance) in &resistances {
            r.bounded(&format!("resistances.{damage_type}"), *resistance, 0.0, 2.0);
        }
        let immunities: Vec<String> = r.or_default("immunities");
        let loot: BTreeMap<String, LootTable> = r.or_default("loot");
        let hour_of_night: Option<HourOfNight> = r.optional("hour_of_night");

        Some(Self {
            id: id?,
            name: name?,
            description: description?,
            health: u32::try_from(health?).ok()?,
            max_health: u32::try_from(max_health?).ok()?,
            max_sand: u8::try_from(max_sand?).ok()?,
            sand_regen_rate: sand_regen_rate?,
            ai_pattern: ai_pattern?,
            abilities: abilities?,
            keywords,
            resistances,
            immunities,
            loot,
            hour_of_night,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::EffectType;
    use serde_yaml_ng::Value;

    const MUMMY: &str = "
id: tomb_guardian
name: Tomb Guardian
description: A wrapped sentinel of the sealed tomb.
health: 40
max_health: 40
max_sand: 3
ai_pattern: defensive
hour_of_night: second_hour
resistances:
  fire: 1.5
loot:
  gold: [10, 20]
  cards: [ankh_blessing]
abilities:
  - name: Linen Bind
    sand_cost: 2
    effects:
      - effect_type: debuff
        value: 1
        target: player
        metadata:
          debuff_type: weak
";

    fn parse(src: &str) -> Result<Enemy, crate::SchemaValidationError> {
        let value: Value = serde_yaml_ng::from_str(src).unwrap();
        Enemy::from_value("tomb_guardian", &value)
    }

    #[test]
    fn parses_valid_enemy() {
        let enemy = parse(MUMMY).unwrap();
        assert_eq!(enemy.sand_regen_rate, 1.0);
        assert_eq!(enemy.abilities[0].priority, 5);
        assert_eq!(enemy.abilities[0].effects[0].effect_type, EffectType::Debuff);
        assert_eq!(enemy.hour_of_night, Some(HourOfNight::Second));
        assert_eq!(enemy.loot["gold"], LootTable::Amounts(vec![10, 20]));
        assert_eq!(
            enemy.loot["cards"],
            LootTable::Items(vec!["ankh_blessing".to_string()])
        );
        assert_eq!(enemy.difficulty(1.0, 10.0), 70.0);
    }

    #[test]
    fn health_cannot_exceed_max() {
        let err = parse(&MUMMY.replace("\nhealth: 40\n", "\nhealth: 41\n")).unwrap_err();
        assert_eq!(err.first_field(), Some("health"));
    }

    #[test]
    fn resistance_out_of_range() {
        let err = parse(&MUMMY.replace("fire: 1.5", "fire: 2.5")).unwrap_err();
        assert_eq!(err.first_field(), Some("resistances.fire"));
    }

    #[test]
    fn ability_constraints() {
        let src = MUMMY.replace("Linen Bind", "9 Lives");
        let err = parse(&src).unwrap_err();
        assert_eq!(err.first_field(), Some("abilities[0].name"));

        let src = MUMMY.replace("    sand_cost: 2\n", "    sand_cost: 2\n    priority: 0\n");
        let err = parse(&src).unwrap_err();
        assert_eq!(err.first_field(), Some("abilities[0].priority"));
    }

    #[test]
    fn enemy_requires_an_ability() {
        let end = MUMMY.find("abilities:").unwrap();
        let src = format!("{}abilities: []\n", &MUMMY[..end]);
        let err = parse(&src).unwrap_err();
        assert_eq!(err.first_field(), Some("abilities"));
    }

    #[test]
    fn regen_rate_bounds() {
        let src = MUMMY.to_string() + "sand_regen_rate: 0.05\n";
        assert_eq!(parse(&src).unwrap_err().first_field(), Some("sand_regen_rate"));
    }
}
