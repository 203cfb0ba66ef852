//! Shared fixtures for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. Snippet
//! builders return complete YAML documents (`id:\n  fields...`) that pass
//! schema checks and trigger no heuristic warnings unless noted.

use std::fs;
use std::path::{Path, PathBuf};

use duat_schema::{
    Ability, Card, CardType, ContentType, Deck, Effect, EffectType, Enemy, Event, EventOption,
    EventType, HourOfNight, TargetType,
};

// ===========================================================================
// YAML snippets
// ===========================================================================

/// A skill card with one block effect.
pub fn card_yaml(id: &str, sand_cost: u8) -> String {
    format!(
        "{id}:
  id: {id}
  name: Card {id}
  description: Shape the desert sand into a shield.
  sand_cost: {sand_cost}
  card_type: skill
  effects:
    - effect_type: block
      value: 5
      target: self
"
    )
}

/// An enemy with a single one-cost ability.
pub fn enemy_yaml(id: &str, max_health: u32, max_sand: u8, hour: Option<HourOfNight>) -> String {
    let hour = hour
        .map(|h| format!("  hour_of_night: {h}\n"))
        .unwrap_or_default();
    format!(
        "{id}:
  id: {id}
  name: Enemy {id}
  description: A restless spirit of the underworld.
  health: {max_health}
  max_health: {max_health}
  max_sand: {max_sand}
  ai_pattern: aggressive
{hour}  abilities:
    - name: Claw
      sand_cost: 1
      effects:
        - effect_type: damage
          value: 5
          target: player
"
    )
}

/// A choice event with one unrestricted option.
pub fn event_yaml(id: &str, hour: Option<HourOfNight>) -> String {
    let hour = hour
        .map(|h| format!("  hour_of_night: {h}\n"))
        .unwrap_or_default();
    format!(
        "{id}:
  id: {id}
  name: Event {id}
  description: A traveler meets a stranger beneath the stars.
  event_type: choice
{hour}  options:
    - text: Walk on
      consequences: The stranger fades into the dark.
"
    )
}

/// A deck listing `cards` verbatim.
pub fn deck_yaml(id: &str, cards: &[&str]) -> String {
    format!(
        "{id}:
  id: {id}
  name: Deck {id}
  description: A deck for the long night.
  cards: [{}]
",
        cards.join(", ")
    )
}

// ===========================================================================
// On-disk content packs
// ===========================================================================

/// Writes a content pack under a root directory.
pub struct ContentPackBuilder {
    root: PathBuf,
    files: Vec<(PathBuf, String)>,
}

impl ContentPackBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            files: Vec::new(),
        }
    }

    /// Add a file of `content_type` made of the given snippets.
    pub fn file(mut self, content_type: ContentType, name: &str, snippets: &[String]) -> Self {
        let path = self.root.join(content_type.dir_name()).join(name);
        self.files.push((path, snippets.concat()));
        self
    }

    pub fn cards(self, name: &str, snippets: &[String]) -> Self {
        self.file(ContentType::Cards, name, snippets)
    }

    pub fn enemies(self, name: &str, snippets: &[String]) -> Self {
        self.file(ContentType::Enemies, name, snippets)
    }

    pub fn events(self, name: &str, snippets: &[String]) -> Self {
        self.file(ContentType::Events, name, snippets)
    }

    pub fn decks(self, name: &str, snippets: &[String]) -> Self {
        self.file(ContentType::Decks, name, snippets)
    }

    /// A raw file at `relative` under the root.
    pub fn raw(mut self, relative: &str, contents: &str) -> Self {
        self.files.push((self.root.join(relative), contents.to_string()));
        self
    }

    /// Create every type directory and write all files.
    pub fn write(self) -> PathBuf {
        for content_type in ContentType::ALL {
            fs::create_dir_all(self.root.join(content_type.dir_name())).unwrap();
        }
        for (path, contents) in &self.files {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        self.root
    }
}

// ===========================================================================
// Typed entities
// ===========================================================================

pub fn card(id: &str, sand_cost: u8) -> Card {
    Card::new(
        id,
        &format!("Card {id}"),
        sand_cost,
        CardType::Skill,
        vec![Effect::new(EffectType::Block, 5, TargetType::SelfTarget)],
    )
}

pub fn enemy(id: &str, max_health: u32, max_sand: u8, hour: Option<HourOfNight>) -> Enemy {
    let claw = Ability::new(
        "Claw",
        1,
        vec![Effect::new(EffectType::Damage, 5, TargetType::Player)],
    );
    let mut enemy = Enemy::new(id, &format!("Enemy {id}"), max_health, max_sand, vec![claw]);
    enemy.hour_of_night = hour;
    enemy
}

pub fn event(id: &str, hour: Option<HourOfNight>) -> Event {
    let option = EventOption::new("Walk on", "The stranger fades into the dark.", Vec::new());
    let mut event = Event::new(id, &format!("Event {id}"), EventType::Choice, vec![option]);
    event.hour_of_night = hour;
    event
}

pub fn deck(id: &str, cards: &[&str]) -> Deck {
    Deck::new(
        id,
        &format!("Deck {id}"),
        cards.iter().map(|c| c.to_string()).collect(),
    )
}

/// One enemy and one event at every hour, with difficulty rising by hour.
pub fn full_night() -> (Vec<Enemy>, Vec<Event>) {
    let enemies = HourOfNight::ALL
        .iter()
        .enumerate()
        .map(|(i, hour)| {
            let step = u32::try_from(i).unwrap_or(0);
            enemy(&format!("enemy_{i}"), 20 + 10 * step, 3, Some(*hour))
        })
        .collect();
    let events = HourOfNight::ALL
        .iter()
        .enumerate()
        .map(|(i, hour)| event(&format!("event_{i}"), Some(*hour)))
        .collect();
    (enemies, events)
}

/// Cards covering every sand cost 0..=6.
pub fn full_curve() -> Vec<Card> {
    (0..=6u8).map(|cost| card(&format!("cost_{cost}"), cost)).collect()
}
