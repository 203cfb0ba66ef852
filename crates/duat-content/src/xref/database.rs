//! Immutable cross-reference index over one generation of content.

use std::collections::{BTreeMap, BTreeSet};

use duat_schema::{Card, Deck, EffectType, Enemy, Event, HourOfNight, Keyword};

/// Builder for constructing an immutable [`CrossReferenceDatabase`].
///
/// Entities are registered first; forward and reverse indices are derived in
/// one pass by [`DatabaseBuilder::build`]. The first entity registered under
/// an id wins.
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    generation: u64,
    cards: BTreeMap<String, Card>,
    enemies: BTreeMap<String, Enemy>,
    events: BTreeMap<String, Event>,
    decks: BTreeMap<String, Deck>,
}

impl DatabaseBuilder {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Register a card. Returns false if the id was already taken.
    pub fn add_card(&mut self, card: Card) -> bool {
        insert_first(&mut self.cards, card.id.clone(), card)
    }

    pub fn add_enemy(&mut self, enemy: Enemy) -> bool {
        insert_first(&mut self.enemies, enemy.id.clone(), enemy)
    }

    pub fn add_event(&mut self, event: Event) -> bool {
        insert_first(&mut self.events, event.id.clone(), event)
    }

    pub fn add_deck(&mut self, deck: Deck) -> bool {
        insert_first(&mut self.decks, deck.id.clone(), deck)
    }

    /// Derive every index and freeze the database.
    pub fn build(self) -> CrossReferenceDatabase {
        let mut db = CrossReferenceDatabase {
            generation: self.generation,
            ..CrossReferenceDatabase::default()
        };

        for (id, card) in &self.cards {
            let keywords = card.mechanical_keywords();
            for keyword in &keywords {
                db.cards_by_keyword.entry(*keyword).or_default().insert(id.clone());
            }
            let effects: BTreeSet<EffectType> = card.all_effects().map(|e| e.effect_type).collect();
            for effect in &effects {
                db.cards_by_effect.entry(*effect).or_default().insert(id.clone());
            }
            db.card_keywords.insert(id.clone(), keywords);
            db.card_effects.insert(id.clone(), effects);
        }

        for (id, enemy) in &self.enemies {
            db.enemy_abilities.insert(
                id.clone(),
                enemy.abilities.iter().map(|a| a.name.clone()).collect(),
            );
            if let Some(hour) = enemy.hour_of_night {
                db.enemies_by_hour.entry(hour).or_default().insert(id.clone());
            }
        }

        for (id, event) in &self.events {
            if let Some(hour) = event.hour_of_night {
                db.events_by_hour.entry(hour).or_default().insert(id.clone());
            }
        }

        for (id, deck) in &self.decks {
            db.deck_cards.insert(id.clone(), deck.cards.clone());
        }

        db.cards = self.cards;
        db.enemies = self.enemies;
        db.events = self.events;
        db.decks = self.decks;
        db
    }
}

fn insert_first<T>(map: &mut BTreeMap<String, T>, id: String, value: T) -> bool {
    if map.contains_key(&id) {
        return false;
    }
    map.insert(id, value);
    true
}

/// All validated entities of one rebuild, with forward and reverse indices.
///
/// Never mutated after [`DatabaseBuilder::build`]; a newer generation
/// replaces it wholesale.
#[derive(Debug, Default)]
pub struct CrossReferenceDatabase {
    generation: u64,
    cards: BTreeMap<String, Card>,
    enemies: BTreeMap<String, Enemy>,
    events: BTreeMap<String, Event>,
    decks: BTreeMap<String, Deck>,

    // Forward
    card_keywords: BTreeMap<String, BTreeSet<Keyword>>,
    card_effects: BTreeMap<String, BTreeSet<EffectType>>,
    enemy_abilities: BTreeMap<String, Vec<String>>,
    deck_cards: BTreeMap<String, Vec<String>>,

    // Reverse
    cards_by_keyword: BTreeMap<Keyword, BTreeSet<String>>,
    cards_by_effect: BTreeMap<EffectType, BTreeSet<String>>,
    events_by_hour: BTreeMap<HourOfNight, BTreeSet<String>>,
    enemies_by_hour: BTreeMap<HourOfNight, BTreeSet<String>>,
}

impl CrossReferenceDatabase {
    /// Rebuild number this database was published as. Zero for the empty
    /// database that exists before the first population.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cards(&self) -> &BTreeMap<String, Card> {
        &self.cards
    }

    pub fn enemies(&self) -> &BTreeMap<String, Enemy> {
        &self.enemies
    }

    pub fn events(&self) -> &BTreeMap<String, Event> {
        &self.events
    }

    pub fn decks(&self) -> &BTreeMap<String, Deck> {
        &self.decks
    }

    pub fn has_card(&self, id: &str) -> bool {
        self.cards.contains_key(id)
    }

    pub fn has_enemy(&self, id: &str) -> bool {
        self.enemies.contains_key(id)
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&Enemy> {
        self.enemies.get(id)
    }

    /// Keywords of a card, boolean flags included.
    pub fn card_keywords(&self, id: &str) -> Option<&BTreeSet<Keyword>> {
        self.card_keywords.get(id)
    }

    pub fn card_effects(&self, id: &str) -> Option<&BTreeSet<EffectType>> {
        self.card_effects.get(id)
    }

    pub fn enemy_abilities(&self, id: &str) -> Option<&[String]> {
        self.enemy_abilities.get(id).map(Vec::as_slice)
    }

    pub fn deck_cards(&self, id: &str) -> Option<&[String]> {
        self.deck_cards.get(id).map(Vec::as_slice)
    }

    pub(crate) fn all_card_keywords(&self) -> &BTreeMap<String, BTreeSet<Keyword>> {
        &self.card_keywords
    }

    pub fn cards_with_keyword(&self, keyword: Keyword) -> impl Iterator<Item = &str> {
        self.cards_by_keyword
            .get(&keyword)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn cards_with_effect(&self, effect: EffectType) -> impl Iterator<Item = &str> {
        self.cards_by_effect
            .get(&effect)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn enemies_at(&self, hour: HourOfNight) -> impl Iterator<Item = &Enemy> {
        self.enemies_by_hour
            .get(&hour)
            .into_iter()
            .flatten()
            .filter_map(|id| self.enemies.get(id))
    }

    pub fn events_at(&self, hour: HourOfNight) -> impl Iterator<Item = &Event> {
        self.events_by_hour
            .get(&hour)
            .into_iter()
            .flatten()
            .filter_map(|id| self.events.get(id))
    }

    pub fn enemy_count_at(&self, hour: HourOfNight) -> usize {
        self.enemies_by_hour.get(&hour).map_or(0, BTreeSet::len)
    }

    pub fn event_count_at(&self, hour: HourOfNight) -> usize {
        self.events_by_hour.get(&hour).map_or(0, BTreeSet::len)
    }

    pub fn keyword_usage(&self, keyword: Keyword) -> usize {
        self.cards_by_keyword.get(&keyword).map_or(0, BTreeSet::len)
    }

    pub fn effect_usage(&self, effect: EffectType) -> usize {
        self.cards_by_effect.get(&effect).map_or(0, BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
            && self.enemies.is_empty()
            && self.events.is_empty()
            && self.decks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{card, deck, enemy, event};

    fn sample() -> CrossReferenceDatabase {
        let mut builder = DatabaseBuilder::new(3);
        let mut strike = card("strike", 1).with_keywords([Keyword::Anubis]);
        strike.exhaust = true;
        builder.add_card(strike);
        builder.add_card(card("guard", 1));
        builder.add_enemy(enemy("jackal", 30, 3, Some(HourOfNight::First)));
        builder.add_enemy(enemy("wanderer", 30, 3, None));
        builder.add_event(event("oasis", Some(HourOfNight::Third)));
        builder.add_deck(deck("starter", &["strike", "guard"]));
        builder.build()
    }

    #[test]
    fn forward_indices() {
        let db = sample();
        assert_eq!(db.generation(), 3);
        let keywords = db.card_keywords("strike").unwrap();
        assert!(keywords.contains(&Keyword::Anubis));
        assert!(keywords.contains(&Keyword::Exhaust));
        assert!(db.card_effects("guard").unwrap().contains(&EffectType::Block));
        assert_eq!(db.enemy_abilities("jackal").unwrap(), ["Claw".to_string()]);
        assert_eq!(db.deck_cards("starter").unwrap().len(), 2);
    }

    #[test]
    fn reverse_indices() {
        let db = sample();
        assert_eq!(db.cards_with_keyword(Keyword::Exhaust).collect::<Vec<_>>(), ["strike"]);
        assert_eq!(db.cards_with_effect(EffectType::Block).count(), 2);
        assert_eq!(db.enemy_count_at(HourOfNight::First), 1);
        assert_eq!(db.enemy_count_at(HourOfNight::Second), 0);
        assert_eq!(db.event_count_at(HourOfNight::Third), 1);
        assert_eq!(db.enemies_at(HourOfNight::First).next().unwrap().id, "jackal");
        assert_eq!(db.keyword_usage(Keyword::Retain), 0);
    }

    #[test]
    fn first_registration_wins() {
        let mut builder = DatabaseBuilder::new(1);
        assert!(builder.add_card(card("strike", 1)));
        assert!(!builder.add_card(card("strike", 5)));
        let db = builder.build();
        assert_eq!(db.card("strike").unwrap().sand_cost, 1);
        assert_eq!(db.cards().len(), 1);
    }

    #[test]
    fn default_is_empty_generation_zero() {
        let db = CrossReferenceDatabase::default();
        assert!(db.is_empty());
        assert_eq!(db.generation(), 0);
        assert!(!db.has_card("strike"));
    }
}
