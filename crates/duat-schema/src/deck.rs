//! Deck lists. Card entries are ids resolved later against the card set.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::effect::Requirement;
use crate::entity::ContentEntity;
use crate::fields::FieldReader;
use crate::vocab::{ContentType, Keyword};

pub const MIN_DECK_SIZE: usize = 10;
pub const MAX_DECK_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cards: Vec<String>,
    pub starting_deck: bool,
    pub unlock_requirements: Vec<Requirement>,
    pub themes: BTreeSet<Keyword>,
}

impl Deck {
    pub fn new(id: &str, name: &str, cards: Vec<String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} for the journey into the night."),
            cards,
            starting_deck: false,
            unlock_requirements: Vec::new(),
            themes: BTreeSet::new(),
        }
    }

    /// Distinct card ids in first-seen order.
    pub fn unique_cards(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.cards
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl ContentEntity for Deck {
    const CONTENT_TYPE: ContentType = ContentType::Decks;

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let id = r.id();
        let name = r.text("name", 1, 50);
        let description = r.text("description", 10, 200);
        let cards: Option<Vec<String>> = r.required("cards");
        if let Some(cards) = &cards {
            r.count("cards", cards.len(), MIN_DECK_SIZE, Some(MAX_DECK_SIZE));
        }
        let starting_deck = r.or("starting_deck", false);
        let unlock_requirements: Vec<Requirement> = r.or_default("unlock_requirements");
        let themes: BTreeSet<Keyword> = r.or_default("themes");

        Some(Self {
            id: id?,
            name: name?,
            description: description?,
            cards: cards?,
            starting_deck,
            unlock_requirements,
            themes,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml_ng::Value;

    fn deck_yaml(cards: &[&str]) -> Value {
        let list = cards.join(", ");
        let src = format!(
            "id: pilgrim\nname: Pilgrim\ndescription: A balanced deck for new travelers.\nstarting_deck: true\nthemes: [desert]\ncards: [{list}]\n"
        );
        serde_yaml_ng::from_str(&src).unwrap()
    }

    #[test]
    fn parses_valid_deck() {
        let cards = ["strike"; 6].into_iter().chain(["guard"; 6]).collect::<Vec<_>>();
        let deck = Deck::from_value("pilgrim", &deck_yaml(&cards)).unwrap();
        assert!(deck.starting_deck);
        assert_eq!(deck.cards.len(), 12);
        assert_eq!(deck.unique_cards(), vec!["strike", "guard"]);
        assert!(deck.themes.contains(&Keyword::Desert));
    }

    #[test]
    fn size_limits() {
        let err = Deck::from_value("pilgrim", &deck_yaml(&["strike"; 9])).unwrap_err();
        assert_eq!(err.first_field(), Some("cards"));
        assert!(Deck::from_value("pilgrim", &deck_yaml(&["strike"; 50])).is_ok());
        assert!(Deck::from_value("pilgrim", &deck_yaml(&["strike"; 51])).is_err());
    }
}
