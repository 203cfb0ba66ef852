//! Playable cards.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::effect::Effect;
use crate::entity::ContentEntity;
use crate::fields::FieldReader;
use crate::vocab::{CardType, ContentType, EffectType, Keyword, Rarity};

pub const MAX_SAND_COST: u8 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub description: String,
    pub sand_cost: u8,
    pub card_type: CardType,
    pub rarity: Rarity,
    pub effects: Vec<Effect>,
    pub keywords: BTreeSet<Keyword>,
    pub flavor_text: Option<String>,
    pub upgrade_effects: Option<Vec<Effect>>,
    pub exhaust: bool,
    pub ethereal: bool,
    pub innate: bool,
    pub retain: bool,
    pub unplayable: bool,
}

impl Card {
    /// A minimal valid card, for building content in code.
    pub fn new(id: &str, name: &str, sand_cost: u8, card_type: CardType, effects: Vec<Effect>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name}, a card of the desert sands."),
            sand_cost,
            card_type,
            rarity: Rarity::Common,
            effects,
            keywords: BTreeSet::new(),
            flavor_text: None,
            upgrade_effects: None,
            exhaust: false,
            ethereal: false,
            innate: false,
            retain: false,
            unplayable: false,
        }
    }

    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = Keyword>) -> Self {
        self.keywords.extend(keywords);
        self
    }

    /// Declared keywords plus the keyword-equivalent boolean flags.
    pub fn mechanical_keywords(&self) -> BTreeSet<Keyword> {
        with_flags(
            &self.keywords,
            [self.exhaust, self.ethereal, self.innate, self.retain, self.unplayable],
        )
    }

    /// Mutually exclusive keyword pairs present on this card.
    pub fn keyword_conflicts(&self) -> Vec<(Keyword, Keyword)> {
        conflicts(&self.mechanical_keywords())
    }

    /// Sum of all `damage` effect values.
    pub fn total_damage(&self) -> u32 {
        self.effects
            .iter()
            .filter(|e| e.effect_type == EffectType::Damage)
            .map(|e| e.value)
            .sum()
    }

    /// Base and upgrade effects.
    pub fn all_effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects
            .iter()
            .chain(self.upgrade_effects.iter().flatten())
    }
}

impl ContentEntity for Card {
    const CONTENT_TYPE: ContentType = ContentType::Cards;

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let id = r.id();
        let name = r.text("name", 1, 50);
        let description = r.text("description", 10, 200);
        let sand_cost = r.int("sand_cost", 0, i64::from(MAX_SAND_COST));
        let card_type: Option<CardType> = r.required("card_type");
        let rarity: Rarity = r.or_default("rarity");
        let effects = r.required_list("effects", 1, None, Effect::read);
        let keywords: BTreeSet<Keyword> = r.or_default("keywords");
        let flavor_text = r.optional_text("flavor_text", 100);
        let upgrade_effects = r.list_of("upgrade_effects", Effect::read);
        let exhaust = r.or("exhaust", false);
        let ethereal = r.or("ethereal", false);
        let innate = r.or("innate", false);
        let retain = r.or("retain", false);
        let unplayable = r.or("unplayable", false);

        let mechanical = with_flags(&keywords, [exhaust, ethereal, innate, retain, unplayable]);
        for (a, b) in conflicts(&mechanical) {
            r.fail(
                "keywords",
                None,
                format!("cards cannot have both '{a}' and '{b}'"),
            );
        }

        Some(Self {
            id: id?,
            name: name?,
            description: description?,
            sand_cost: u8::try_from(sand_cost?).ok()?,
            card_type: card_type?,
            rarity,
            effects: effects?,
            keywords,
            flavor_text,
            upgrade_effects,
            exhaust,
            ethereal,
            innate,
            retain,
            unplayable,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Flag order: exhaust, ethereal, innate, retain, unplayable.
fn with_flags(keywords: &BTreeSet<Keyword>, flags: [bool; 5]) -> BTreeSet<Keyword> {
    const FLAG_KEYWORDS: [Keyword; 5] = [
        Keyword::Exhaust,
        Keyword::Ethereal,
        Keyword::Innate,
        Keyword::Retain,
        Keyword::Unplayable,
    ];
    let mut all = keywords.clone();
    all.extend(
        flags
            .into_iter()
            .zip(FLAG_KEYWORDS)
            .filter(|(set, _)| *set)
            .map(|(_, kw)| kw),
    );
    all
}

fn conflicts(keywords: &BTreeSet<Keyword>) -> Vec<(Keyword, Keyword)> {
    Keyword::CONFLICTING_PAIRS
        .into_iter()
        .filter(|(a, b)| keywords.contains(a) && keywords.contains(b))
        .collect()
}
