//! Typed schema for Sands of Duat content: cards, enemies, events, decks.
//!
//! Items are built from raw YAML values with [`ContentEntity::from_value`],
//! which reads every field and reports all constraint violations of an item
//! at once as a [`SchemaValidationError`].

pub mod card;
pub mod deck;
pub mod effect;
pub mod enemy;
pub mod entity;
pub mod error;
pub mod event;
pub mod fields;
pub mod manifest;
pub mod vocab;

pub use card::Card;
pub use deck::Deck;
pub use effect::{Effect, Metadata, Requirement};
pub use enemy::{Ability, Enemy, LootTable};
pub use entity::ContentEntity;
pub use error::{FieldError, SchemaValidationError, UnknownVariant};
pub use event::{Event, EventOption};
pub use fields::FieldReader;
pub use manifest::ContentManifest;
pub use vocab::{
    AiPattern, BlessingType, BuffType, CardPool, CardType, ContentType, CurseType, DebuffType,
    EffectType, EventType, HourOfNight, Keyword, MetadataVocabulary, Rarity, TargetType,
};
