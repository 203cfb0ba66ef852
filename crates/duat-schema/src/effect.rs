//! Effects and requirement predicates shared by every content type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::fields::FieldReader;
use crate::vocab::{EffectType, TargetType};

/// Free-form effect parameters (`card_id`, `pool`, `blessing_type`, ...).
pub type Metadata = BTreeMap<String, Value>;

/// One effect applied when a card, ability, or event option resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub effect_type: EffectType,
    pub value: u32,
    pub target: TargetType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

impl Effect {
    pub fn new(effect_type: EffectType, value: u32, target: TargetType) -> Self {
        Self {
            effect_type,
            value,
            target,
            metadata: Metadata::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// A metadata entry, if it is a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub(crate) fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let effect_type: Option<EffectType> = r.required("effect_type");
        let value: Option<i64> = r.required("value");
        let target: Option<TargetType> = r.required("target");
        let metadata: Metadata = r.or_default("metadata");
        let conditions: Vec<String> = r.or_default("conditions");

        let ceiling = effect_type
            .and_then(EffectType::value_ceiling)
            .map_or(i64::from(u32::MAX), i64::from);
        let value = value.and_then(|v| r.bounded("value", v, 0, ceiling));

        Some(Self {
            effect_type: effect_type?,
            value: u32::try_from(value?).ok()?,
            target: target?,
            metadata,
            conditions,
        })
    }
}

/// A requirement predicate, e.g. `{type: card_in_deck, card_id: ankh}`.
///
/// Predicates are open-ended; the cross-reference pass interprets the kinds
/// it knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirement(pub BTreeMap<String, Value>);

impl Requirement {
    /// Requires a specific card in the player's deck (`card_id`).
    pub const CARD_IN_DECK: &'static str = "card_in_deck";
    /// Requires any card carrying a keyword (`keyword`).
    pub const CARD_WITH_KEYWORD: &'static str = "card_with_keyword";

    pub fn new(kind: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert("type".to_string(), Value::from(kind));
        Self(map)
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// The predicate kind (`type` entry).
    pub fn kind(&self) -> Option<&str> {
        self.param("type")
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.param_value(key).and_then(Value::as_str)
    }

    /// A parameter of any YAML type.
    pub fn param_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
