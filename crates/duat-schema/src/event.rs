//! Map events and their choices.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::effect::{Effect, Requirement};
use crate::entity::ContentEntity;
use crate::fields::FieldReader;
use crate::vocab::{ContentType, EventType, HourOfNight};

/// One choice offered by an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOption {
    pub text: String,
    pub effects: Vec<Effect>,
    pub consequences: String,
    pub requirements: Vec<Requirement>,
    pub cost: BTreeMap<String, u32>,
}

impl EventOption {
    pub fn new(text: &str, consequences: &str, effects: Vec<Effect>) -> Self {
        Self {
            text: text.to_string(),
            effects,
            consequences: consequences.to_string(),
            requirements: Vec::new(),
            cost: BTreeMap::new(),
        }
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let text = r.text("text", 5, 100);
        let effects = r.list_of("effects", Effect::read).unwrap_or_default();
        let consequences = r.text("consequences", 5, 200);
        let requirements: Vec<Requirement> = r.or_default("requirements");
        let cost: BTreeMap<String, u32> = r.or_default("cost");

        Some(Self {
            text: text?,
            effects,
            consequences: consequences?,
            requirements,
            cost,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub event_type: EventType,
    pub requirements: Vec<Requirement>,
    pub options: Vec<EventOption>,
    pub hour_of_night: Option<HourOfNight>,
    pub repeatable: bool,
    /// Relative encounter weight, 1 to 100.
    pub weight: u8,
}

impl Event {
    pub fn new(id: &str, name: &str, event_type: EventType, options: Vec<EventOption>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name}: a moment on the night journey through the Duat."),
            event_type,
            requirements: Vec::new(),
            options,
            hour_of_night: None,
            repeatable: false,
            weight: 10,
        }
    }

    pub fn at_hour(mut self, hour: HourOfNight) -> Self {
        self.hour_of_night = Some(hour);
        self
    }

    /// Whether some option can be chosen without meeting any requirement.
    pub fn has_open_option(&self) -> bool {
        self.options.iter().any(|o| o.requirements.is_empty())
    }

    /// Event-level and option-level requirements.
    pub fn all_requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements
            .iter()
            .chain(self.options.iter().flat_map(|o| o.requirements.iter()))
    }

    pub fn all_effects(&self) -> impl Iterator<Item = &Effect> {
        self.options.iter().flat_map(|o| o.effects.iter())
    }
}

impl ContentEntity for Event {
    const CONTENT_TYPE: ContentType = ContentType::Events;

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let id = r.id();
        let name = r.text("name", 1, 50);
        let description = r.text("description", 20, 500);
        let event_type: Option<EventType> = r.required("event_type");
        let requirements: Vec<Requirement> = r.or_default("requirements");
        let options = r.required_list("options", 1, Some(5), EventOption::read);
        let hour_of_night: Option<HourOfNight> = r.optional("hour_of_night");
        let repeatable = r.or("repeatable", false);
        let weight = r.int_or("weight", 10, 1, 100);

        Some(Self {
            id: id?,
            name: name?,
            description: description?,
            event_type: event_type?,
            requirements,
            options: options?,
            hour_of_night,
            repeatable,
            weight: u8::try_from(weight?).ok()?,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}
