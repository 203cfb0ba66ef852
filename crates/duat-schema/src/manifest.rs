//! Content pack manifest (`manifest.yaml` at the content root).

use serde::Serialize;
use serde_yaml_ng::Value;

use crate::error::SchemaValidationError;
use crate::fields::{FieldReader, VERSION_PATTERN};
use crate::vocab::ContentType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: Option<String>,
    pub dependencies: Vec<String>,
    pub cards_count: u32,
    pub enemies_count: u32,
    pub events_count: u32,
    pub decks_count: u32,
}

impl ContentManifest {
    pub const ITEM_ID: &'static str = "manifest";

    pub fn from_value(value: &Value) -> Result<Self, SchemaValidationError> {
        let mut reader = FieldReader::new(value)
            .map_err(|e| SchemaValidationError::new(Self::ITEM_ID, vec![e]))?;
        let parsed = Self::read(&mut reader);
        reader.finish(Self::ITEM_ID, parsed)
    }

    fn read(r: &mut FieldReader<'_>) -> Option<Self> {
        let name = r.text("name", 1, 50);
        let version = r
            .required::<String>("version")
            .and_then(|v| r.pattern("version", v, &VERSION_PATTERN, "must look like 1.2.3"));
        let description = r.text("description", 10, 200);
        let author = r.optional_text("author", 50);
        let dependencies: Vec<String> = r.or_default("dependencies");
        let cards = count(r, "cards_count");
        let enemies = count(r, "enemies_count");
        let events = count(r, "events_count");
        let decks = count(r, "decks_count");

        Some(Self {
            name: name?,
            version: version?,
            description: description?,
            author,
            dependencies,
            cards_count: cards?,
            enemies_count: enemies?,
            events_count: events?,
            decks_count: decks?,
        })
    }

    /// Item count the manifest declares for `content_type`.
    pub fn declared_count(&self, content_type: ContentType) -> u32 {
        match content_type {
            ContentType::Cards => self.cards_count,
            ContentType::Enemies => self.enemies_count,
            ContentType::Events => self.events_count,
            ContentType::Decks => self.decks_count,
        }
    }
}

fn count(r: &mut FieldReader<'_>, field: &str) -> Option<u32> {
    r.int(field, 0, i64::from(u32::MAX))
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest() {
        let value: Value = serde_yaml_ng::from_str(
            "name: Core\nversion: 1.0.0\ndescription: The base content pack.\ncards_count: 3\nenemies_count: 1\nevents_count: 0\ndecks_count: 1\n",
        )
        .unwrap();
        let manifest = ContentManifest::from_value(&value).unwrap();
        assert_eq!(manifest.declared_count(ContentType::Cards), 3);
        assert_eq!(manifest.author, None);
    }

    #[test]
    fn reports_all_manifest_problems() {
        let value: Value =
            serde_yaml_ng::from_str("name: Core\nversion: one\ndescription: short\n").unwrap();
        let err = ContentManifest::from_value(&value).unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "version",
                "description",
                "cards_count",
                "enemies_count",
                "events_count",
                "decks_count"
            ]
        );
    }
}
