//! Field-by-field reading of raw YAML mappings.
//!
//! [`FieldReader`] decodes one field at a time and records a [`FieldError`]
//! for every missing, mistyped, or out-of-range field instead of stopping at
//! the first one. Entity constructors read all their fields, then hand the
//! collected errors to [`FieldReader::finish`].

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_yaml_ng::{Mapping, Value};

use crate::error::{FieldError, SchemaValidationError};

/// Content ids: lowercase snake_case.
pub static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("id pattern is valid"));

/// Ability names: a letter followed by word characters, spaces, or hyphens.
pub static ABILITY_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][\w\s-]*$").expect("ability name pattern is valid"));

/// Semantic versions (`1.2.3`).
pub static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern is valid"));

/// Placeholder field name for errors about the item as a whole.
pub const ITEM_FIELD: &str = "<item>";

/// Reads typed fields out of a YAML mapping, accumulating errors.
#[derive(Debug)]
pub struct FieldReader<'a> {
    map: &'a Mapping,
    prefix: String,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    /// Start reading a top-level item. Fails if `value` is not a mapping.
    pub fn new(value: &'a Value) -> Result<Self, FieldError> {
        Self::nested(value, String::new())
    }

    fn nested(value: &'a Value, prefix: String) -> Result<Self, FieldError> {
        match value.as_mapping() {
            Some(map) => Ok(Self {
                map,
                prefix,
                errors: Vec::new(),
            }),
            None => {
                let field = if prefix.is_empty() {
                    ITEM_FIELD.to_string()
                } else {
                    prefix
                };
                Err(FieldError::new(field, "expected a mapping of fields").with_value(render(value)))
            }
        }
    }

    /// Full path of `field` relative to the item root.
    pub fn path(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.prefix, field)
        }
    }

    /// The raw value of `field`. Explicit `null` counts as absent.
    pub fn raw(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Record a violation on `field`.
    pub fn fail(&mut self, field: &str, value: Option<String>, message: impl Into<String>) {
        let mut error = FieldError::new(self.path(field), message);
        error.value = value;
        self.errors.push(error);
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    /// Decode a field that must be present.
    pub fn required<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        match self.raw(field) {
            Some(value) => self.decode(field, value),
            None => {
                self.fail(field, None, "field is required");
                None
            }
        }
    }

    /// Decode a field that may be absent. A present but malformed value is
    /// still an error.
    pub fn optional<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let value = self.raw(field)?;
        self.decode(field, value)
    }

    pub fn or_default<T: DeserializeOwned + Default>(&mut self, field: &str) -> T {
        self.optional(field).unwrap_or_default()
    }

    pub fn or<T: DeserializeOwned>(&mut self, field: &str, default: T) -> T {
        self.optional(field).unwrap_or(default)
    }

    fn decode<T: DeserializeOwned>(&mut self, field: &str, value: &Value) -> Option<T> {
        match serde_yaml_ng::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                self.fail(field, Some(render(value)), e.to_string());
                None
            }
        }
    }

    /// Required id matching [`ID_PATTERN`].
    pub fn id(&mut self) -> Option<String> {
        let id: String = self.required("id")?;
        self.pattern("id", id, &ID_PATTERN, "must be lowercase snake_case")
    }

    /// Required string whose length in characters lies in `min..=max`.
    pub fn text(&mut self, field: &str, min: usize, max: usize) -> Option<String> {
        let text: String = self.required(field)?;
        self.length(field, text, min, max)
    }

    /// Optional string of at most `max` characters.
    pub fn optional_text(&mut self, field: &str, max: usize) -> Option<String> {
        let text: String = self.optional(field)?;
        self.length(field, text, 0, max)
    }

    /// Required integer in `min..=max`.
    pub fn int(&mut self, field: &str, min: i64, max: i64) -> Option<i64> {
        let value: i64 = self.required(field)?;
        self.bounded(field, value, min, max)
    }

    /// Integer in `min..=max`, `default` when absent.
    pub fn int_or(&mut self, field: &str, default: i64, min: i64, max: i64) -> Option<i64> {
        if self.raw(field).is_none() {
            return Some(default);
        }
        let value: i64 = self.optional(field)?;
        self.bounded(field, value, min, max)
    }

    /// Read a list of nested mappings, parsing each with `parse`. Errors from
    /// entries are recorded under `field[i].`. Returns `None` when absent.
    pub fn list_of<T>(
        &mut self,
        field: &str,
        parse: impl Fn(&mut FieldReader<'a>) -> Option<T>,
    ) -> Option<Vec<T>> {
        let value = self.raw(field)?;
        let Some(entries) = value.as_sequence() else {
            self.fail(field, Some(render(value)), "expected a list");
            return None;
        };
        let base = self.path(field);
        let mut parsed = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match FieldReader::nested(entry, format!("{base}[{i}]")) {
                Ok(mut child) => {
                    if let Some(item) = parse(&mut child) {
                        parsed.push(item);
                    }
                    self.errors.append(&mut child.errors);
                }
                Err(e) => self.errors.push(e),
            }
        }
        Some(parsed)
    }

    /// Like [`list_of`](Self::list_of) but the list must be present and hold
    /// at least `min` entries, and at most `max` when given.
    pub fn required_list<T>(
        &mut self,
        field: &str,
        min: usize,
        max: Option<usize>,
        parse: impl Fn(&mut FieldReader<'a>) -> Option<T>,
    ) -> Option<Vec<T>> {
        if self.raw(field).is_none() {
            self.fail(field, None, "field is required");
            return None;
        }
        let list = self.list_of(field, parse)?;
        self.count(field, list.len(), min, max);
        Some(list)
    }

    // -----------------------------------------------------------------------
    // Constraints
    // -----------------------------------------------------------------------

    /// Keep `value` if it lies in `min..=max`. NaN is rejected.
    pub fn bounded<N>(&mut self, field: &str, value: N, min: N, max: N) -> Option<N>
    where
        N: PartialOrd + Display,
    {
        if min <= value && value <= max {
            Some(value)
        } else {
            self.fail(
                field,
                Some(value.to_string()),
                format!("must be between {min} and {max}"),
            );
            None
        }
    }

    pub fn length(&mut self, field: &str, text: String, min: usize, max: usize) -> Option<String> {
        let len = text.chars().count();
        if len < min || len > max {
            let message = if min == 0 {
                format!("must be at most {max} characters")
            } else {
                format!("must be between {min} and {max} characters")
            };
            self.fail(field, Some(format!("{len} characters")), message);
            return None;
        }
        Some(text)
    }

    pub fn pattern(
        &mut self,
        field: &str,
        text: String,
        pattern: &Regex,
        expectation: &str,
    ) -> Option<String> {
        if pattern.is_match(&text) {
            Some(text)
        } else {
            self.fail(field, Some(format!("'{text}'")), expectation);
            None
        }
    }

    /// Check a list length against `min` and an optional `max`.
    pub fn count(&mut self, field: &str, len: usize, min: usize, max: Option<usize>) -> bool {
        let ok = len >= min && max.is_none_or(|max| len <= max);
        if !ok {
            let message = match max {
                Some(max) => format!("must contain between {min} and {max} entries"),
                None => format!("must contain at least {min} entries"),
            };
            self.fail(field, Some(format!("{len} entries")), message);
        }
        ok
    }

    /// Turn the reader into a result for item `item_id`.
    pub fn finish<T>(self, item_id: &str, parsed: Option<T>) -> Result<T, SchemaValidationError> {
        match parsed {
            Some(item) if self.errors.is_empty() => Ok(item),
            Some(_) => Err(SchemaValidationError::new(item_id, self.errors)),
            None if self.errors.is_empty() => Err(SchemaValidationError::new(
                item_id,
                vec![FieldError::new(ITEM_FIELD, "item could not be constructed")],
            )),
            None => Err(SchemaValidationError::new(item_id, self.errors)),
        }
    }
}

/// Short human rendering of a raw value for error messages.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Sequence(seq) => format!("a list of {} entries", seq.len()),
        Value::Mapping(map) => format!("a mapping of {} fields", map.len()),
        Value::Tagged(tagged) => format!("a value tagged {}", tagged.tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml_ng::from_str(src).unwrap()
    }

    #[test]
    fn collects_every_bad_field() {
        let value = yaml("name: ''\nsand_cost: 9\n");
        let mut r = FieldReader::new(&value).unwrap();
        assert!(r.text("name", 1, 50).is_none());
        assert!(r.int("sand_cost", 0, 6).is_none());
        assert!(r.required::<String>("description").is_none());

        let fields: Vec<_> = r.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "sand_cost", "description"]);
        assert_eq!(r.errors()[1].value.as_deref(), Some("9"));
    }

    #[test]
    fn null_counts_as_absent() {
        let value = yaml("flavor_text: null\n");
        let mut r = FieldReader::new(&value).unwrap();
        assert_eq!(r.optional_text("flavor_text", 100), None);
        assert!(!r.has_errors());
    }

    #[test]
    fn int_or_uses_default_only_when_absent() {
        let value = yaml("priority: 11\n");
        let mut r = FieldReader::new(&value).unwrap();
        assert_eq!(r.int_or("weight", 10, 1, 100), Some(10));
        assert_eq!(r.int_or("priority", 5, 1, 10), None);
        assert_eq!(r.errors().len(), 1);
    }

    #[test]
    fn nested_list_errors_carry_index_paths() {
        let value = yaml("effects:\n  - value: 3\n  - 7\n");
        let mut r = FieldReader::new(&value).unwrap();
        let parsed = r.list_of("effects", |child| child.int("value", 0, 10));
        assert_eq!(parsed, Some(vec![3]));
        assert_eq!(r.errors().len(), 1);
        assert_eq!(r.errors()[0].field, "effects[1]");
    }

    #[test]
    fn required_list_enforces_minimum() {
        let value = yaml("effects: []\n");
        let mut r = FieldReader::new(&value).unwrap();
        let parsed = r.required_list("effects", 1, None, |child| child.int("value", 0, 10));
        assert_eq!(parsed, Some(vec![]));
        assert_eq!(r.errors()[0].message, "must contain at least 1 entries");
    }

    #[test]
    fn bounded_rejects_nan() {
        let value = yaml("{}");
        let mut r = FieldReader::new(&value).unwrap();
        assert_eq!(r.bounded("rate", f64::NAN, 0.1, 5.0), None);
        assert_eq!(r.bounded("rate", 0.1, 0.1, 5.0), Some(0.1));
    }

    #[test]
    fn non_mapping_item_is_rejected() {
        let value = yaml("- 1\n- 2\n");
        let err = FieldReader::new(&value).unwrap_err();
        assert_eq!(err.field, ITEM_FIELD);
        assert_eq!(err.value.as_deref(), Some("a list of 2 entries"));
    }

    #[test]
    fn patterns() {
        assert!(ID_PATTERN.is_match("fire_ball"));
        assert!(!ID_PATTERN.is_match("FireBall"));
        assert!(!ID_PATTERN.is_match("1st"));
        assert!(ABILITY_NAME_PATTERN.is_match("Sand Blast-2"));
        assert!(!ABILITY_NAME_PATTERN.is_match("-dash"));
        assert!(VERSION_PATTERN.is_match("1.0.12"));
    }
}
