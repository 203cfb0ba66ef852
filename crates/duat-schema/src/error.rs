//! Error types for schema construction.

use std::fmt;

/// A value that is not part of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {vocabulary} '{value}'")]
pub struct UnknownVariant {
    pub vocabulary: &'static str,
    pub value: String,
}

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Dotted path to the field, with list indices (`effects[0].value`).
    pub field: String,
    /// The offending value rendered for display, if there was one.
    pub value: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
            message: message.into(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: {} (got {})", self.field, self.message, value),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// All constraint violations found while building one item.
///
/// Construction keeps reading after the first bad field, so `errors` holds
/// every problem in the item.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaValidationError {
    pub item_id: String,
    pub errors: Vec<FieldError>,
}

impl SchemaValidationError {
    pub fn new(item_id: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            item_id: item_id.into(),
            errors,
        }
    }

    /// First field named by the error list, if any.
    pub fn first_field(&self) -> Option<&str> {
        self.errors.first().map(|e| e.field.as_str())
    }
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': ", self.item_id)?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaValidationError {}
