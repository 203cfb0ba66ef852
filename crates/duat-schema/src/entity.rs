use serde_yaml_ng::Value;

use crate::error::SchemaValidationError;
use crate::fields::FieldReader;
use crate::vocab::ContentType;

/// A typed content item built from a raw YAML mapping.
pub trait ContentEntity: Sized {
    const CONTENT_TYPE: ContentType;

    /// Read every field, recording violations on `reader`. Returns `None`
    /// when a required field could not be produced.
    fn read(reader: &mut FieldReader<'_>) -> Option<Self>;

    fn id(&self) -> &str;

    /// Build the item stored under `key`. The nested `id` must equal `key`.
    fn from_value(key: &str, value: &Value) -> Result<Self, SchemaValidationError> {
        let mut reader =
            FieldReader::new(value).map_err(|e| SchemaValidationError::new(key, vec![e]))?;
        let parsed = Self::read(&mut reader);
        if let Some(Value::String(id)) = reader.raw("id") {
            if id != key {
                reader.fail(
                    "id",
                    Some(format!("'{id}'")),
                    format!("item key '{key}' does not match id '{id}'"),
                );
            }
        }
        reader.finish(key, parsed)
    }
}
