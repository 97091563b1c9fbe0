//! Conversion between [`Metadata`] and its stored JSON text.

use serde_json::Value;

use crate::error::{ErrorKind, ThingsError, ThingsResult};
use crate::thing::Metadata;

/// Serialized form of an empty or absent metadata document.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Serializes metadata for storage. Empty documents become `{}`, never `null`.
pub fn encode(metadata: &Metadata) -> ThingsResult<String> {
    if metadata.is_empty() {
        return Ok(EMPTY_DOCUMENT.to_owned());
    }
    serde_json::to_string(metadata).map_err(|err| {
        ThingsError::with_source(ErrorKind::MalformedEntity, "encode metadata", err)
    })
}

/// Parses stored metadata. A stored `null` decodes to an empty document.
pub fn decode(raw: &str) -> ThingsResult<Metadata> {
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        ThingsError::with_source(ErrorKind::MalformedEntity, "decode metadata", err)
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Metadata::new()),
        other => Err(ThingsError::malformed(format!(
            "metadata must be a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
