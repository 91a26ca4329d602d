//! Lenient string fields: clients send ids and values as strings or numbers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strings pass through untouched; every other JSON value becomes its JSON text.
pub(crate) fn text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Like [`text`], but an explicit `null` counts as absent.
pub(crate) fn optional_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
