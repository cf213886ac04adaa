//! YAML decoding helpers and the bridge between YAML text and template values.
//!
//! Templates see every value as a [`serde_json::Value`]. YAML documents are read
//! through [`serde_yaml::Value`] first so that non-string scalar keys (`1: x`)
//! still become usable mapping keys.

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Parameters;

/// Decode a YAML document into an arbitrary template value.
///
/// An empty document decodes to `null`.
pub fn yaml_to_value(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    serde_json::to_value(yaml).context("YAML document cannot be represented as a template value")
}

/// Decode a YAML document that must be a mapping.
///
/// Empty documents and `null` yield an empty mapping.
pub fn yaml_to_mapping(text: &str) -> Result<Parameters> {
    match yaml_to_value(text)? {
        Value::Null => Ok(Parameters::new()),
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("expected a YAML mapping, found {}", kind_of(&other))),
    }
}

/// Encode a template value as a YAML document.
pub fn value_to_yaml(value: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

/// Decode a YAML document into a strict record type.
///
/// Records decoded this way are expected to carry `deny_unknown_fields`.
pub fn from_yaml_strict<T: DeserializeOwned>(text: &str) -> Result<T, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Short name of a value's kind, for messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
