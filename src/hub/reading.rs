//! Reading
//!
//! One telemetry sample, kept as an opaque JSON object. The hub never looks
//! inside it; it is shared between every subscriber queue without copying.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::error::{HubError, HubResult};

/// An immutable, schema-less telemetry sample
#[derive(Clone, PartialEq)]
pub struct Reading(Arc<Map<String, Value>>);

impl Reading {
    /// Wrap an already-parsed JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(Arc::new(fields))
    }

    /// Accept any JSON value, rejecting everything that is not an object
    pub fn from_value(value: Value) -> HubResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(HubError::MalformedInput(format!(
                "expected a JSON object, got {}",
                value_kind(&other)
            ))),
        }
    }

    /// Parse a raw request body
    pub fn from_slice(bytes: &[u8]) -> HubResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| HubError::MalformedInput(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Field lookup, for collaborators and tests
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Debug for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reading({})", Value::Object((*self.0).clone()))
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Reading::from_value(value).map_err(serde::de::Error::custom)
    }
}
