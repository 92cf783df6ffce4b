//! Tagged success/failure wrapper stored under a correlation key.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Response envelope written by the registry and consumed by the bridge.
///
/// Wire shape: `{"ok": true, "result": ...}` or `{"ok": false, "message": "..."}`.
/// Decoding branches on the `ok` tag only, never on which other fields are present.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(String),
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn success(result: T) -> Self {
        Self::Success(result)
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts the envelope into a `Result`, carrying the failure message as `Err`.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success(result) => Ok(result),
            Self::Failure(message) => Err(message),
        }
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Validates a raw stored value and decodes it into an envelope.
    ///
    /// A missing `result` on a success envelope decodes as JSON `null`.
    pub fn decode(raw: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = raw else {
            return Err(format!(
                "expected an object envelope, got {}",
                value_type_name(&raw)
            ));
        };

        match fields.get("ok") {
            Some(Value::Bool(true)) => {
                let result = fields.remove("result").unwrap_or(Value::Null);
                serde_json::from_value::<T>(result)
                    .map(Self::Success)
                    .map_err(|error| format!("result does not match expected shape: {error}"))
            }
            Some(Value::Bool(false)) => match fields.remove("message") {
                Some(Value::String(message)) => Ok(Self::Failure(message)),
                Some(other) => Err(format!(
                    "failure message must be a string, got {}",
                    value_type_name(&other)
                )),
                None => Err("failure envelope is missing 'message'".to_string()),
            },
            Some(other) => Err(format!(
                "'ok' tag must be a boolean, got {}",
                value_type_name(other)
            )),
            None => Err("envelope is missing the 'ok' tag".to_string()),
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serializes the envelope into its stored JSON shape.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Success(result) => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("result", result)?;
            }
            Self::Failure(message) => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("message", message)?;
            }
        }
        map.end()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::decode(raw).map_err(D::Error::custom)
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
