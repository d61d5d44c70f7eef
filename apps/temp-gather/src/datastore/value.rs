use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value as JsonValue};

use super::entity::{parse_int64, Entity, Key};

/// A property value as the store types it. Unknown members decode as
/// [`Value::Null`]; payloads that do not parse are kept as [`Value::String`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Key(Key),
    String(String),
    Blob(Vec<u8>),
    GeoPoint { latitude: f64, longitude: f64 },
    Entity(Box<Entity>),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(value) => json!(value),
            Value::Integer(value) => json!(value),
            Value::Double(value) => serde_json::Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(value.to_string())),
            Value::Timestamp(value) => {
                json!(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Key(key) => key.to_json(),
            Value::String(value) => json!(value),
            Value::Blob(bytes) => json!(STANDARD.encode(bytes)),
            Value::GeoPoint {
                latitude,
                longitude,
            } => json!({ "latitude": latitude, "longitude": longitude }),
            Value::Entity(entity) => entity.to_json(),
            Value::Array(values) => {
                JsonValue::Array(values.iter().map(Value::to_json).collect())
            }
        }
    }
}

#[derive(Deserialize)]
struct WireLatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

impl Value {
    // The first recognized member wins. A payload of the wrong JSON type is
    // kept as text.
    fn from_wire(raw: JsonValue) -> Value {
        let mut members = match raw {
            JsonValue::Object(members) => members,
            other => return Value::fallback(other),
        };
        let mut take = |name: &str| members.remove(name).filter(|member| !member.is_null());

        if let Some(raw) = take("booleanValue") {
            return match raw {
                JsonValue::Bool(value) => Value::Boolean(value),
                other => Value::fallback(other),
            };
        }
        if let Some(raw) = take("integerValue") {
            return match parse_int64(&raw) {
                Some(value) => Value::Integer(value),
                None => Value::fallback(raw),
            };
        }
        if let Some(raw) = take("doubleValue") {
            return match raw {
                JsonValue::Number(number) => match number.as_f64() {
                    Some(value) => Value::Double(value),
                    None => Value::String(number.to_string()),
                },
                JsonValue::String(text) => match text.as_str() {
                    "NaN" => Value::Double(f64::NAN),
                    "Infinity" => Value::Double(f64::INFINITY),
                    "-Infinity" => Value::Double(f64::NEG_INFINITY),
                    _ => match text.trim().parse::<f64>() {
                        Ok(value) => Value::Double(value),
                        Err(_) => Value::String(text),
                    },
                },
                other => Value::fallback(other),
            };
        }
        if let Some(raw) = take("timestampValue") {
            return match raw {
                JsonValue::String(text) => match DateTime::parse_from_rfc3339(text.trim()) {
                    Ok(parsed) => Value::Timestamp(parsed.with_timezone(&Utc)),
                    Err(_) => Value::String(text),
                },
                other => Value::fallback(other),
            };
        }
        if let Some(raw) = take("keyValue") {
            return match serde_json::from_value::<Key>(raw.clone()) {
                Ok(key) => Value::Key(key),
                Err(_) => Value::fallback(raw),
            };
        }
        if let Some(raw) = take("stringValue") {
            return Value::fallback(raw);
        }
        if let Some(raw) = take("blobValue") {
            return match raw {
                JsonValue::String(text) => match STANDARD.decode(text.as_bytes()) {
                    Ok(bytes) => Value::Blob(bytes),
                    Err(_) => Value::String(text),
                },
                other => Value::fallback(other),
            };
        }
        if let Some(raw) = take("geoPointValue") {
            return match serde_json::from_value::<WireLatLng>(raw.clone()) {
                Ok(point) => Value::GeoPoint {
                    latitude: point.latitude,
                    longitude: point.longitude,
                },
                Err(_) => Value::fallback(raw),
            };
        }
        if let Some(raw) = take("entityValue") {
            return match serde_json::from_value::<Entity>(raw.clone()) {
                Ok(entity) => Value::Entity(Box::new(entity)),
                Err(_) => Value::fallback(raw),
            };
        }
        if let Some(raw) = take("arrayValue") {
            let mut array = match raw {
                JsonValue::Object(array) => array,
                other => return Value::fallback(other),
            };
            return match array.remove("values") {
                None | Some(JsonValue::Null) => Value::Array(Vec::new()),
                Some(JsonValue::Array(values)) => {
                    Value::Array(values.into_iter().map(Value::from_wire).collect())
                }
                Some(other) => Value::fallback(other),
            };
        }
        Value::Null
    }

    fn fallback(raw: JsonValue) -> Value {
        match raw {
            JsonValue::Null => Value::Null,
            JsonValue::String(text) => Value::String(text),
            other => Value::String(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        JsonValue::deserialize(deserializer).map(Value::from_wire)
    }
}
