use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;

use super::value::Value;

/// A stored document, kept exactly as the store sent it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub key: Option<Key>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }

    pub fn kind(&self) -> Option<&str> {
        self.key.as_ref().and_then(Key::kind)
    }

    pub fn to_json(&self) -> JsonValue {
        let properties: JsonMap<String, JsonValue> = self
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        json!({
            "key": self.key.as_ref().map(Key::to_json),
            "properties": properties,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionId {
    #[serde(default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    #[serde(default)]
    pub partition_id: Option<PartitionId>,
    #[serde(default)]
    pub path: Vec<PathElement>,
}

impl Key {
    pub fn kind(&self) -> Option<&str> {
        self.path.last().map(|element| element.kind.as_str())
    }

    pub fn id(&self) -> Option<i64> {
        self.path.last().and_then(|element| element.id)
    }

    pub fn name(&self) -> Option<&str> {
        self.path.last().and_then(|element| element.name.as_deref())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.partition_id
            .as_ref()
            .and_then(|partition| partition.namespace_id.as_deref())
            .filter(|namespace| !namespace.is_empty())
    }

    pub fn to_json(&self) -> JsonValue {
        let path: Vec<JsonValue> = self
            .path
            .iter()
            .map(|element| {
                let mut out = JsonMap::new();
                out.insert("kind".to_string(), json!(element.kind));
                if let Some(id) = element.id {
                    out.insert("id".to_string(), json!(id));
                }
                if let Some(name) = &element.name {
                    out.insert("name".to_string(), json!(name));
                }
                JsonValue::Object(out)
            })
            .collect();
        json!({
            "namespace": self.namespace(),
            "path": path,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PathElement {
    #[serde(default)]
    pub kind: String,
    #[serde(default, deserialize_with = "deserialize_int64")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

// int64 fields travel as decimal strings in the JSON mapping.
pub(crate) fn parse_int64(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(number) => number.as_i64(),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_int64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_int64))
}
