//! Record representation and outward serialization.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// A stored record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Identifier field as stored.
pub const INTERNAL_ID_FIELD: &str = "_id";
/// Identifier field as exposed by the API.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";

const DATE_KEY: &str = "$date";

/// Internal timestamp representation: `{"$date": <epoch millis>}`.
#[must_use]
pub fn date_value(at: DateTime<Utc>) -> Value {
    json!({ DATE_KEY: at.timestamp_millis() })
}

/// Read a timestamp in either the internal form or RFC 3339 text.
#[must_use]
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) if map.len() == 1 => map
            .get(DATE_KEY)
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis),
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}

/// Convert a stored record into its API form.
///
/// `_id` becomes a string field `id` and top-level internal timestamps become
/// ISO-8601 text. Applying it to an already serialized record is a no-op.
#[must_use]
pub fn serialize(record: &Document) -> Document {
    let mut out = Document::new();
    for (key, value) in record {
        if key == INTERNAL_ID_FIELD {
            continue;
        }
        out.insert(key.clone(), render_date(value));
    }
    if let Some(id) = record.get(INTERNAL_ID_FIELD) {
        out.insert(ID_FIELD.to_string(), Value::String(id_text(id)));
    }
    out
}

#[must_use]
pub fn serialize_all(records: &[Document]) -> Vec<Document> {
    records.iter().map(serialize).collect()
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn render_date(value: &Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.contains_key(DATE_KEY) => parse_date(value)
            .map_or_else(
                || value.clone(),
                |at| Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
        other => other.clone(),
    }
}

/// Serde adapter storing `DateTime<Utc>` fields in the internal timestamp form.
///
/// Deserialization also accepts RFC 3339 text so serialized records decode.
pub mod date {
    use super::{date_value, parse_date};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
    use serde_json::Value;

    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        date_value(*at).serialize(serializer)
    }

    /// # Errors
    /// Fails when the value is neither an internal timestamp nor RFC 3339 text.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_date(&value).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {value}")))
    }
}
