use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::backend::Row;
use crate::error::BackendError;

pub mod about;
pub mod contact;
pub mod message;
pub mod project;
pub mod skill;
pub mod stat;

/// Row id used by the single-row tables (about, contact). Upserting on `id`
/// with this value keeps them at exactly one row.
pub const SINGLETON_ID: i64 = 1;

pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T, BackendError> {
    serde_json::from_value(Value::Object(row)).map_err(BackendError::from)
}

pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(decode).collect()
}

/// Decode what can be decoded; a malformed row is logged and skipped so one
/// bad row does not hide the rest.
pub(crate) fn decode_lenient<T: DeserializeOwned>(what: &str, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match decode(row) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("Skipping {} row {}: {}", what, id, e);
                    None
                }
            }
        })
        .collect()
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Row {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Row::new(),
    }
}

/// RFC 3339 UTC with a fixed six fractional digits, so stored timestamps
/// order correctly as text.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(d)
    }
}
