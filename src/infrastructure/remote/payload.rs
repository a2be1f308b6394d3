use crate::application::ports::record_gateway::{NativeRecord, RecordIds};
use crate::domain::entities::{
    CompletionEntry, LookupEntry, LookupFieldConfig, QueuedRecord, ReportEntry, StartEntry,
};
use crate::shared::error::AppError;
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A submission payload as it arrives at the service boundary: either records
/// already in the remote service's native field-wrapper shape, or the
/// simplified batch the form layer produces. Anything else is a decode error,
/// never a silent coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPayload {
    Native {
        app: Option<String>,
        records: Vec<NativeRecord>,
        /// True when the payload carried a singleton `record` key; it is
        /// forwarded through the singleton endpoint unchanged.
        single: bool,
    },
    Simplified(Vec<QueuedRecord>),
}

impl SubmissionPayload {
    pub fn decode(raw: &Value) -> Result<Self, AppError> {
        if let Some(native) = try_decode_native(raw) {
            return Ok(native);
        }

        let items = match raw {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => match map.get("records") {
                Some(Value::Array(items)) => items.as_slice(),
                _ => {
                    return Err(AppError::Deserialization(
                        "payload is neither native records nor a simplified batch".to_string(),
                    ));
                }
            },
            _ => {
                return Err(AppError::Deserialization(
                    "payload is neither native records nor a simplified batch".to_string(),
                ));
            }
        };

        if items.is_empty() {
            return Err(AppError::Deserialization(
                "simplified batch contains no records".to_string(),
            ));
        }

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            records.push(decode_simplified_entry(item)?);
        }
        Ok(SubmissionPayload::Simplified(records))
    }
}

fn try_decode_native(raw: &Value) -> Option<SubmissionPayload> {
    let map = raw.as_object()?;
    let app = map.get("app").and_then(Value::as_str).map(str::to_string);

    if let Some(record) = map.get("record") {
        let record = record.as_object().filter(|r| is_native_record(r))?;
        return Some(SubmissionPayload::Native {
            app,
            records: vec![record.clone()],
            single: true,
        });
    }

    if let Some(Value::Array(records)) = map.get("records") {
        let native: Vec<&Map<String, Value>> = records
            .iter()
            .filter_map(Value::as_object)
            .filter(|r| is_native_record(r))
            .collect();
        if native.len() == records.len() && !records.is_empty() {
            return Some(SubmissionPayload::Native {
                app,
                records: native.into_iter().cloned().collect(),
                single: false,
            });
        }
    }

    None
}

fn is_native_record(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.values().all(|value| {
            value
                .as_object()
                .is_some_and(|inner| inner.contains_key("value"))
        })
}

fn decode_simplified_entry(item: &Value) -> Result<QueuedRecord, AppError> {
    let Some(map) = item.as_object() else {
        return Err(AppError::Deserialization(
            "simplified record must be an object".to_string(),
        ));
    };

    // Entry type defaults to "start" when absent, matching the wire format.
    let mut tagged = map.clone();
    tagged
        .entry("entryType".to_string())
        .or_insert_with(|| Value::String("start".to_string()));

    if tagged.contains_key("clientRef") {
        serde_json::from_value::<QueuedRecord>(Value::Object(tagged))
            .map_err(|err| AppError::Deserialization(err.to_string()))
    } else {
        let entry = serde_json::from_value::<ReportEntry>(Value::Object(tagged))
            .map_err(|err| AppError::Deserialization(err.to_string()))?;
        Ok(QueuedRecord::new(entry))
    }
}

/// Fold the remote create/update response into one shape: batch calls answer
/// with `{ids, revisions}`, singleton calls with `{id, revision}`.
pub fn to_record_ids(value: &Value) -> Result<RecordIds, AppError> {
    if let (Some(ids), Some(revisions)) = (value.get("ids"), value.get("revisions")) {
        if let (Some(ids), Some(revisions)) = (string_list(ids), string_list(revisions)) {
            return Ok(RecordIds { ids, revisions });
        }
    }
    if let (Some(Value::String(id)), Some(Value::String(revision))) =
        (value.get("id"), value.get("revision"))
    {
        return Ok(RecordIds {
            ids: vec![id.clone()],
            revisions: vec![revision.clone()],
        });
    }
    Err(AppError::Deserialization(
        "unexpected record service response".to_string(),
    ))
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Some(text.clone()),
            Value::Number(num) => Some(num.to_string()),
            _ => None,
        })
        .collect()
}

fn wire_timestamp(at: &chrono::DateTime<chrono::Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn non_empty_or_dash(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() { "-" } else { trimmed }
}

/// Start entry as a native log record.
pub fn native_from_start(entry: &StartEntry) -> NativeRecord {
    let mut record = Map::new();
    record.insert("plan_id".into(), json!({"value": entry.plan_id.trim()}));
    record.insert("start_at".into(), json!({"value": wire_timestamp(&entry.start_at)}));
    record.insert("end_at".into(), json!({"value": ""}));
    record.insert("quantity".into(), json!({"value": 0}));
    record.insert("downtime_min".into(), json!({"value": 0}));
    record.insert("downtime_reason".into(), json!({"value": ""}));
    record.insert("operator".into(), json!({"value": non_empty_or_dash(&entry.operator)}));
    record.insert("equipment".into(), json!({"value": non_empty_or_dash(&entry.equipment)}));
    record
}

/// Completion entry as the field patch applied to its start record.
pub fn update_patch_from_completion(entry: &CompletionEntry) -> NativeRecord {
    let mut record = Map::new();
    record.insert("end_at".into(), json!({"value": wire_timestamp(&entry.end_at)}));
    record.insert("quantity".into(), json!({"value": entry.qty}));
    record.insert("downtime_min".into(), json!({"value": entry.downtime_min}));
    record.insert("downtime_reason".into(), json!({"value": entry.downtime_reason}));
    record
}

/// Project a raw related record onto the configured field set. Returns None
/// when the record carries no canonical key.
pub fn lookup_entry_from_record(
    config: &LookupFieldConfig,
    record: &Value,
) -> Option<LookupEntry> {
    let map = record.as_object()?;
    let mut values = BTreeMap::new();
    for code in &config.field_set {
        let value = map
            .get(code.as_str())
            .and_then(|field| field.get("value"))
            .map(value_as_display)
            .unwrap_or_default();
        values.insert(code.as_str().to_string(), value);
    }
    let key = values
        .get(config.related_key_field.as_str())
        .cloned()
        .unwrap_or_default();
    if key.is_empty() {
        return None;
    }
    Some(LookupEntry::new(key, values))
}

fn value_as_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(num) => num.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}
