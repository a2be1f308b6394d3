use crate::domain::value_objects::FieldCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cached lookup resolution: a canonical key plus the display values
/// fetched for it, keyed by field code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupEntry {
    pub key: String,
    pub values: BTreeMap<String, String>,
}

impl LookupEntry {
    pub fn new(key: String, values: BTreeMap<String, String>) -> Self {
        Self { key, values }
    }
}

/// Mapping from a form field to the related record field that fills it on
/// selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: FieldCode,
    pub related_field: FieldCode,
}

/// Per-field lookup relation, derived from the remote form schema once per
/// schema load and shared by all lookup operations on that field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupFieldConfig {
    pub field_code: FieldCode,
    /// Collection id of the related app the keys resolve against.
    pub related_app: String,
    pub related_key_field: FieldCode,
    /// Display-only candidate fields shown in suggestions.
    pub picker_fields: Vec<FieldCode>,
    pub field_mappings: Vec<FieldMapping>,
    /// Union of fields fetched per related record. Always contains the
    /// related key field and the synthetic `$id`.
    pub field_set: Vec<FieldCode>,
}

impl LookupFieldConfig {
    /// Human label for an entry: picker fields joined with " / ", prefixed by
    /// the key when the display text does not already contain it.
    pub fn display_label(&self, entry: &LookupEntry) -> String {
        if self.picker_fields.is_empty() {
            return entry.key.clone();
        }
        let key_field = self.related_key_field.as_str();
        let parts: Vec<&str> = self
            .picker_fields
            .iter()
            .enumerate()
            .filter_map(|(idx, code)| {
                let value = entry.values.get(code.as_str()).map(String::as_str)?;
                if value.is_empty() {
                    return None;
                }
                if idx > 0 && Some(value) == entry.values.get(key_field).map(String::as_str) {
                    return None;
                }
                Some(value)
            })
            .collect();
        let display = parts.join(" / ");
        if display.is_empty() {
            return entry.key.clone();
        }
        if display.contains(&entry.key) {
            display
        } else {
            format!("{} / {}", entry.key, display)
        }
    }
}
