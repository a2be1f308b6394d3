use crate::domain::entities::lookup::{FieldMapping, LookupFieldConfig};
use crate::domain::value_objects::FieldCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Field definitions fetched from the remote form endpoint, or a static
/// fallback document shaped the same way.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FormSchema {
    #[serde(default)]
    pub properties: HashMap<String, FieldProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<SchemaWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaWarning {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperty {
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupSetting>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, DropDownOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LookupSetting {
    #[serde(default)]
    pub related_app: RelatedApp,
    #[serde(default)]
    pub related_key_field: String,
    /// Entries may be plain strings or objects carrying a field code; both
    /// shapes occur in the wild.
    #[serde(default)]
    pub lookup_picker_fields: Vec<Value>,
    #[serde(default)]
    pub field_mappings: Vec<RawFieldMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelatedApp {
    #[serde(default)]
    pub app: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawFieldMapping {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub related_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DropDownOption {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub index: Value,
}

impl FormSchema {
    pub fn empty_with_warning(message: &str) -> Self {
        Self {
            properties: HashMap::new(),
            warning: Some(SchemaWarning {
                message: message.to_string(),
            }),
        }
    }

    /// Derive the lookup relation serving `field_code`.
    ///
    /// A field is served by the LOOKUP property whose field mappings name it
    /// as a target, not by a property of the same code.
    pub fn lookup_config_for(&self, field_code: &FieldCode) -> Option<LookupFieldConfig> {
        for prop in self.properties.values() {
            if prop.field_type != "LOOKUP" {
                continue;
            }
            let Some(lookup) = prop.lookup.as_ref() else {
                continue;
            };
            if !lookup
                .field_mappings
                .iter()
                .any(|m| m.field == field_code.as_str())
            {
                continue;
            }
            if lookup.related_app.app.is_empty() || lookup.related_key_field.is_empty() {
                continue;
            }

            let related_key_field = FieldCode::new(lookup.related_key_field.clone()).ok()?;
            let picker_fields: Vec<FieldCode> = lookup
                .lookup_picker_fields
                .iter()
                .filter_map(coerce_field_code)
                .collect();
            let field_mappings: Vec<FieldMapping> = lookup
                .field_mappings
                .iter()
                .filter(|m| !m.field.trim().is_empty() && !m.related_field.trim().is_empty())
                .map(|m| {
                    Ok::<_, String>(FieldMapping {
                        field: FieldCode::new(m.field.trim().to_string())?,
                        related_field: FieldCode::new(m.related_field.trim().to_string())?,
                    })
                })
                .filter_map(Result::ok)
                .collect();

            let mut field_set = vec![related_key_field.clone()];
            for code in picker_fields
                .iter()
                .chain(field_mappings.iter().map(|m| &m.related_field))
            {
                if !field_set.contains(code) {
                    field_set.push(code.clone());
                }
            }
            let id_field = FieldCode::new("$id".to_string()).ok()?;
            if !field_set.contains(&id_field) {
                field_set.push(id_field);
            }

            return Some(LookupFieldConfig {
                field_code: field_code.clone(),
                related_app: lookup.related_app.app.clone(),
                related_key_field,
                picker_fields,
                field_mappings,
                field_set,
            });
        }
        None
    }

    /// Option labels of a DROP_DOWN field, ordered by their declared index.
    pub fn dropdown_options(&self, field_code: &FieldCode) -> Vec<String> {
        let Some(prop) = self.properties.get(field_code.as_str()) else {
            return Vec::new();
        };
        if prop.field_type != "DROP_DOWN" {
            return Vec::new();
        }
        let mut options: Vec<(i64, String)> = prop
            .options
            .values()
            .filter(|opt| !opt.label.is_empty())
            .map(|opt| (index_as_i64(&opt.index), opt.label.clone()))
            .collect();
        options.sort_by_key(|(index, _)| *index);
        options.into_iter().map(|(_, label)| label).collect()
    }
}

fn coerce_field_code(value: &Value) -> Option<FieldCode> {
    let raw = match value {
        Value::String(text) => text.trim(),
        Value::Object(map) => map
            .get("field")
            .or_else(|| map.get("code"))
            .or_else(|| map.get("fieldCode"))
            .and_then(Value::as_str)?
            .trim(),
        _ => return None,
    };
    FieldCode::new(raw.to_string()).ok()
}

fn index_as_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(text) => text.parse().unwrap_or(0),
        _ => 0,
    }
}
