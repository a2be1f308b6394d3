use crate::application::services::lookup_service::{LookupOption, LookupSelection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LookupOptionResponse {
    pub key: String,
    pub label: String,
}

impl From<LookupOption> for LookupOptionResponse {
    fn from(option: LookupOption) -> Self {
        Self {
            key: option.key,
            label: option.label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupSelectionResponse {
    pub key: String,
    pub label: String,
    /// Field code -> value pairs the form should fill in on selection.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,
}

impl From<LookupSelection> for LookupSelectionResponse {
    fn from(selection: LookupSelection) -> Self {
        Self {
            key: selection.key,
            label: selection.label,
            defaults: selection
                .defaults
                .into_iter()
                .map(|(field, value)| (field.to_string(), value))
                .collect(),
        }
    }
}
