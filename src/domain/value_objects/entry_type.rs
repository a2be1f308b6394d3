use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Start,
    Complete,
}

impl EntryType {
    pub fn as_str(&self) -> &str {
        match self {
            EntryType::Start => "start",
            EntryType::Complete => "complete",
        }
    }
}

impl From<&str> for EntryType {
    fn from(value: &str) -> Self {
        match value {
            "complete" => EntryType::Complete,
            _ => EntryType::Start,
        }
    }
}
