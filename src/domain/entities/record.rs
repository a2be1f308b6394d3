use crate::domain::value_objects::{ClientRef, EntryType, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A production start event, destined for record creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartEntry {
    pub plan_id: String,
    pub start_at: DateTime<Utc>,
    pub operator: String,
    pub equipment: String,
}

/// A production completion event, destined for an update of the start record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub start_record_id: RecordId,
    pub end_at: DateTime<Utc>,
    pub qty: u32,
    pub downtime_min: u32,
    #[serde(default)]
    pub downtime_reason: String,
    /// Optional hint carried along so a queued completion can still render
    /// its plan while offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

/// One submission-shaped event, tagged the same way it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "entryType", rename_all = "camelCase")]
pub enum ReportEntry {
    #[serde(rename = "start")]
    Start(StartEntry),
    #[serde(rename = "complete")]
    Complete(CompletionEntry),
}

impl ReportEntry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            ReportEntry::Start(_) => EntryType::Start,
            ReportEntry::Complete(_) => EntryType::Complete,
        }
    }

    /// Structural validity as required for remote submission. Records failing
    /// this are discarded from the queue instead of retried forever.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ReportEntry::Start(start) => {
                if start.plan_id.trim().is_empty() {
                    return Err("Plan id is required for a start entry".to_string());
                }
                if start.operator.trim().is_empty() {
                    return Err("Operator is required for a start entry".to_string());
                }
                if start.equipment.trim().is_empty() {
                    return Err("Equipment is required for a start entry".to_string());
                }
                Ok(())
            }
            ReportEntry::Complete(done) => {
                if done.start_record_id.as_str().trim().is_empty() {
                    return Err("Start record id is required for a completion".to_string());
                }
                Ok(())
            }
        }
    }

    pub fn start_record_id(&self) -> Option<&RecordId> {
        match self {
            ReportEntry::Complete(done) => Some(&done.start_record_id),
            ReportEntry::Start(_) => None,
        }
    }
}

/// A pending submission owned by the durable queue until the remote service
/// acknowledges it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRecord {
    pub client_ref: ClientRef,
    #[serde(flatten)]
    pub entry: ReportEntry,
}

impl QueuedRecord {
    pub fn new(entry: ReportEntry) -> Self {
        Self {
            client_ref: ClientRef::generate(),
            entry,
        }
    }
}
