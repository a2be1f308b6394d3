use crate::application::services::sync_service::SubmitOutcome;
use crate::domain::entities::{CompletionEntry, OpenWorkItem, ReportEntry, StartEntry};
use crate::domain::value_objects::RecordId;
use crate::presentation::dto::Validate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRecordRequest {
    /// "start" or "complete"; absent means "start".
    pub entry_type: Option<String>,
    pub plan_id: Option<String>,
    pub start_at: Option<String>,
    pub operator: Option<String>,
    pub equipment: Option<String>,
    pub start_record_id: Option<String>,
    pub end_at: Option<String>,
    pub qty: Option<i64>,
    pub downtime_min: Option<i64>,
    pub downtime_reason: Option<String>,
}

impl SubmitRecordRequest {
    fn entry_type(&self) -> &str {
        match self.entry_type.as_deref() {
            Some("complete") => "complete",
            _ => "start",
        }
    }

    fn field(&self, value: &Option<String>) -> String {
        value.as_deref().unwrap_or("").trim().to_string()
    }

    fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| format!("Invalid timestamp: {value}"))
    }

    pub fn into_entry(self) -> Result<ReportEntry, String> {
        self.validate()?;
        if self.entry_type() == "complete" {
            let start_record_id = RecordId::new(self.field(&self.start_record_id))?;
            let end_at = Self::parse_time(&self.field(&self.end_at))?;
            Ok(ReportEntry::Complete(CompletionEntry {
                start_record_id,
                end_at,
                qty: self.qty.unwrap_or(0) as u32,
                downtime_min: self.downtime_min.unwrap_or(0) as u32,
                downtime_reason: self.field(&self.downtime_reason),
                plan_id: {
                    let plan = self.field(&self.plan_id);
                    if plan.is_empty() { None } else { Some(plan) }
                },
            }))
        } else {
            Ok(ReportEntry::Start(StartEntry {
                plan_id: self.field(&self.plan_id),
                start_at: Self::parse_time(&self.field(&self.start_at))?,
                operator: self.field(&self.operator),
                equipment: self.field(&self.equipment),
            }))
        }
    }
}

impl Validate for SubmitRecordRequest {
    fn validate(&self) -> Result<(), String> {
        if self.entry_type() == "start" {
            if self.field(&self.plan_id).is_empty() {
                return Err("Plan id is required".to_string());
            }
            if self.field(&self.start_at).is_empty() {
                return Err("Start time is required".to_string());
            }
            if self.field(&self.operator).is_empty() {
                return Err("Operator is required".to_string());
            }
            if self.field(&self.equipment).is_empty() {
                return Err("Equipment is required".to_string());
            }
        } else {
            if self.field(&self.start_record_id).is_empty() {
                return Err("Select the start report to complete".to_string());
            }
            if self.field(&self.end_at).is_empty() {
                return Err("End time is required".to_string());
            }
            if self.qty.unwrap_or(0) < 0 {
                return Err("Quantity must be zero or more".to_string());
            }
            if self.downtime_min.unwrap_or(0) < 0 {
                return Err("Downtime must be zero or more".to_string());
            }
        }

        let start = self.field(&self.start_at);
        let end = self.field(&self.end_at);
        if !start.is_empty() && !end.is_empty() {
            let start = Self::parse_time(&start)?;
            let end = Self::parse_time(&end)?;
            if start > end {
                return Err("End time must not precede the start time".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcomeResponse {
    /// "delivered", "queued" or "rejected".
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<SubmitOutcome> for SubmitOutcomeResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Delivered { created, message } => Self {
                status: "delivered".into(),
                message,
                created_ids: created,
                hint: None,
            },
            SubmitOutcome::QueuedForRetry { message, .. } => Self {
                status: "queued".into(),
                message,
                created_ids: Vec::new(),
                hint: None,
            },
            SubmitOutcome::Rejected { message, hint, .. } => Self {
                status: "rejected".into(),
                message,
                created_ids: Vec::new(),
                hint,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenWorkItemResponse {
    pub record_id: String,
    pub plan_id: String,
    pub start_at: Option<String>,
    pub operator: String,
    pub equipment: String,
    pub pending_completion: bool,
}

impl From<OpenWorkItem> for OpenWorkItemResponse {
    fn from(item: OpenWorkItem) -> Self {
        Self {
            record_id: item.record_id.to_string(),
            plan_id: item.plan_id,
            start_at: item.start_at.map(|dt| dt.to_rfc3339()),
            operator: item.operator,
            equipment: item.equipment,
            pending_completion: item.pending_completion,
        }
    }
}
