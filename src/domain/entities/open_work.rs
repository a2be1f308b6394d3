use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A started-but-uncompleted unit of work, mirrored from the remote listing.
///
/// `pending_completion` is local-only state: it marks a completion that is in
/// flight or queued, and the server never reflects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenWorkItem {
    pub record_id: RecordId,
    pub plan_id: String,
    pub start_at: Option<DateTime<Utc>>,
    pub operator: String,
    pub equipment: String,
    #[serde(default)]
    pub pending_completion: bool,
}

impl OpenWorkItem {
    pub fn new(
        record_id: RecordId,
        plan_id: String,
        start_at: Option<DateTime<Utc>>,
        operator: String,
        equipment: String,
    ) -> Self {
        Self {
            record_id,
            plan_id,
            start_at,
            operator,
            equipment,
            pending_completion: false,
        }
    }
}
