use crate::application::services::lookup_service::LookupService;
use crate::application::services::open_work_service::OpenWorkService;
use crate::application::services::sync_service::SyncService;
use crate::domain::entities::{QueuedRecord, ReportEntry};
use crate::domain::value_objects::FieldCode;
use crate::infrastructure::remote::SubmissionPayload;
use crate::presentation::dto::report::{
    OpenWorkItemResponse, SubmitOutcomeResponse, SubmitRecordRequest,
};
use crate::presentation::dto::Validate;
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;

/// Form field whose value resolves through the plan lookup.
const PLAN_FIELD: &str = "plan_id";

/// UI-facing surface for recording and flushing production reports.
pub struct ReportHandler {
    sync_service: Arc<SyncService>,
    open_work_service: Arc<OpenWorkService>,
    lookup_service: Arc<LookupService>,
}

impl ReportHandler {
    pub fn new(
        sync_service: Arc<SyncService>,
        open_work_service: Arc<OpenWorkService>,
        lookup_service: Arc<LookupService>,
    ) -> Self {
        Self {
            sync_service,
            open_work_service,
            lookup_service,
        }
    }

    pub async fn submit(
        &self,
        request: SubmitRecordRequest,
    ) -> Result<SubmitOutcomeResponse, AppError> {
        request.validate()?;
        let mut entry = request.into_entry().map_err(AppError::Validation)?;

        // Canonicalize the plan reference before it goes on the wire.
        if let ReportEntry::Start(start) = &mut entry {
            let field = FieldCode::new(PLAN_FIELD.to_string()).map_err(AppError::Validation)?;
            start.plan_id = self
                .lookup_service
                .resolve_for_submission(&field, &start.plan_id)
                .await?;
        }

        let outcome = self
            .sync_service
            .submit(vec![QueuedRecord::new(entry)])
            .await?;
        Ok(outcome.into())
    }

    /// Accept a raw submission payload: native records pass straight through,
    /// a simplified batch takes the regular typed path. Anything else is a
    /// structured decode error.
    pub async fn submit_json(&self, raw: &Value) -> Result<SubmitOutcomeResponse, AppError> {
        match SubmissionPayload::decode(raw)? {
            SubmissionPayload::Native { app, records, .. } => {
                let outcome = self
                    .sync_service
                    .submit_native(app.as_deref(), &records)
                    .await?;
                Ok(outcome.into())
            }
            SubmissionPayload::Simplified(records) => {
                let outcome = self.sync_service.submit(records).await?;
                Ok(outcome.into())
            }
        }
    }

    pub async fn flush_queue(&self) -> Result<SubmitOutcomeResponse, AppError> {
        let report = self.sync_service.flush_queue().await?;
        let status = if report.requeued > 0 { "queued" } else { "delivered" };
        Ok(SubmitOutcomeResponse {
            status: status.into(),
            message: format!(
                "Flushed queue: {} delivered, {} kept for retry, {} rejected, {} discarded",
                report.delivered, report.requeued, report.rejected, report.discarded
            ),
            created_ids: Vec::new(),
            hint: None,
        })
    }

    pub async fn queue_depth(&self) -> Result<u64, AppError> {
        self.sync_service.queue_depth().await
    }

    pub async fn open_work(&self) -> Result<Vec<OpenWorkItemResponse>, AppError> {
        let items = self.open_work_service.list_open().await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// Open items a completion can be linked against.
    pub async fn selectable_work(&self) -> Result<Vec<OpenWorkItemResponse>, AppError> {
        let items = self.open_work_service.list_selectable().await?;
        Ok(items.into_iter().map(Into::into).collect())
    }
}
