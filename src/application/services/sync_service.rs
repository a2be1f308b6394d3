use crate::application::ports::record_gateway::RecordIds;
use crate::application::ports::{QueueStore, RecordGateway};
use crate::application::services::open_work_service::OpenWorkService;
use crate::domain::entities::{CompletionEntry, OpenWorkItem, QueuedRecord, ReportEntry, StartEntry};
use crate::domain::value_objects::RecordId;
use crate::shared::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Normalized result of one submission attempt, ready for user display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The remote service acknowledged everything.
    Delivered { created: Vec<String>, message: String },
    /// A transient failure; records are back in the durable queue.
    QueuedForRetry { queued: usize, message: String },
    /// A permanent failure; records were not re-queued.
    Rejected {
        failed: usize,
        message: String,
        hint: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub requeued: usize,
    pub rejected: usize,
    /// Structurally invalid records dropped instead of retried forever.
    pub discarded: usize,
}

/// Orchestrates submission of ad-hoc and queued records, classifies failures
/// and keeps the open-work cache in step with remote acknowledgements.
pub struct SyncService {
    queue: Arc<dyn QueueStore>,
    open_work: Arc<OpenWorkService>,
    gateway: Arc<dyn RecordGateway>,
    online: AtomicBool,
}

impl SyncService {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        open_work: Arc<OpenWorkService>,
        gateway: Arc<dyn RecordGateway>,
    ) -> Self {
        Self {
            queue,
            open_work,
            gateway,
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub async fn queue_depth(&self) -> Result<u64, AppError> {
        self.queue.depth().await
    }

    /// Submit a batch immediately when online, otherwise queue it. Malformed
    /// records are rejected up front and never reach the queue.
    pub async fn submit(&self, records: Vec<QueuedRecord>) -> Result<SubmitOutcome, AppError> {
        for record in &records {
            record.entry.validate().map_err(AppError::Validation)?;
        }

        // The pending flag is persisted before the network attempt so a
        // reload mid-flight keeps the duplicate-danger signal.
        for record in &records {
            if let Some(record_id) = record.entry.start_record_id() {
                self.open_work.mark_pending(record_id, true).await?;
            }
        }

        if !self.is_online() {
            let queued = records.len();
            for record in &records {
                self.queue.enqueue(record).await?;
            }
            return Ok(SubmitOutcome::QueuedForRetry {
                queued,
                message: format!("Offline: saved {queued} record(s) for later delivery"),
            });
        }

        self.deliver(records).await
    }

    /// Forward records already in the remote service's native shape. This is
    /// a passthrough for callers speaking the native protocol; such records
    /// never enter the durable queue.
    pub async fn submit_native(
        &self,
        app: Option<&str>,
        records: &[crate::application::ports::NativeRecord],
    ) -> Result<SubmitOutcome, AppError> {
        match self.gateway.create_native(app, records).await {
            Ok(created) => {
                let count = created.ids.len();
                Ok(SubmitOutcome::Delivered {
                    created: created.ids,
                    message: format!("Saved {count} record(s)"),
                })
            }
            Err(err) => Ok(SubmitOutcome::Rejected {
                failed: records.len(),
                message: err.user_message(),
                hint: err.remote_hint().map(str::to_string),
            }),
        }
    }

    /// Drain the durable queue and resubmit everything structurally valid as
    /// one batch. Safe to trigger more than once: the drain's atomicity means
    /// a record is drained by at most one caller.
    pub async fn flush_queue(&self) -> Result<FlushReport, AppError> {
        let drained = self.queue.drain_all().await?;
        if drained.is_empty() {
            return Ok(FlushReport::default());
        }

        let (valid, invalid): (Vec<QueuedRecord>, Vec<QueuedRecord>) = drained
            .into_iter()
            .partition(|record| record.entry.validate().is_ok());
        let discarded = invalid.len();
        if discarded > 0 {
            warn!("Discarding {discarded} malformed queued record(s)");
        }
        if valid.is_empty() {
            return Ok(FlushReport {
                discarded,
                ..FlushReport::default()
            });
        }

        let total = valid.len();
        let report = match self.deliver(valid).await? {
            SubmitOutcome::Delivered { .. } => FlushReport {
                delivered: total,
                discarded,
                ..FlushReport::default()
            },
            SubmitOutcome::QueuedForRetry { queued, .. } => FlushReport {
                delivered: total - queued,
                requeued: queued,
                discarded,
                ..FlushReport::default()
            },
            SubmitOutcome::Rejected { failed, message, .. } => {
                warn!("Queued records rejected by remote service: {message}");
                FlushReport {
                    delivered: total - failed,
                    rejected: failed,
                    discarded,
                    ..FlushReport::default()
                }
            }
        };

        info!(
            "Queue flush: {} delivered, {} requeued, {} rejected, {} discarded",
            report.delivered, report.requeued, report.rejected, report.discarded
        );
        Ok(report)
    }

    async fn deliver(&self, records: Vec<QueuedRecord>) -> Result<SubmitOutcome, AppError> {
        let starts: Vec<StartEntry> = records
            .iter()
            .filter_map(|record| match &record.entry {
                ReportEntry::Start(start) => Some(start.clone()),
                ReportEntry::Complete(_) => None,
            })
            .collect();
        let completions: Vec<CompletionEntry> = records
            .iter()
            .filter_map(|record| match &record.entry {
                ReportEntry::Complete(done) => Some(done.clone()),
                ReportEntry::Start(_) => None,
            })
            .collect();

        let created = if starts.is_empty() {
            RecordIds::default()
        } else {
            match self.gateway.create_records(&starts).await {
                Ok(created) => created,
                // Nothing was confirmed; the whole batch is undelivered.
                Err(err) => return self.handle_failure(records, err).await,
            }
        };

        // Created ids arrive in submission order per the remote contract;
        // that positional pairing is the only correlation creates offer.
        for (start, id) in starts.iter().zip(created.ids.iter()) {
            let record_id = RecordId::new(id.clone()).map_err(AppError::Deserialization)?;
            let item = OpenWorkItem::new(
                record_id,
                start.plan_id.clone(),
                Some(start.start_at),
                start.operator.clone(),
                start.equipment.clone(),
            );
            self.open_work.record_started(&item).await?;
        }

        if !completions.is_empty() {
            match self.gateway.update_records(&completions).await {
                Ok(updated) => {
                    self.apply_completion_acks(&completions, &updated).await?;
                }
                Err(err) => {
                    // Starts are already acknowledged; only the completion
                    // part of the batch is undelivered.
                    let undelivered: Vec<QueuedRecord> = records
                        .into_iter()
                        .filter(|record| matches!(record.entry, ReportEntry::Complete(_)))
                        .collect();
                    return self.handle_failure(undelivered, err).await;
                }
            }
        }

        let count = created.ids.len() + completions.len();
        Ok(SubmitOutcome::Delivered {
            created: created.ids,
            message: format!("Saved {count} record(s)"),
        })
    }

    /// Updated ids are matched explicitly, never by position: an id present
    /// in the response means that completion landed.
    async fn apply_completion_acks(
        &self,
        completions: &[CompletionEntry],
        updated: &RecordIds,
    ) -> Result<(), AppError> {
        for entry in completions {
            let id = &entry.start_record_id;
            if updated.ids.iter().any(|ack| ack == id.as_str()) {
                self.open_work.completion_confirmed(id).await?;
            } else {
                self.open_work.mark_pending(id, false).await?;
            }
        }
        Ok(())
    }

    async fn handle_failure(
        &self,
        undelivered: Vec<QueuedRecord>,
        err: AppError,
    ) -> Result<SubmitOutcome, AppError> {
        let count = undelivered.len();

        if err.is_retriable() {
            // Pending flags stay set: the completion is still on its way.
            for record in &undelivered {
                self.queue.enqueue(record).await?;
            }
            warn!("Submission failed, {count} record(s) queued for retry: {err}");
            return Ok(SubmitOutcome::QueuedForRetry {
                queued: count,
                message: format!("Temporarily failed; saved {count} record(s) for retry"),
            });
        }

        // Permanent failure: hand the records back to the user instead of
        // retrying them forever, and release their pending flags.
        for record in &undelivered {
            if let Some(record_id) = record.entry.start_record_id() {
                self.open_work.mark_pending(record_id, false).await?;
            }
        }
        warn!("Submission rejected by remote service: {err}");
        Ok(SubmitOutcome::Rejected {
            failed: count,
            message: err.user_message(),
            hint: err.remote_hint().map(str::to_string),
        })
    }
}
