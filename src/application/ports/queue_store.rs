use crate::domain::entities::QueuedRecord;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable store of pending submissions. Holds raw submission-shaped records
/// only; structural validation happens in the sync engine.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist one record. Survives process restart.
    async fn enqueue(&self, record: &QueuedRecord) -> Result<(), AppError>;

    /// Atomically return all queued records and empty the store. A record is
    /// either fully removed or still present; partial removal is never
    /// observable. Redelivery of drained-but-unconfirmed records is the
    /// caller's responsibility.
    async fn drain_all(&self) -> Result<Vec<QueuedRecord>, AppError>;

    /// Count of durably queued, not-yet-delivered records.
    async fn depth(&self) -> Result<u64, AppError>;
}
