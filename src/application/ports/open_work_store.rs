use crate::domain::entities::OpenWorkItem;
use crate::domain::value_objects::RecordId;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait OpenWorkStore: Send + Sync {
    async fn list(&self) -> Result<Vec<OpenWorkItem>, AppError>;
    async fn upsert(&self, item: &OpenWorkItem) -> Result<(), AppError>;
    async fn set_pending(&self, record_id: &RecordId, pending: bool) -> Result<(), AppError>;
    async fn remove(&self, record_id: &RecordId) -> Result<(), AppError>;
    /// Replace the whole cached set in one atomic write.
    async fn replace_all(&self, items: &[OpenWorkItem]) -> Result<(), AppError>;
}
