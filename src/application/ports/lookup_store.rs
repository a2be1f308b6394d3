use crate::domain::entities::LookupEntry;
use crate::domain::value_objects::FieldCode;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Persistence for the per-field lookup cache. Entries keep their insertion
/// order; `load` returns oldest first so eviction order survives a reload.
#[async_trait]
pub trait LookupStore: Send + Sync {
    async fn load(&self, field: &FieldCode) -> Result<Vec<LookupEntry>, AppError>;
    async fn save(&self, field: &FieldCode, entries: &[LookupEntry]) -> Result<(), AppError>;
}
