use crate::domain::entities::{
    CompletionEntry, FormSchema, LookupEntry, LookupFieldConfig, OpenWorkItem, StartEntry,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A record in the remote service's own shape: every field wrapped in a
/// `{"value": …}` object.
pub type NativeRecord = Map<String, Value>;

/// Normalized result of a create or update call. The remote service answers
/// with either a batch `{ids, revisions}` or a singleton `{id, revision}`;
/// implementations fold both into this one shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIds {
    pub ids: Vec<String>,
    pub revisions: Vec<String>,
}

/// Request/response contract consumed from the remote record-keeping service.
#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Create start records in the log collection. Created ids come back in
    /// submission order per the remote contract.
    async fn create_records(&self, entries: &[StartEntry]) -> Result<RecordIds, AppError>;

    /// Pass records already in the native shape straight through.
    async fn create_native(
        &self,
        app: Option<&str>,
        records: &[NativeRecord],
    ) -> Result<RecordIds, AppError>;

    /// Patch completion fields onto existing start records. Updated ids are
    /// reported explicitly; callers match by id, never by position.
    async fn update_records(&self, entries: &[CompletionEntry]) -> Result<RecordIds, AppError>;

    /// Server-side listing of currently-open work, oldest start first.
    async fn list_open_work(&self) -> Result<Vec<OpenWorkItem>, AppError>;

    /// Exact-match resolution of one canonical key.
    async fn lookup_record(
        &self,
        config: &LookupFieldConfig,
        value: &str,
    ) -> Result<Option<LookupEntry>, AppError>;

    /// Candidate search over the key and picker fields; empty term returns an
    /// unfiltered page.
    async fn search_lookup(
        &self,
        config: &LookupFieldConfig,
        term: &str,
    ) -> Result<Vec<LookupEntry>, AppError>;

    /// Live form schema of the log collection.
    async fn fetch_schema(&self) -> Result<FormSchema, AppError>;
}
