use crate::application::ports::{OpenWorkStore, RecordGateway};
use crate::domain::entities::OpenWorkItem;
use crate::domain::value_objects::RecordId;
use crate::shared::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Keeps the local open-work cache and reconciles it with the server's own
/// listing. The merge is a best-effort heuristic, not a CRDT: locally-known
/// pending flags always win over a server snapshot that may predate them.
pub struct OpenWorkService {
    store: Arc<dyn OpenWorkStore>,
    gateway: Arc<dyn RecordGateway>,
}

impl OpenWorkService {
    pub fn new(store: Arc<dyn OpenWorkStore>, gateway: Arc<dyn RecordGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn list_open(&self) -> Result<Vec<OpenWorkItem>, AppError> {
        self.store.list().await
    }

    /// Items a completion can still be recorded against.
    pub async fn list_selectable(&self) -> Result<Vec<OpenWorkItem>, AppError> {
        let items = self.store.list().await?;
        Ok(items
            .into_iter()
            .filter(|item| !item.pending_completion)
            .collect())
    }

    pub async fn record_started(&self, item: &OpenWorkItem) -> Result<(), AppError> {
        self.store.upsert(item).await
    }

    pub async fn mark_pending(
        &self,
        record_id: &RecordId,
        pending: bool,
    ) -> Result<(), AppError> {
        self.store.set_pending(record_id, pending).await
    }

    /// The remote service confirmed this item's completion; drop it.
    pub async fn completion_confirmed(&self, record_id: &RecordId) -> Result<(), AppError> {
        self.store.remove(record_id).await
    }

    /// Replace the local set with the server listing while preserving local
    /// pending state:
    /// - an item the server still lists keeps its pending flag;
    /// - a pending item the server omits is kept anyway, since the snapshot
    ///   may predate the completion that made it pending.
    pub async fn merge_from_server(&self, server_items: Vec<OpenWorkItem>) -> Result<(), AppError> {
        let local = self.store.list().await?;
        let pending_ids: HashSet<&RecordId> = local
            .iter()
            .filter(|item| item.pending_completion)
            .map(|item| &item.record_id)
            .collect();

        let mut merged: Vec<OpenWorkItem> = server_items
            .into_iter()
            .map(|mut item| {
                item.pending_completion = pending_ids.contains(&item.record_id);
                item
            })
            .collect();

        let server_ids: HashSet<RecordId> =
            merged.iter().map(|item| item.record_id.clone()).collect();
        merged.extend(
            local
                .into_iter()
                .filter(|item| item.pending_completion && !server_ids.contains(&item.record_id)),
        );

        self.store.replace_all(&merged).await
    }

    pub async fn refresh_from_server(&self) -> Result<(), AppError> {
        let listing = self.gateway.list_open_work().await?;
        debug!("Merging {} open work item(s) from server", listing.len());
        self.merge_from_server(listing).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::record_gateway::{NativeRecord, RecordIds};
    use crate::domain::entities::{
        CompletionEntry, FormSchema, LookupEntry, LookupFieldConfig, StartEntry,
    };
    use crate::infrastructure::database::SqliteOpenWorkStore;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex;

    struct StubGateway {
        listing: Mutex<Vec<OpenWorkItem>>,
    }

    impl StubGateway {
        fn new(listing: Vec<OpenWorkItem>) -> Self {
            Self {
                listing: Mutex::new(listing),
            }
        }
    }

    #[async_trait]
    impl RecordGateway for StubGateway {
        async fn create_records(&self, _: &[StartEntry]) -> Result<RecordIds, AppError> {
            unimplemented!()
        }
        async fn create_native(
            &self,
            _: Option<&str>,
            _: &[NativeRecord],
        ) -> Result<RecordIds, AppError> {
            unimplemented!()
        }
        async fn update_records(&self, _: &[CompletionEntry]) -> Result<RecordIds, AppError> {
            unimplemented!()
        }
        async fn list_open_work(&self) -> Result<Vec<OpenWorkItem>, AppError> {
            Ok(self.listing.lock().unwrap().clone())
        }
        async fn lookup_record(
            &self,
            _: &LookupFieldConfig,
            _: &str,
        ) -> Result<Option<LookupEntry>, AppError> {
            unimplemented!()
        }
        async fn search_lookup(
            &self,
            _: &LookupFieldConfig,
            _: &str,
        ) -> Result<Vec<LookupEntry>, AppError> {
            unimplemented!()
        }
        async fn fetch_schema(&self) -> Result<FormSchema, AppError> {
            unimplemented!()
        }
    }

    async fn setup(server: Vec<OpenWorkItem>) -> OpenWorkService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();
        OpenWorkService::new(
            Arc::new(SqliteOpenWorkStore::new(pool)),
            Arc::new(StubGateway::new(server)),
        )
    }

    fn item(record_id: &str, plan: &str) -> OpenWorkItem {
        OpenWorkItem::new(
            RecordId::new(record_id.into()).unwrap(),
            plan.into(),
            Some("2024-01-01T00:00:00Z".parse().unwrap()),
            "A".into(),
            "E1".into(),
        )
    }

    #[tokio::test]
    async fn test_merge_is_idempotent_and_preserves_pending() {
        let server = vec![item("101", "P1"), item("102", "P2")];
        let service = setup(server.clone()).await;

        service.merge_from_server(server.clone()).await.unwrap();
        let record_id = RecordId::new("101".into()).unwrap();
        service.mark_pending(&record_id, true).await.unwrap();

        service.merge_from_server(server).await.unwrap();

        let items = service.list_open().await.unwrap();
        assert_eq!(items.len(), 2);
        let flagged = items
            .iter()
            .find(|i| i.record_id.as_str() == "101")
            .unwrap();
        assert!(flagged.pending_completion);
    }

    #[tokio::test]
    async fn test_pending_item_missing_from_snapshot_is_kept() {
        let service = setup(vec![]).await;

        service
            .merge_from_server(vec![item("101", "P1")])
            .await
            .unwrap();
        let record_id = RecordId::new("101".into()).unwrap();
        service.mark_pending(&record_id, true).await.unwrap();

        // Stale snapshot that predates record 101's creation.
        service.merge_from_server(vec![]).await.unwrap();

        let items = service.list_open().await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].pending_completion);
    }

    #[tokio::test]
    async fn test_selectable_excludes_pending_items() {
        let service = setup(vec![]).await;
        service.record_started(&item("101", "P1")).await.unwrap();
        service.record_started(&item("102", "P2")).await.unwrap();

        let record_id = RecordId::new("101".into()).unwrap();
        service.mark_pending(&record_id, true).await.unwrap();

        let selectable = service.list_selectable().await.unwrap();
        assert_eq!(selectable.len(), 1);
        assert_eq!(selectable[0].record_id.as_str(), "102");
    }

    #[tokio::test]
    async fn test_refresh_pulls_server_listing() {
        let service = setup(vec![item("300", "P9")]).await;
        service.refresh_from_server().await.unwrap();

        let items = service.list_open().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].plan_id, "P9");
    }
}
