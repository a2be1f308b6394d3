use crate::application::services::{
    LookupService, OpenWorkService, SchemaService, SyncService,
};
use crate::infrastructure::database::{
    Database, DbPool, SqliteLookupStore, SqliteOpenWorkStore, SqliteQueueStore,
};
use crate::infrastructure::remote::HttpRecordGateway;
use crate::presentation::handlers::{LookupHandler, ReportHandler};
use crate::shared::config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the shell owns for one session: configuration, the durable
/// stores and the services wired on top of them. Built once at session start;
/// there is no hidden module-level state.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub schema_service: Arc<SchemaService>,
    pub lookup_service: Arc<LookupService>,
    pub open_work_service: Arc<OpenWorkService>,
    pub sync_service: Arc<SyncService>,
    pub report_handler: Arc<ReportHandler>,
    pub lookup_handler: Arc<LookupHandler>,
}

impl AppContext {
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = Database::initialize(&config.database).await?;

        let gateway = Arc::new(HttpRecordGateway::new(&config)?);
        Self::with_gateway(config, db_pool, gateway).await
    }

    /// Wiring entry point that accepts any gateway implementation; tests pass
    /// a mock here.
    pub async fn with_gateway(
        config: AppConfig,
        db_pool: DbPool,
        gateway: Arc<dyn crate::application::ports::RecordGateway>,
    ) -> anyhow::Result<Self> {
        let queue_store = Arc::new(SqliteQueueStore::new(db_pool.clone()));
        let open_work_store = Arc::new(SqliteOpenWorkStore::new(db_pool.clone()));
        let lookup_store = Arc::new(SqliteLookupStore::new(db_pool.clone()));

        let schema_service = Arc::new(SchemaService::new(gateway.clone(), &config));
        let lookup_service = Arc::new(LookupService::new(
            gateway.clone(),
            lookup_store,
            schema_service.clone(),
            config.lookup.clone(),
        ));
        let open_work_service = Arc::new(OpenWorkService::new(open_work_store, gateway.clone()));
        let sync_service = Arc::new(SyncService::new(
            queue_store,
            open_work_service.clone(),
            gateway,
        ));

        let report_handler = Arc::new(ReportHandler::new(
            sync_service.clone(),
            open_work_service.clone(),
            lookup_service.clone(),
        ));
        let lookup_handler = Arc::new(LookupHandler::new(
            lookup_service.clone(),
            schema_service.clone(),
        ));

        Ok(Self {
            config,
            db_pool,
            schema_service,
            lookup_service,
            open_work_service,
            sync_service,
            report_handler,
            lookup_handler,
        })
    }

    /// Connectivity returned: flush the queue, then refresh server-derived
    /// state. Safe to call repeatedly; a concurrent flush drains nothing.
    pub async fn on_connectivity_restored(&self) {
        self.sync_service.set_online(true);
        info!("Connectivity restored, flushing queue");

        if let Err(err) = self.sync_service.flush_queue().await {
            warn!("Queue flush failed: {err}");
        }
        if let Err(err) = self.open_work_service.refresh_from_server().await {
            warn!("Open work refresh failed: {err}");
        }
        if let Err(err) = self.schema_service.form_schema(true).await {
            warn!("Schema refresh failed: {err}");
        }
    }

    pub fn on_connectivity_lost(&self) {
        self.sync_service.set_online(false);
        info!("Connectivity lost, submissions will be queued");
    }

    /// The page became visible again while online; same recovery path as a
    /// connectivity-restore event.
    pub async fn on_visibility_restored(&self) {
        if self.sync_service.is_online() {
            if let Err(err) = self.sync_service.flush_queue().await {
                warn!("Queue flush failed: {err}");
            }
            if let Err(err) = self.open_work_service.refresh_from_server().await {
                warn!("Open work refresh failed: {err}");
            }
        }
    }

    pub async fn shutdown(self) {
        self.db_pool.close().await;
    }
}
