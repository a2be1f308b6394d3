pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod shared;
pub mod state;

pub use application::services::{
    FlushReport, LookupOption, LookupSelection, LookupService, OpenWorkService, SchemaService,
    SubmitOutcome, SyncService,
};
pub use domain::entities::{
    CompletionEntry, LookupEntry, LookupFieldConfig, OpenWorkItem, QueuedRecord, ReportEntry,
    StartEntry,
};
pub use shared::config::AppConfig;
pub use shared::error::{AppError, Result};
pub use state::AppContext;

/// Install the tracing subscriber for shell binaries and examples.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floorlog=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
