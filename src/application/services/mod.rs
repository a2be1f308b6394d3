pub mod lookup_service;
pub mod open_work_service;
pub mod schema_service;
pub mod sync_service;

pub use lookup_service::{LookupOption, LookupSelection, LookupService};
pub use open_work_service::OpenWorkService;
pub use schema_service::SchemaService;
pub use sync_service::{FlushReport, SubmitOutcome, SyncService};
