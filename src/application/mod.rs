pub mod ports;
pub mod services;

pub use services::{LookupService, OpenWorkService, SchemaService, SyncService};
