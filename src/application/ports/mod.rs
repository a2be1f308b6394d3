pub mod lookup_store;
pub mod open_work_store;
pub mod queue_store;
pub mod record_gateway;

pub use lookup_store::LookupStore;
pub use open_work_store::OpenWorkStore;
pub use queue_store::QueueStore;
pub use record_gateway::{NativeRecord, RecordGateway, RecordIds};
