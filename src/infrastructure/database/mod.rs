mod connection;
mod lookup_store;
mod open_work_store;
mod queue_store;

pub use connection::{Database, DbPool};
pub use lookup_store::SqliteLookupStore;
pub use open_work_store::SqliteOpenWorkStore;
pub use queue_store::SqliteQueueStore;
