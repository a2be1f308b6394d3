pub mod lookup;
pub mod open_work;
pub mod record;
pub mod schema;

pub use lookup::{FieldMapping, LookupEntry, LookupFieldConfig};
pub use open_work::OpenWorkItem;
pub use record::{CompletionEntry, QueuedRecord, ReportEntry, StartEntry};
pub use schema::{FieldProperty, FormSchema, LookupSetting, SchemaWarning};
