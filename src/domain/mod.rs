pub mod entities;
pub mod value_objects;

pub use entities::{
    CompletionEntry, LookupEntry, LookupFieldConfig, OpenWorkItem, QueuedRecord, ReportEntry,
    StartEntry,
};
pub use value_objects::{ClientRef, EntryType, FieldCode, RecordId};
