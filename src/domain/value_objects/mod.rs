mod client_ref;
mod entry_type;
mod field_code;
mod record_id;

pub use client_ref::ClientRef;
pub use entry_type::EntryType;
pub use field_code::FieldCode;
pub use record_id::RecordId;
