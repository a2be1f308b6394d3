pub mod lookup;
pub mod report;

pub use lookup::{LookupOptionResponse, LookupSelectionResponse};
pub use report::{OpenWorkItemResponse, SubmitOutcomeResponse, SubmitRecordRequest};

/// Request-side validation applied before anything reaches a service.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}
