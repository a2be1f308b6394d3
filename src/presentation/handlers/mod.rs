pub mod lookup_handler;
pub mod report_handler;

pub use lookup_handler::LookupHandler;
pub use report_handler::ReportHandler;
