pub mod export_service;
pub mod file_writer;
pub mod profiles;
pub mod record_mapper;

pub use export_service::{ExportFormat, ExportJob, ExportOutcome, ExportService};
pub use file_writer::DelimitedLayout;
