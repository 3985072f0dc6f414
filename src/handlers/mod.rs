pub mod export_run;
pub mod import_run;

pub use export_run::{run_export, ExportRunSummary};
pub use import_run::{run_import, ImportSummary};
