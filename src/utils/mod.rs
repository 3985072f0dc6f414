pub mod error_handling;
pub mod file_storage;
pub mod log_sanitizer;
pub mod value_parsing;

pub use error_handling::{AppError, Result};
pub use file_storage::StagingArea;
pub use log_sanitizer::*;
