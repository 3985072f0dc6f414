// ============================================================================
// Error Handling - Crate-wide error type for export and import runs
// ============================================================================
//
// Every component returns `Result<T>` from this module. The run orchestrators
// decide how far an error travels:
//
// 1. **Fatal to the run**
//    - Config / Epicor connection errors before any unit of work starts
//    - Any error raised by an export type (remaining exports are not attempted)
//
// 2. **Fatal to one file**
//    - CSV parse errors for an invoice file
//
// 3. **Fatal to one invoice**
//    - Any REST failure while building a header or its lines
//    - Lookup misses (unknown vendor, missing dataset rows)
//
// Nothing is retried. Every error is logged where it stops travelling.
//
// ============================================================================

use thiserror::Error;

use crate::services::erp::epicor_client::EpicorError;
use crate::services::transfer::sftp_client::TransferError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Epicor error: {0}")]
    Epicor(#[from] EpicorError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Column '{column}' missing from {export} query results")]
    MissingColumn { export: String, column: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn xml<E: std::fmt::Display>(err: E) -> Self {
        AppError::Xml(err.to_string())
    }
}
