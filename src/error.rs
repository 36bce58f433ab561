//! Error types for store access and the export transform.

use std::io;
use thiserror::Error;

/// Main error type for `sqlite_export` operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// Store unreachable or statement invalid
    #[error("data access error: {0}")]
    DataAccess(#[from] rusqlite::Error),

    /// Table absent during schema reflection
    #[error("table '{table}' not found in store")]
    TableNotFound { table: String },

    /// Expected column absent from the reflected table schema
    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    /// Density requested for a row whose area is zero
    #[error("cannot compute density for '{name}': area is zero")]
    ZeroArea { name: String },

    /// Area, population or the derived density is infinite or NaN
    #[error("cannot compute density for '{name}': value is not finite")]
    NonFinite { name: String },

    /// A numeric field holds NULL, text or a blob
    #[error("column '{column}' of '{name}' is not numeric")]
    NonNumeric { column: String, name: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be built or deserialized
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;
