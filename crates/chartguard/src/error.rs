//! Error types for the Chartguard library.
//!
//! These cover failures of the library itself (reading catalogs and
//! settings). Rejections of a chart request are reported as
//! [`ValidationError`](crate::validation::ValidationError) values instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Chartguard operations.
#[derive(Debug, Error)]
pub enum ChartguardError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dataset catalog is structurally invalid.
    #[error("Invalid dataset catalog: {0}")]
    Catalog(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Chartguard operations.
pub type Result<T> = std::result::Result<T, ChartguardError>;
