/// Export Error Module
///
/// This module defines the error type shared by every stage of the export
/// pipeline. Nothing in the pipeline recovers locally: every failure is
/// surfaced to the caller through `ExportError`.
use thiserror::Error;

/// Error type for the GeoJSON export pipeline.
///
/// Covers:
/// - Database failures while executing a query or fetching a batch
/// - Geometry values that cannot be parsed as GeoJSON
/// - Result sets that break the geometry-first column convention
/// - Malformed SQL templates
/// - Configuration loading and validation
#[derive(Error, Debug)]
pub enum ExportError {
    /// Errors raised by the SQLite driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Geometry column value is not a usable GeoJSON geometry
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Column layout of a result set does not match what the export expects
    #[error("Schema error: {0}")]
    Schema(String),

    /// SQL template is missing its `{bounds}` placeholder or repeats it
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding and decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result to use ExportError as the error type.
pub type Result<T> = std::result::Result<T, ExportError>;
