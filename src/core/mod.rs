/// Core Module
///
/// Shared infrastructure for the export pipeline: database access, row
/// sources and the common error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{ExportError, Result};
