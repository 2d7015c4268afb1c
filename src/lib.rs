// Core infrastructure modules
pub mod core;

// Export pipeline
pub mod config;
pub mod exports;
pub mod extent;
pub mod feature;
pub mod request;
pub mod storage;
pub mod stream;
pub mod template;

pub use crate::core::{ExportError, Result};
pub use crate::exports::ExportKind;
pub use crate::stream::{GeoJsonStream, StreamOptions};
