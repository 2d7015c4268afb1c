use crate::core::{ExportError, Result};
use crate::exports::ExportKind;
use crate::feature::DEFAULT_GEOMETRY_COLUMN;
use crate::stream::StreamOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub export: ExportConfig,
    pub static_files: StaticFilesConfig,
}

/// Database-related configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Export stream configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub geometry_column: String,
    pub compute_bbox: bool,
    pub output_dir: Option<PathBuf>,
    pub wells_batch_size: Option<usize>,
    pub lithology_batch_size: Option<usize>,
    pub aquifers_batch_size: Option<usize>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            geometry_column: DEFAULT_GEOMETRY_COLUMN.to_string(),
            compute_bbox: false,
            output_dir: None,
            wells_batch_size: None,
            lithology_batch_size: None,
            aquifers_batch_size: None,
        }
    }
}

/// Location of the pre-generated exports served when realtime output is not
/// requested.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub host: Option<String>,
    pub bucket: Option<String>,
}

impl Config {
    /// Batch size for an export, falling back to the export's default.
    pub fn batch_size(&self, kind: ExportKind) -> usize {
        let configured = match kind {
            ExportKind::Wells => self.export.wells_batch_size,
            ExportKind::Lithology => self.export.lithology_batch_size,
            ExportKind::Aquifers => self.export.aquifers_batch_size,
        };
        configured.unwrap_or_else(|| kind.default_batch_size())
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            geometry_column: self.export.geometry_column.clone(),
            compute_bbox: self.export.compute_bbox,
        }
    }

    fn validate(self) -> Result<Self> {
        for kind in ExportKind::ALL {
            if self.batch_size(kind) == 0 {
                return Err(ExportError::Config(format!(
                    "{}_batch_size must be greater than zero",
                    kind
                )));
            }
        }
        if self.export.geometry_column.is_empty() {
            return Err(ExportError::Config(
                "geometry_column must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).map_err(|e| ExportError::Config(e.to_string()))?;
    config.validate()
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// use gwells_export::config::load_config;
///
/// let config = load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// `<config dir>/gwells-export/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gwells-export").join("config.toml"))
}

/// Loads `path` if given, else the default config file if it exists, else
/// the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path);
    }
    match default_config_path() {
        Some(default) if default.exists() => {
            debug!("Loading configuration from {}", default.display());
            load_config(default)
        }
        _ => Ok(Config::default()),
    }
}
