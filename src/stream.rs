//! Streaming `FeatureCollection` writer.
//!
//! [`GeoJsonStream`] pulls rows from a [`RowSource`] and yields text
//! fragments that concatenate to exactly one GeoJSON `FeatureCollection`:
//! the opening envelope, one fragment per feature (comma separated) and the
//! closing envelope. Only one row is held at a time.

use crate::core::db::RowSource;
use crate::core::{ExportError, Result};
use crate::extent::Extent;
use crate::feature::{Feature, DEFAULT_GEOMETRY_COLUMN};
use std::io::Write;
use std::iter::FusedIterator;
use tracing::{debug, warn};

/// Opening envelope of the collection.
pub const HEADER: &str = r#"{"type": "FeatureCollection","features": ["#;

/// Closing envelope of the collection when no `bbox` is written.
pub const FOOTER: &str = "]}";

/// Options for a [`GeoJsonStream`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Name column 0 must carry; also excluded from `properties`
    pub geometry_column: String,
    /// Append an RFC 7946 `bbox` covering every emitted geometry
    pub compute_bbox: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            geometry_column: DEFAULT_GEOMETRY_COLUMN.to_string(),
            compute_bbox: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Streaming,
    Done,
}

/// Pull-based, single-pass GeoJSON writer over a row source.
///
/// A failure from the row source is yielded once as `Err`; the stream then
/// ends without a footer, so output already sent is left truncated.
pub struct GeoJsonStream<S> {
    source: S,
    geometry_column: String,
    state: State,
    first_feature: bool,
    extent: Option<Extent>,
    features: usize,
}

impl<S: RowSource> GeoJsonStream<S> {
    /// Creates a stream with default options.
    pub fn new(source: S) -> Result<Self> {
        Self::with_options(source, StreamOptions::default())
    }

    /// Creates a stream, checking that column 0 is the geometry column.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Schema` if the result has no columns or its
    /// first column is not named `options.geometry_column`. The check runs
    /// before any fragment is produced.
    pub fn with_options(source: S, options: StreamOptions) -> Result<Self> {
        match source.columns().get(0) {
            Some(column) if column.name == options.geometry_column => {}
            Some(column) => {
                return Err(ExportError::Schema(format!(
                    "expected column 0 to be {:?}, found {:?}",
                    options.geometry_column, column.name
                )))
            }
            None => return Err(ExportError::Schema("result has no columns".to_string())),
        }

        Ok(GeoJsonStream {
            source,
            geometry_column: options.geometry_column,
            state: State::Init,
            first_feature: true,
            extent: options.compute_bbox.then(Extent::empty),
            features: 0,
        })
    }

    /// Number of features emitted so far
    pub fn features_written(&self) -> usize {
        self.features
    }

    /// Drains the stream into `writer`, returning the number of features.
    pub fn write_to<W: Write>(mut self, mut writer: W) -> Result<usize> {
        while let Some(fragment) = self.next() {
            writer.write_all(fragment?.as_bytes())?;
        }
        writer.flush()?;
        Ok(self.features)
    }

    fn next_feature(&mut self) -> Result<Option<String>> {
        let Some(row) = self.source.next_row()? else {
            return Ok(None);
        };
        let feature = Feature::from_row(&row, self.source.columns(), &self.geometry_column)?;
        let json = feature.to_json()?;
        if let Some(extent) = self.extent.as_mut() {
            extent.expand_geometry(feature.into_geometry())?;
        }

        let comma = if self.first_feature {
            self.first_feature = false;
            ""
        } else {
            ","
        };
        self.features += 1;
        Ok(Some(format!("{}\n{}", comma, json)))
    }

    /// Closing envelope; carries a `bbox` once any non-null geometry was seen.
    fn footer(&self) -> Result<String> {
        match self.extent {
            Some(extent) if !extent.is_empty() => Ok(format!(
                "],\n\"bbox\": {}}}",
                serde_json::to_string(&extent.to_bbox())?
            )),
            _ => Ok(FOOTER.to_string()),
        }
    }
}

impl<S: RowSource> Iterator for GeoJsonStream<S> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Init => {
                self.state = State::Streaming;
                Some(Ok(HEADER.to_string()))
            }
            State::Streaming => match self.next_feature() {
                Ok(Some(fragment)) => Some(Ok(fragment)),
                Ok(None) => {
                    debug!("stream finished after {} features", self.features);
                    self.state = State::Done;
                    Some(self.footer())
                }
                Err(e) => {
                    warn!("stream aborted after {} features: {}", self.features, e);
                    self.state = State::Done;
                    Some(Err(e))
                }
            },
            State::Done => None,
        }
    }
}

impl<S: RowSource> FusedIterator for GeoJsonStream<S> {}
