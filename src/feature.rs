//! Row to GeoJSON `Feature` formatting.
//!
//! Column 0 of every row holds a pre-serialised geometry; every other column
//! becomes a property keyed by its column name, in column order.

use crate::core::db::{Columns, Row, Value};
use crate::core::{ExportError, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Conventional name of the geometry column.
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";

/// Parses the geometry cell of a row.
///
/// Text is parsed as JSON, JSON values pass through and NULL stays `null`.
pub fn parse_geometry(value: &Value) -> Result<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Json(json) => Ok(json.clone()),
        Value::Text(text) => serde_json::from_str(text)
            .map_err(|e| ExportError::Geometry(format!("invalid geometry JSON: {}", e))),
        other => Err(ExportError::Geometry(format!(
            "unsupported geometry value {:?}",
            other
        ))),
    }
}

/// One GeoJSON feature borrowing its properties from a row.
#[derive(Debug)]
pub struct Feature<'a> {
    geometry: serde_json::Value,
    properties: Properties<'a>,
}

#[derive(Debug)]
struct Properties<'a> {
    row: &'a Row,
    columns: &'a Columns,
    geometry_column: &'a str,
}

impl<'a> Feature<'a> {
    /// Builds a feature from a row and the column descriptors of its result set.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Schema` if the row width does not match the
    /// columns, and `ExportError::Geometry` if column 0 is not a geometry.
    pub fn from_row(row: &'a Row, columns: &'a Columns, geometry_column: &'a str) -> Result<Self> {
        if row.len() != columns.len() {
            return Err(ExportError::Schema(format!(
                "row has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }
        let geometry = match row.first() {
            Some(value) => parse_geometry(value)?,
            None => {
                return Err(ExportError::Schema(
                    "row has no geometry column".to_string(),
                ))
            }
        };
        Ok(Feature {
            geometry,
            properties: Properties {
                row,
                columns,
                geometry_column,
            },
        })
    }

    pub fn geometry(&self) -> &serde_json::Value {
        &self.geometry
    }

    /// Consumes the feature, handing back its parsed geometry.
    pub fn into_geometry(self) -> serde_json::Value {
        self.geometry
    }

    /// Compact JSON text of the feature.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Feature<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "Feature")?;
        map.serialize_entry("geometry", &self.geometry)?;
        map.serialize_entry("properties", &self.properties)?;
        map.end()
    }
}

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, value) in self.columns.iter().zip(self.row.iter()).skip(1) {
            if column.name != self.geometry_column {
                map.serialize_entry(&column.name, value)?;
            }
        }
        map.end()
    }
}

/// Formats one row as GeoJSON `Feature` text.
pub fn format_feature(row: &Row, columns: &Columns, geometry_column: &str) -> Result<String> {
    Feature::from_row(row, columns, geometry_column)?.to_json()
}
