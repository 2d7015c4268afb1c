//! Bounding extents of GeoJSON geometries.

use crate::core::{ExportError, Result};
use geojson::{Geometry, Position};

/// Axis-aligned extent `[min_x, min_y, max_x, max_y]` accumulated over any
/// number of geometries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Extent::empty()
    }
}

impl Extent {
    /// An extent that contains nothing; the first expansion replaces it.
    pub fn empty() -> Self {
        Extent {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Extent of a single GeoJSON geometry, `None` for `null` or geometries
    /// without coordinates.
    pub fn of_geometry(geometry: serde_json::Value) -> Result<Option<Self>> {
        let mut extent = Extent::empty();
        extent.expand_geometry(geometry)?;
        Ok((!extent.is_empty()).then_some(extent))
    }

    /// Grows the extent to cover a GeoJSON geometry object. `null` is ignored.
    ///
    /// Takes the value by ownership so it can be parsed without a copy.
    pub fn expand_geometry(&mut self, geometry: serde_json::Value) -> Result<()> {
        if geometry.is_null() {
            return Ok(());
        }
        let geometry = Geometry::from_json_value(geometry)
            .map_err(|e| ExportError::Geometry(e.to_string()))?;
        self.expand(&geometry);
        Ok(())
    }

    fn expand(&mut self, geometry: &Geometry) {
        use geojson::Value::*;
        match &geometry.value {
            Point(p) => self.expand_position(p),
            MultiPoint(points) | LineString(points) => {
                points.iter().for_each(|p| self.expand_position(p))
            }
            MultiLineString(lines) | Polygon(lines) => lines
                .iter()
                .flatten()
                .for_each(|p| self.expand_position(p)),
            MultiPolygon(polygons) => polygons
                .iter()
                .flatten()
                .flatten()
                .for_each(|p| self.expand_position(p)),
            GeometryCollection(geometries) => geometries.iter().for_each(|g| self.expand(g)),
        }
    }

    fn expand_position(&mut self, position: &Position) {
        if let [x, y, ..] = position.as_slice() {
            self.min_x = self.min_x.min(*x);
            self.min_y = self.min_y.min(*y);
            self.max_x = self.max_x.max(*x);
            self.max_y = self.max_y.max(*y);
        }
    }

    /// RFC 7946 `bbox` member value.
    pub fn to_bbox(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}
