//! SQL templates with an optional spatial filter.
//!
//! Each export owns a literal SQL string containing a single `{bounds}`
//! placeholder. Rendering substitutes either nothing or a bounding-box
//! predicate with four positional parameters bound in (west, south, east,
//! north) order.

use crate::core::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the bounds predicate.
pub const BOUNDS_PLACEHOLDER: &str = "{bounds}";

/// A rectangular spatial filter given by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub sw_long: f64,
    pub sw_lat: f64,
    pub ne_long: f64,
    pub ne_lat: f64,
}

impl BoundingBox {
    pub fn new(sw_long: f64, sw_lat: f64, ne_long: f64, ne_lat: f64) -> Self {
        BoundingBox {
            sw_long,
            sw_lat,
            ne_long,
            ne_lat,
        }
    }

    /// Positional parameters in (west, south, east, north) order.
    pub fn params(&self) -> [f64; 4] {
        [self.sw_long, self.sw_lat, self.ne_long, self.ne_lat]
    }
}

/// SQL fragment restricting rows to a bounding box.
///
/// The fragment starts with `and` and carries exactly four `?` slots that
/// take the box corners in (west, south, east, north) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsPredicate(String);

impl BoundsPredicate {
    /// PostGIS containment test of `column` against an envelope built in
    /// `srid` and transformed to `target_srid`.
    pub fn postgis(column: &str, srid: u32, target_srid: u32) -> Self {
        BoundsPredicate(format!(
            "and {} @ ST_Transform(ST_MakeEnvelope(?, ?, ?, ?, {}), {})",
            column, srid, target_srid
        ))
    }

    /// Envelope containment over stored extent columns. A point is the case
    /// where the min and max columns are the same.
    pub fn contained_in(min_x: &str, min_y: &str, max_x: &str, max_y: &str) -> Self {
        BoundsPredicate(format!(
            "and ? <= {min_x} and ? <= {min_y} and {max_x} <= ? and {max_y} <= ?"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A query ready to execute: SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<f64>,
}

/// SQL text with a single `{bounds}` substitution point.
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    sql: String,
    predicate: BoundsPredicate,
}

impl SqlTemplate {
    /// Creates a template.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Template` unless `{bounds}` occurs exactly once.
    pub fn new(sql: impl Into<String>, predicate: BoundsPredicate) -> Result<Self> {
        let sql = sql.into();
        match sql.matches(BOUNDS_PLACEHOLDER).count() {
            1 => Ok(SqlTemplate { sql, predicate }),
            0 => Err(ExportError::Template(format!(
                "missing {} placeholder",
                BOUNDS_PLACEHOLDER
            ))),
            n => Err(ExportError::Template(format!(
                "{} placeholder appears {} times",
                BOUNDS_PLACEHOLDER, n
            ))),
        }
    }

    pub fn predicate(&self) -> &BoundsPredicate {
        &self.predicate
    }

    /// Substitutes the bounds predicate (or nothing) and collects parameters.
    pub fn render(&self, bounds: Option<&BoundingBox>) -> BoundQuery {
        match bounds {
            Some(bbox) => BoundQuery {
                sql: self.sql.replace(BOUNDS_PLACEHOLDER, self.predicate.as_str()),
                params: bbox.params().to_vec(),
            },
            None => BoundQuery {
                sql: self.sql.replace(BOUNDS_PLACEHOLDER, ""),
                params: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AQUIFER_SQL: &str = "select geom from aquifer where geom is not null {bounds} order by aquifer_id";

    #[test]
    fn test_render_without_bounds() {
        let template = SqlTemplate::new(AQUIFER_SQL, BoundsPredicate::postgis("geom", 4326, 3005)).unwrap();
        let query = template.render(None);
        assert_eq!(
            query.sql,
            "select geom from aquifer where geom is not null  order by aquifer_id"
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_render_postgis_bounds() {
        let template = SqlTemplate::new(AQUIFER_SQL, BoundsPredicate::postgis("geom", 4326, 3005)).unwrap();
        let bbox = BoundingBox::new(-125.0, 49.0, -124.0, 49.0);
        let query = template.render(Some(&bbox));

        assert!(query
            .sql
            .contains("and geom @ ST_Transform(ST_MakeEnvelope(?, ?, ?, ?, 4326), 3005)"));
        assert!(!query.sql.contains(BOUNDS_PLACEHOLDER));
        assert_eq!(query.params, vec![-125.0, 49.0, -124.0, 49.0]);
    }

    #[test]
    fn test_contained_in_binds_west_south_east_north() {
        let predicate = BoundsPredicate::contained_in("min_lon", "min_lat", "max_lon", "max_lat");
        assert_eq!(
            predicate.as_str(),
            "and ? <= min_lon and ? <= min_lat and max_lon <= ? and max_lat <= ?"
        );
        assert_eq!(predicate.as_str().matches('?').count(), 4);
    }

    #[test]
    fn test_template_placeholder_validation() {
        let predicate = BoundsPredicate::postgis("geom", 4326, 3005);
        match SqlTemplate::new("select 1", predicate.clone()) {
            Err(ExportError::Template(msg)) => assert!(msg.contains("missing")),
            _ => panic!("Expected Template error"),
        }
        match SqlTemplate::new("select 1 {bounds} {bounds}", predicate) {
            Err(ExportError::Template(msg)) => assert!(msg.contains("2 times")),
            _ => panic!("Expected Template error"),
        }
    }
}
