/// Connection Management Module
///
/// Opens export databases and prepares them for the export queries. A
/// connection is owned by whoever handles the request; nothing here is global.

use crate::core::Result;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// Name of the SQL function that renders a longitude/latitude pair as a
/// GeoJSON point.
pub const GEOJSON_POINT_FN: &str = "geojson_point";

/// Opens the export database at `path`.
///
/// The connection has foreign keys enabled and the export helper functions
/// registered (see [`register_functions`]).
///
/// # Errors
///
/// Returns `ExportError::Database` if the file cannot be opened.
pub fn open_database<P: AsRef<Path>>(path: P) -> Result<Connection> {
    debug!("Opening export database at {:?}", path.as_ref());
    let conn = Connection::open(path)?;
    prepare_connection(&conn)?;
    Ok(conn)
}

/// Opens a private in-memory export database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare_connection(&conn)?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    register_functions(conn)?;
    Ok(())
}

/// Registers the SQL helper functions used by the export queries.
///
/// `geojson_point(lon, lat)` returns `{"type": "Point", "coordinates": [lon,lat]}`
/// with five decimal places, or NULL when either coordinate is NULL.
pub fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        GEOJSON_POINT_FN,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let lon: Option<f64> = ctx.get(0)?;
            let lat: Option<f64> = ctx.get(1)?;
            Ok(match (lon, lat) {
                (Some(lon), Some(lat)) => Some(point_json(lon, lat)),
                _ => None,
            })
        },
    )?;
    Ok(())
}

/// GeoJSON text for a point, rounded to five decimal places (about a metre).
pub fn point_json(lon: f64, lat: f64) -> String {
    format!(
        "{{\"type\": \"Point\", \"coordinates\": [{:.5},{:.5}]}}",
        lon, lat
    )
}
