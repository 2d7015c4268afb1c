//! Resolution of an export request into a redirect or a realtime stream.
//!
//! Callers pass the query-string parameters and the request's connection
//! explicitly; nothing is read from ambient state.

use crate::config::Config;
use crate::core::db::ChunkedRows;
use crate::core::{ExportError, Result};
use crate::exports::ExportKind;
use crate::stream::{GeoJsonStream, StreamOptions};
use crate::template::{BoundQuery, BoundingBox};
use rusqlite::{params_from_iter, Connection, Statement};
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, info};

pub const CONTENT_TYPE: &str = "application/json";

/// Query-string parameters understood by the GeoJSON endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportParams {
    pub realtime: bool,
    pub bounds: Option<BoundingBox>,
}

impl ExportParams {
    /// Reads `realtime` and the four bounding-box corners.
    ///
    /// The bounding box is only used when all four corners are present and
    /// parse as finite numbers; otherwise it is dropped and the export is
    /// unfiltered.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let realtime = matches!(
            query.get("realtime").map(String::as_str),
            Some("true") | Some("True")
        );
        ExportParams {
            realtime,
            bounds: parse_bounds(query),
        }
    }
}

fn parse_bounds(query: &HashMap<String, String>) -> Option<BoundingBox> {
    let corner = |name: &str| -> Option<f64> {
        query
            .get(name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    let corners = ["sw_long", "sw_lat", "ne_long", "ne_lat"];
    if !corners.iter().any(|c| query.contains_key(*c)) {
        return None;
    }
    match (
        corner("sw_long"),
        corner("sw_lat"),
        corner("ne_long"),
        corner("ne_lat"),
    ) {
        (Some(sw_long), Some(sw_lat), Some(ne_long), Some(ne_lat)) => {
            Some(BoundingBox::new(sw_long, sw_lat, ne_long, ne_lat))
        }
        _ => {
            debug!("ignoring incomplete or malformed bounding box");
            None
        }
    }
}

/// A realtime export ready to run against the request's connection.
#[derive(Debug, Clone)]
pub struct RealtimeExport {
    pub kind: ExportKind,
    pub query: BoundQuery,
    pub batch_size: usize,
    pub options: StreamOptions,
}

impl RealtimeExport {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// `Content-Disposition` header value for the download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.kind.file_name())
    }

    pub fn prepare<'c>(&self, conn: &'c Connection) -> Result<Statement<'c>> {
        Ok(conn.prepare(&self.query.sql)?)
    }

    /// Executes the prepared statement and wraps its rows in a GeoJSON stream.
    pub fn stream<'s>(&self, stmt: &'s mut Statement<'_>) -> Result<GeoJsonStream<ChunkedRows<'s>>> {
        let rows = ChunkedRows::execute(stmt, params_from_iter(self.query.params.iter()), self.batch_size)?;
        GeoJsonStream::with_options(rows, self.options.clone())
    }

    /// Prepares, executes and drains the export into `writer`.
    pub fn write_to<W: Write>(&self, conn: &Connection, writer: W) -> Result<usize> {
        let mut stmt = self.prepare(conn)?;
        let stream = self.stream(&mut stmt)?;
        stream.write_to(writer)
    }
}

/// What an export endpoint should answer.
#[derive(Debug, Clone)]
pub enum ExportResponse {
    /// HTTP 302 to the pre-generated file
    Redirect { location: String },
    /// Generate the document now
    Stream(RealtimeExport),
}

/// URL of the pre-generated export on the object store.
pub fn static_export_url(kind: ExportKind, config: &Config) -> Result<String> {
    let host = config.static_files.host.as_deref().ok_or_else(|| {
        ExportError::Config("static_files.host is not configured".to_string())
    })?;
    let bucket = config.static_files.bucket.as_deref().ok_or_else(|| {
        ExportError::Config("static_files.bucket is not configured".to_string())
    })?;
    Ok(format!("https://{}/{}/api/v1/gis/{}", host, bucket, kind.file_name()))
}

/// Decides how to answer a request for `kind`.
///
/// Realtime generation is slow for the full data set, so unless `realtime`
/// is requested the caller is redirected to the pre-generated file.
pub fn resolve(kind: ExportKind, params: &ExportParams, config: &Config) -> Result<ExportResponse> {
    if !params.realtime {
        let location = static_export_url(kind, config)?;
        debug!("redirecting {} export to {}", kind, location);
        return Ok(ExportResponse::Redirect { location });
    }

    let query = kind.template()?.render(params.bounds.as_ref());
    info!(
        "streaming {} export{}",
        kind,
        if params.bounds.is_some() { " within bounds" } else { "" }
    );
    Ok(ExportResponse::Stream(RealtimeExport {
        kind,
        query,
        batch_size: config.batch_size(kind),
        options: config.stream_options(),
    }))
}
