//! The well, lithology and aquifer GeoJSON exports.
//!
//! Property names are consumed by DataBC and must stay stable even if the
//! underlying columns change.

use crate::config::Config;
use crate::core::db::KeyRangeRows;
use crate::core::Result;
use crate::stream::GeoJsonStream;
use crate::template::{BoundsPredicate, SqlTemplate};
use clap::ValueEnum;
use rusqlite::Connection;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

macro_rules! wells_select {
    () => {
        r#"
select
    geojson_point(well.longitude, well.latitude) as geometry,
    well.well_tag_number,
    well.identification_plate_number,
    substr(well_status_code.description, 1, 255) as well_status,
    substr(licenced_status_code.description, 1, 255) as licenced_status,
    'https://apps.nrs.gov.bc.ca/gwells/well/' || well.well_tag_number as detail,
    well.artesian_flow,
    'usGPM' as artesian_flow_units,
    well.artesian_pressure,
    substr(well_class_code.description, 1, 100) as well_class,
    substr(intended_water_use_code.description, 1, 100) as intended_water_use,
    substr(well.street_address, 1, 100) as street_address,
    well.finished_well_depth,
    well.diameter,
    well.static_water_level,
    well.bedrock_depth,
    well.well_yield as yield,
    substr(well_yield_unit_code.description, 1, 100) as yield_unit,
    well.aquifer_id as aquifer_id
from well
    left join well_status_code on well_status_code.well_status_code = well.well_status_code
    left join licenced_status_code on
        licenced_status_code.licenced_status_code = well.licenced_status_code
    left join well_class_code on well_class_code.well_class_code = well.well_class_code
    left join intended_water_use_code on
        intended_water_use_code.intended_water_use_code = well.intended_water_use_code
    left join well_yield_unit_code on
        well_yield_unit_code.well_yield_unit_code = well.well_yield_unit_code
where (well.well_publication_status_code = 'Published' or well.well_publication_status_code is null)
    and well.longitude is not null and well.latitude is not null
"#
    };
}

macro_rules! lithology_select {
    () => {
        r#"
select
    geojson_point(well.longitude, well.latitude) as geometry,
    well.well_tag_number,
    well.identification_plate_number,
    substr(well_status_code.description, 1, 255) as well_status,
    substr(licenced_status_code.description, 1, 255) as licenced_status,
    'https://apps.nrs.gov.bc.ca/gwells/well/' || well.well_tag_number as detail,
    lithology_description.lithology_from as "from",
    lithology_description.lithology_to as "to",
    substr(lithology_colour_code.description, 1, 100) as colour,
    substr(lithology_description_code.description, 1, 255) as description,
    substr(lithology_material_code.description, 1, 255) as material,
    substr(lithology_description.lithology_observation, 1, 250) as observation,
    substr(lithology_hardness_code.description, 1, 100) as hardness,
    substr(well_class_code.description, 1, 100) as well_class,
    substr(intended_water_use_code.description, 1, 100) as intended_water_use,
    substr(well.street_address, 1, 100) as street_address,
    well.finished_well_depth,
    well.diameter,
    well.static_water_level,
    well.bedrock_depth,
    well.well_yield as yield,
    substr(well_yield_unit_code.description, 1, 100) as yield_unit,
    well.aquifer_id as aquifer
from well
    inner join lithology_description on
        lithology_description.well_tag_number = well.well_tag_number
    left join well_status_code on well_status_code.well_status_code = well.well_status_code
    left join licenced_status_code on
        licenced_status_code.licenced_status_code = well.licenced_status_code
    left join lithology_material_code on
        lithology_material_code.lithology_material_code =
            lithology_description.lithology_material_code
    left join lithology_colour_code on
        lithology_colour_code.lithology_colour_code = lithology_description.lithology_colour_code
    left join lithology_description_code on
        lithology_description_code.lithology_description_code =
            lithology_description.lithology_description_code
    left join lithology_hardness_code on
        lithology_hardness_code.lithology_hardness_code =
            lithology_description.lithology_hardness_code
    left join well_class_code on well_class_code.well_class_code = well.well_class_code
    left join intended_water_use_code on
        intended_water_use_code.intended_water_use_code = well.intended_water_use_code
    left join well_yield_unit_code on
        well_yield_unit_code.well_yield_unit_code = well.well_yield_unit_code
where (well.well_publication_status_code = 'Published' or well.well_publication_status_code is null)
    and well.longitude is not null and well.latitude is not null
"#
    };
}

macro_rules! aquifers_select {
    () => {
        r#"
select
    aquifer.geom as geometry,
    aquifer.aquifer_id as aquifer_id,
    substr(aquifer.aquifer_name, 1, 100) as name,
    substr(aquifer.location_description, 1, 100) as location,
    substr(aquifer_material_code.description, 1, 100) as material,
    substr(aquifer_subtype_code.description, 1, 100) as subtype,
    substr(aquifer_vulnerability_code.description, 1, 100) as vulnerability,
    substr(aquifer_productivity_code.description, 1, 100) as productivity,
    substr(aquifer_demand_code.description, 1, 100) as demand,
    substr(water_use_code.description, 1, 100) as water_use,
    substr(quality_concern_code.description, 1, 100) as quality_concern,
    substr(aquifer.litho_stratographic_unit, 1, 100) as litho_stratographic_unit,
    aquifer.mapping_year,
    substr(aquifer.notes, 1, 2000) as notes
from aquifer
    left join aquifer_material_code on
        aquifer_material_code.aquifer_material_code = aquifer.aquifer_material_code
    left join aquifer_subtype_code on
        aquifer_subtype_code.aquifer_subtype_code = aquifer.aquifer_subtype_code
    left join aquifer_vulnerability_code on
        aquifer_vulnerability_code.aquifer_vulnerability_code = aquifer.aquifer_vulnerability_code
    left join aquifer_productivity_code on
        aquifer_productivity_code.aquifer_productivity_code = aquifer.aquifer_productivity_code
    left join aquifer_demand_code on
        aquifer_demand_code.aquifer_demand_code = aquifer.aquifer_demand_code
    left join water_use_code on water_use_code.water_use_code = aquifer.water_use_code
    left join quality_concern_code on
        quality_concern_code.quality_concern_code = aquifer.quality_concern_code
where aquifer.geom is not null
"#
    };
}

pub const WELLS_SQL: &str = concat!(wells_select!(), "    {bounds}\norder by well.well_tag_number\n");
pub const WELLS_WINDOW_SQL: &str = concat!(
    wells_select!(),
    "    and well.well_tag_number >= ? and well.well_tag_number < ?\norder by well.well_tag_number\n"
);
pub const MAX_WELLS_SQL: &str = "select max(well_tag_number) from well";

pub const LITHOLOGY_SQL: &str = concat!(
    lithology_select!(),
    "    {bounds}\norder by well.well_tag_number, lithology_description.lithology_from\n"
);
pub const LITHOLOGY_WINDOW_SQL: &str = concat!(
    lithology_select!(),
    "    and well.well_tag_number >= ? and well.well_tag_number < ?\n",
    "order by well.well_tag_number, lithology_description.lithology_from\n"
);
pub const MAX_LITHOLOGY_SQL: &str = MAX_WELLS_SQL;

pub const AQUIFERS_SQL: &str = concat!(aquifers_select!(), "    {bounds}\norder by aquifer.aquifer_id\n");
pub const AQUIFERS_WINDOW_SQL: &str = concat!(
    aquifers_select!(),
    "    and aquifer.aquifer_id >= ? and aquifer.aquifer_id < ?\norder by aquifer.aquifer_id\n"
);
pub const MAX_AQUIFERS_SQL: &str = "select max(aquifer_id) from aquifer";

pub const WELL_CHUNK_SIZE: usize = 10000;
pub const LITHOLOGY_CHUNK_SIZE: usize = 10000;
pub const AQUIFER_CHUNK_SIZE: usize = 100;

/// One of the published GeoJSON exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ExportKind {
    Wells,
    Lithology,
    Aquifers,
}

impl ExportKind {
    pub const ALL: [ExportKind; 3] = [ExportKind::Wells, ExportKind::Lithology, ExportKind::Aquifers];

    pub fn name(&self) -> &'static str {
        match self {
            ExportKind::Wells => "wells",
            ExportKind::Lithology => "lithology",
            ExportKind::Aquifers => "aquifers",
        }
    }

    /// File name of the pre-generated export and of the download attachment
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportKind::Wells => "wells.json",
            ExportKind::Lithology => "lithology.json",
            ExportKind::Aquifers => "aquifers.json",
        }
    }

    /// Rows fetched per batch (realtime) or keys per window (bulk)
    pub fn default_batch_size(&self) -> usize {
        match self {
            ExportKind::Wells => WELL_CHUNK_SIZE,
            ExportKind::Lithology => LITHOLOGY_CHUNK_SIZE,
            ExportKind::Aquifers => AQUIFER_CHUNK_SIZE,
        }
    }

    /// Restricts rows to those whose location lies inside a bounding box.
    pub fn bounds_predicate(&self) -> BoundsPredicate {
        match self {
            ExportKind::Wells | ExportKind::Lithology => BoundsPredicate::contained_in(
                "well.longitude",
                "well.latitude",
                "well.longitude",
                "well.latitude",
            ),
            ExportKind::Aquifers => BoundsPredicate::contained_in(
                "aquifer.min_lon",
                "aquifer.min_lat",
                "aquifer.max_lon",
                "aquifer.max_lat",
            ),
        }
    }

    /// Realtime query template with its `{bounds}` substitution point.
    pub fn template(&self) -> Result<SqlTemplate> {
        let sql = match self {
            ExportKind::Wells => WELLS_SQL,
            ExportKind::Lithology => LITHOLOGY_SQL,
            ExportKind::Aquifers => AQUIFERS_SQL,
        };
        SqlTemplate::new(sql, self.bounds_predicate())
    }

    /// Bulk query taking a `[lo, hi)` key window.
    pub fn window_sql(&self) -> &'static str {
        match self {
            ExportKind::Wells => WELLS_WINDOW_SQL,
            ExportKind::Lithology => LITHOLOGY_WINDOW_SQL,
            ExportKind::Aquifers => AQUIFERS_WINDOW_SQL,
        }
    }

    pub fn max_key_sql(&self) -> &'static str {
        match self {
            ExportKind::Wells => MAX_WELLS_SQL,
            ExportKind::Lithology => MAX_LITHOLOGY_SQL,
            ExportKind::Aquifers => MAX_AQUIFERS_SQL,
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of writing one export file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub kind: ExportKind,
    pub path: PathBuf,
    pub features: usize,
}

/// Streams the whole of one export into `<output_dir>/<file_name>`, walking
/// the key space a window at a time.
pub fn write_export(
    conn: &Connection,
    kind: ExportKind,
    output_dir: &Path,
    config: &Config,
) -> Result<ExportSummary> {
    let path = output_dir.join(kind.file_name());
    info!("Generating GeoJSON for {}", path.display());

    let chunk_size = i64::try_from(config.batch_size(kind)).unwrap_or(i64::MAX);
    let source = KeyRangeRows::new(conn, kind.window_sql(), kind.max_key_sql(), chunk_size)?;
    let stream = GeoJsonStream::with_options(source, config.stream_options())?;

    let writer = BufWriter::new(File::create(&path)?);
    let features = stream.write_to(writer)?;
    info!("Wrote {} features to {}", features, path.display());

    Ok(ExportSummary {
        kind,
        path,
        features,
    })
}

/// Writes each requested export in turn.
pub fn write_exports(
    conn: &Connection,
    kinds: &[ExportKind],
    output_dir: &Path,
    config: &Config,
) -> Result<Vec<ExportSummary>> {
    info!("Starting GeoJSON export.");
    let summaries = kinds
        .iter()
        .map(|kind| write_export(conn, *kind, output_dir, config))
        .collect::<Result<Vec<_>>>()?;
    info!("GeoJSON export complete.");
    Ok(summaries)
}
