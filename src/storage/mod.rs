//! Export store: the SQLite schema the export queries read, and its write path.
//!
//! Dependent columns are derived explicitly when a record is written: an
//! aquifer's extent columns come from `derive_extent` on its geometry, so the
//! bounds predicate never sees stale values.
use crate::core::db::connection::{open_database, open_in_memory};
use crate::core::{ExportError, Result};
use crate::extent::Extent;
use rusqlite::{named_params, Connection};
use std::path::Path;
use tracing::{debug, error};

/// Code tables shared by the exports, each `(code TEXT PRIMARY KEY, description)`.
pub const CODE_TABLES: &[&str] = &[
    "well_status_code",
    "licenced_status_code",
    "well_class_code",
    "intended_water_use_code",
    "well_yield_unit_code",
    "lithology_colour_code",
    "lithology_description_code",
    "lithology_material_code",
    "lithology_hardness_code",
    "aquifer_material_code",
    "aquifer_subtype_code",
    "aquifer_vulnerability_code",
    "aquifer_productivity_code",
    "aquifer_demand_code",
    "water_use_code",
    "quality_concern_code",
];

const WELL_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS well (
    well_tag_number INTEGER PRIMARY KEY,
    identification_plate_number INTEGER,
    well_status_code TEXT REFERENCES well_status_code (well_status_code),
    licenced_status_code TEXT REFERENCES licenced_status_code (licenced_status_code),
    well_class_code TEXT REFERENCES well_class_code (well_class_code),
    intended_water_use_code TEXT REFERENCES intended_water_use_code (intended_water_use_code),
    well_yield_unit_code TEXT REFERENCES well_yield_unit_code (well_yield_unit_code),
    well_publication_status_code TEXT DEFAULT 'Published',
    street_address TEXT,
    artesian_flow DECIMAL(7,2),
    artesian_pressure DECIMAL(5,2),
    finished_well_depth DECIMAL(7,2),
    diameter DECIMAL(8,3),
    static_water_level DECIMAL(7,2),
    bedrock_depth DECIMAL(7,2),
    well_yield DECIMAL(8,3),
    aquifer_id INTEGER,
    longitude REAL,
    latitude REAL
)"#;

const LITHOLOGY_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS lithology_description (
    lithology_description_id INTEGER PRIMARY KEY AUTOINCREMENT,
    well_tag_number INTEGER NOT NULL REFERENCES well (well_tag_number),
    lithology_from DECIMAL(7,2),
    lithology_to DECIMAL(7,2),
    lithology_colour_code TEXT REFERENCES lithology_colour_code (lithology_colour_code),
    lithology_description_code TEXT REFERENCES lithology_description_code (lithology_description_code),
    lithology_material_code TEXT REFERENCES lithology_material_code (lithology_material_code),
    lithology_hardness_code TEXT REFERENCES lithology_hardness_code (lithology_hardness_code),
    lithology_observation TEXT
)"#;

const AQUIFER_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS aquifer (
    aquifer_id INTEGER PRIMARY KEY,
    aquifer_name TEXT,
    location_description TEXT,
    aquifer_material_code TEXT REFERENCES aquifer_material_code (aquifer_material_code),
    aquifer_subtype_code TEXT REFERENCES aquifer_subtype_code (aquifer_subtype_code),
    aquifer_vulnerability_code TEXT REFERENCES aquifer_vulnerability_code (aquifer_vulnerability_code),
    aquifer_productivity_code TEXT REFERENCES aquifer_productivity_code (aquifer_productivity_code),
    aquifer_demand_code TEXT REFERENCES aquifer_demand_code (aquifer_demand_code),
    water_use_code TEXT REFERENCES water_use_code (water_use_code),
    quality_concern_code TEXT REFERENCES quality_concern_code (quality_concern_code),
    litho_stratographic_unit TEXT,
    mapping_year INTEGER,
    notes TEXT,
    geom JSON,
    min_lon REAL,
    min_lat REAL,
    max_lon REAL,
    max_lat REAL
)"#;

/// A well record as written to the store.
#[derive(Debug, Clone, Default)]
pub struct NewWell {
    pub well_tag_number: i64,
    pub identification_plate_number: Option<i64>,
    pub well_status_code: Option<String>,
    pub licenced_status_code: Option<String>,
    pub well_class_code: Option<String>,
    pub intended_water_use_code: Option<String>,
    pub well_yield_unit_code: Option<String>,
    /// `None` is treated as published
    pub publication_status: Option<String>,
    pub street_address: Option<String>,
    pub artesian_flow: Option<f64>,
    pub artesian_pressure: Option<f64>,
    pub finished_well_depth: Option<f64>,
    pub diameter: Option<f64>,
    pub static_water_level: Option<f64>,
    pub bedrock_depth: Option<f64>,
    pub well_yield: Option<f64>,
    pub aquifer_id: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

/// One lithology interval of a well.
#[derive(Debug, Clone, Default)]
pub struct NewLithology {
    pub well_tag_number: i64,
    pub lithology_from: Option<f64>,
    pub lithology_to: Option<f64>,
    pub colour_code: Option<String>,
    pub description_code: Option<String>,
    pub material_code: Option<String>,
    pub hardness_code: Option<String>,
    pub observation: Option<String>,
}

/// An aquifer record; `geometry` is a GeoJSON polygon or multipolygon.
#[derive(Debug, Clone, Default)]
pub struct NewAquifer {
    pub aquifer_id: i64,
    pub name: Option<String>,
    pub location_description: Option<String>,
    pub material_code: Option<String>,
    pub subtype_code: Option<String>,
    pub vulnerability_code: Option<String>,
    pub productivity_code: Option<String>,
    pub demand_code: Option<String>,
    pub water_use_code: Option<String>,
    pub quality_concern_code: Option<String>,
    pub litho_stratographic_unit: Option<String>,
    pub mapping_year: Option<i64>,
    pub notes: Option<String>,
    pub geometry: Option<serde_json::Value>,
}

/// Computes the columns that depend on a geometry: its extent.
pub fn derive_extent(geometry: Option<&serde_json::Value>) -> Result<Option<Extent>> {
    match geometry {
        Some(geometry) => Extent::of_geometry(geometry.clone()),
        None => Ok(None),
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (and initialise) the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Initializing export store at {:?}", path.as_ref());
        let store = Store {
            conn: open_database(path)?,
        };
        store.init()?;
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn in_memory() -> Result<Self> {
        let store = Store {
            conn: open_in_memory()?,
        };
        store.init()?;
        Ok(store)
    }

    /// Create any missing tables
    fn init(&self) -> Result<()> {
        for table in CODE_TABLES {
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} ({table} TEXT PRIMARY KEY, description TEXT NOT NULL)"
                ),
                [],
            )?;
        }
        self.conn.execute(WELL_TABLE_SQL, [])?;
        self.conn.execute(LITHOLOGY_TABLE_SQL, [])?;
        self.conn.execute(AQUIFER_TABLE_SQL, [])?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Add or replace a code table entry. `table` must be one of [`CODE_TABLES`].
    pub fn add_code(&self, table: &str, code: &str, description: &str) -> Result<()> {
        if !CODE_TABLES.contains(&table) {
            return Err(ExportError::Schema(format!("unknown code table {:?}", table)));
        }
        self.conn.execute(
            &format!("INSERT OR REPLACE INTO {table} ({table}, description) VALUES (?1, ?2)"),
            (code, description),
        )?;
        Ok(())
    }

    pub fn add_well(&self, well: &NewWell) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO well (
                well_tag_number, identification_plate_number, well_status_code,
                licenced_status_code, well_class_code, intended_water_use_code,
                well_yield_unit_code, well_publication_status_code, street_address,
                artesian_flow, artesian_pressure, finished_well_depth, diameter,
                static_water_level, bedrock_depth, well_yield, aquifer_id, longitude, latitude
            ) VALUES (
                :well_tag_number, :identification_plate_number, :well_status_code,
                :licenced_status_code, :well_class_code, :intended_water_use_code,
                :well_yield_unit_code, :publication_status, :street_address,
                :artesian_flow, :artesian_pressure, :finished_well_depth, :diameter,
                :static_water_level, :bedrock_depth, :well_yield, :aquifer_id, :longitude, :latitude
            )",
            named_params! {
                ":well_tag_number": well.well_tag_number,
                ":identification_plate_number": well.identification_plate_number,
                ":well_status_code": well.well_status_code,
                ":licenced_status_code": well.licenced_status_code,
                ":well_class_code": well.well_class_code,
                ":intended_water_use_code": well.intended_water_use_code,
                ":well_yield_unit_code": well.well_yield_unit_code,
                ":publication_status": well.publication_status,
                ":street_address": well.street_address,
                ":artesian_flow": well.artesian_flow,
                ":artesian_pressure": well.artesian_pressure,
                ":finished_well_depth": well.finished_well_depth,
                ":diameter": well.diameter,
                ":static_water_level": well.static_water_level,
                ":bedrock_depth": well.bedrock_depth,
                ":well_yield": well.well_yield,
                ":aquifer_id": well.aquifer_id,
                ":longitude": well.longitude,
                ":latitude": well.latitude,
            },
        );

        match result {
            Ok(_) => {
                debug!("Added well {}", well.well_tag_number);
                Ok(())
            }
            Err(e) => {
                error!("Failed to add well {}: {}", well.well_tag_number, e);
                Err(e.into())
            }
        }
    }

    /// Returns the id of the new lithology interval
    pub fn add_lithology(&self, lithology: &NewLithology) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO lithology_description (
                well_tag_number, lithology_from, lithology_to, lithology_colour_code,
                lithology_description_code, lithology_material_code, lithology_hardness_code,
                lithology_observation
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            (
                lithology.well_tag_number,
                lithology.lithology_from,
                lithology.lithology_to,
                &lithology.colour_code,
                &lithology.description_code,
                &lithology.material_code,
                &lithology.hardness_code,
                &lithology.observation,
            ),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Writes an aquifer, deriving its extent columns from the geometry
    pub fn add_aquifer(&self, aquifer: &NewAquifer) -> Result<()> {
        let extent = derive_extent(aquifer.geometry.as_ref())?;
        let geom = aquifer
            .geometry
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = self.conn.execute(
            "INSERT INTO aquifer (
                aquifer_id, aquifer_name, location_description, aquifer_material_code,
                aquifer_subtype_code, aquifer_vulnerability_code, aquifer_productivity_code,
                aquifer_demand_code, water_use_code, quality_concern_code,
                litho_stratographic_unit, mapping_year, notes, geom,
                min_lon, min_lat, max_lon, max_lat
            ) VALUES (
                :aquifer_id, :name, :location, :material, :subtype, :vulnerability,
                :productivity, :demand, :water_use, :quality_concern, :litho_unit,
                :mapping_year, :notes, :geom, :min_lon, :min_lat, :max_lon, :max_lat
            )",
            named_params! {
                ":aquifer_id": aquifer.aquifer_id,
                ":name": aquifer.name,
                ":location": aquifer.location_description,
                ":material": aquifer.material_code,
                ":subtype": aquifer.subtype_code,
                ":vulnerability": aquifer.vulnerability_code,
                ":productivity": aquifer.productivity_code,
                ":demand": aquifer.demand_code,
                ":water_use": aquifer.water_use_code,
                ":quality_concern": aquifer.quality_concern_code,
                ":litho_unit": aquifer.litho_stratographic_unit,
                ":mapping_year": aquifer.mapping_year,
                ":notes": aquifer.notes,
                ":geom": geom,
                ":min_lon": extent.map(|e| e.min_x),
                ":min_lat": extent.map(|e| e.min_y),
                ":max_lon": extent.map(|e| e.max_x),
                ":max_lat": extent.map(|e| e.max_y),
            },
        );

        match result {
            Ok(_) => {
                debug!("Added aquifer {}", aquifer.aquifer_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to add aquifer {}: {}", aquifer.aquifer_id, e);
                Err(e.into())
            }
        }
    }
}
