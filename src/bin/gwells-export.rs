use clap::{Parser, Subcommand};
use gwells_export::config::{load_or_default, Config};
use gwells_export::core::db::open_database;
use gwells_export::exports::{write_exports, ExportKind};
use gwells_export::request::{resolve, ExportParams, ExportResponse};
use gwells_export::storage::Store;
use gwells_export::{ExportError, Result};
use std::collections::HashMap;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gwells-export",
    version,
    about = "GeoJSON exports of groundwater wells, lithology and aquifers"
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the export tables in a database
    Init {
        /// Database file
        database: PathBuf,
    },
    /// Write the pre-generated export files
    Export {
        /// Database file (defaults to database.path from the config)
        database: Option<PathBuf>,

        #[arg(long, help = "Directory the JSON files are written to")]
        output_dir: Option<PathBuf>,

        #[arg(long, value_enum, help = "Only write these exports")]
        only: Vec<ExportKind>,
    },
    /// Stream one export to stdout, optionally limited to a bounding box
    Stream {
        #[arg(value_enum)]
        kind: ExportKind,

        /// Database file (defaults to database.path from the config)
        database: Option<PathBuf>,

        #[arg(long, allow_hyphen_values = true)]
        sw_long: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        sw_lat: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        ne_long: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        ne_lat: Option<String>,

        #[arg(long, help = "Print the pre-generated file location instead of streaming")]
        redirect: bool,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only GeoJSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gwells-export: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn database_path(database: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    database
        .or_else(|| config.database.path.clone())
        .ok_or_else(|| ExportError::Config("no database given and database.path is not configured".to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { database } => {
            Store::open(&database)?;
            info!("Initialized export tables in {}", database.display());
        }
        Commands::Export {
            database,
            output_dir,
            only,
        } => {
            let conn = open_database(database_path(database, &config)?)?;
            let output_dir = output_dir
                .or_else(|| config.export.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let kinds = if only.is_empty() {
                ExportKind::ALL.to_vec()
            } else {
                only
            };
            for summary in write_exports(&conn, &kinds, Path::new(&output_dir), &config)? {
                println!("{}\t{}\t{}", summary.kind, summary.features, summary.path.display());
            }
        }
        Commands::Stream {
            kind,
            database,
            sw_long,
            sw_lat,
            ne_long,
            ne_lat,
            redirect,
        } => {
            let mut query = HashMap::new();
            query.insert("realtime".to_string(), (!redirect).to_string());
            for (name, value) in [
                ("sw_long", sw_long),
                ("sw_lat", sw_lat),
                ("ne_long", ne_long),
                ("ne_lat", ne_lat),
            ] {
                if let Some(value) = value {
                    query.insert(name.to_string(), value);
                }
            }

            match resolve(kind, &ExportParams::from_query(&query), &config)? {
                ExportResponse::Redirect { location } => println!("{}", location),
                ExportResponse::Stream(export) => {
                    let conn = open_database(database_path(database, &config)?)?;
                    let stdout = io::stdout();
                    let features = export.write_to(&conn, BufWriter::new(stdout.lock()))?;
                    info!("Streamed {} features", features);
                }
            }
        }
    }
    Ok(())
}
