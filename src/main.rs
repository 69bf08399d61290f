use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use catalog_seeder::config::SeederConfig;
use catalog_seeder::connection::Connection;
use catalog_seeder::db::Store;
use catalog_seeder::error::SeedError;
use catalog_seeder::logger;
use catalog_seeder::seeder::{SeedReport, Seeder};

/// Load the per-category product CSVs into the catalog database.
#[derive(Debug, Parser)]
#[command(name = "catalog-seeder", version, about)]
struct Args {
    /// YAML config file (default: <config dir>/catalog-seeder/seeder.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the category CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Seed this SQLite file instead of the configured database server
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Only seed these categories (repeatable)
    #[arg(long = "category", value_name = "LABEL")]
    categories: Vec<String>,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = logger::init(args.log_file.as_deref()) {
        eprintln!("{err:#}");
    }

    match run(args) {
        Ok(report) => {
            println!("{report}");
            println!("Database seeding completed.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("fatal error: {err:#}");
            eprintln!("Database seeding failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<SeedReport> {
    let mut config = SeederConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    config.restrict_to(&args.categories)?;

    let conn = match (args.sqlite, config.connection.clone()) {
        (Some(path), _) => Connection::sqlite(path),
        (None, Some(conn)) => conn,
        (None, None) => Connection::from_env()?,
    };

    info!("connecting to {}", conn.describe());
    let mut store = Store::connect(&conn).map_err(SeedError::Connection)?;
    info!("database connection successful");

    let report = Seeder::new(&mut store, &config).run(&config.sheet_sources())?;
    Ok(report)
}
