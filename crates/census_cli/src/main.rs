//! Command-line driver for `census_core`.
//!
//! # Responsibility
//! - Load configuration, open the profile database and dispatch one use-case.
//! - Decode JSON inputs and print JSON results; no business rules live here.

use anyhow::{Context, Result};
use census_core::db::{open_configured_db, open_db};
use census_core::{
    init_logging_from_config, Citizen, CitizenPatch, CitizenService, CoreConfig, ImportService,
    SqliteCitizenRepository,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "census", version, about = "Citizen import and kinship statistics")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides the profile database)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a batch file `{"citizens": [...]}` as a new import
    Import {
        /// Path to the batch JSON file
        batch: PathBuf,
    },

    /// List every citizen of an import
    Citizens { import_id: i64 },

    /// Apply a partial update from a JSON file to one citizen
    Patch {
        import_id: i64,
        citizen_id: i64,
        /// Path to the patch JSON file
        patch: PathBuf,
    },

    /// Per-month gift counts of an import
    Birthdays { import_id: i64 },

    /// Per-town age percentiles of an import
    Percentiles { import_id: i64 },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchFile {
    citizens: Vec<Citizen>,
}

#[derive(Serialize)]
struct Created {
    import_id: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CoreConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging_from_config(&config).context("failed to initialize logging")?;

    let mut conn = match cli.db.as_deref() {
        Some(path) => open_db(path),
        None => open_configured_db(&config),
    }
    .context("failed to open database")?;
    let repo = SqliteCitizenRepository::try_new(&mut conn)?;

    match cli.command {
        Commands::Import { batch } => {
            let batch: BatchFile = read_json(&batch)?;
            let import_id = ImportService::new(repo).create_import(batch.citizens)?;
            print_json(&Created { import_id })
        }
        Commands::Citizens { import_id } => {
            print_json(&ImportService::new(repo).list_citizens(import_id)?)
        }
        Commands::Patch {
            import_id,
            citizen_id,
            patch,
        } => {
            let patch: CitizenPatch = read_json(&patch)?;
            let updated = CitizenService::new(repo).patch_citizen(import_id, citizen_id, &patch)?;
            print_json(&updated)
        }
        Commands::Birthdays { import_id } => {
            print_json(&ImportService::new(repo).birthdays(import_id)?)
        }
        Commands::Percentiles { import_id } => {
            print_json(&ImportService::new(repo).town_age_percentiles(import_id)?)
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
