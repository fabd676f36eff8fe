//! Mediasync CLI - inspect and exercise content/media relation synchronization

use clap::{Parser, Subcommand};
use mediasync::config::{self, MediaSyncConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "mediasync")]
#[command(version)]
#[command(about = "Keep a content tree and a media tree in step")]
#[command(long_about = r#"
Mediasync mirrors every content node with a media folder and tracks which
media items each content node references:
  • Folders follow their nodes on create, rename, move, copy, trash and delete
  • Media usage is re-diffed on every save
  • Relation data lives in a SQLite database

Example usage:
  mediasync init
  mediasync simulate demos/site.json
  mediasync relations --kind usage
  mediasync audit
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to mediasync.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default mediasync.toml and create the database directory
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Replay a JSON scenario through an in-memory content host
    Simulate {
        /// Scenario script
        script: PathBuf,

        /// Persist relations to this database instead of memory
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Clear relations already stored in --database before running
        #[arg(long, requires = "database")]
        reset: bool,
    },

    /// List stored relations
    Relations {
        /// Only this kind (mirror, usage or a relation type alias)
        #[arg(short, long)]
        kind: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show which content nodes reference a media item
    Usage {
        /// Media item id
        media_id: i64,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Check relation data for duplicate and shared folders
    Audit {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show relation statistics
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a JSON success envelope for a command
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Database path: explicit flag, then config, then the default location
fn resolve_database(flag: Option<PathBuf>, config: &MediaSyncConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = &config.database {
        return Ok(PathBuf::from(path));
    }
    Ok(config::default_database_path_in(&std::env::current_dir()?))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))?.unwrap_or_default();

    let result = match cli.command {
        Commands::Init { force } => commands::run_init(output_mode, &config_path, force),
        Commands::Simulate { script, database, reset } => {
            commands::run_simulate(output_mode, &config, &script, database.as_deref(), reset)
        }
        Commands::Relations { kind, database } => {
            let database = resolve_database(database, &config)?;
            commands::run_relations(output_mode, &database, kind.as_deref())
        }
        Commands::Usage { media_id, database } => {
            let database = resolve_database(database, &config)?;
            commands::run_usage(output_mode, &database, media_id)
        }
        Commands::Audit { database } => {
            let database = resolve_database(database, &config)?;
            commands::run_audit(output_mode, &database)
        }
        Commands::Stats { database } => {
            let database = resolve_database(database, &config)?;
            commands::run_stats(output_mode, &database)
        }
        Commands::Version => commands::run_version(output_mode),
    };

    if let Err(e) = &result {
        if output_mode.is_human() {
            mediasync::ui::error(&format!("{:#}", e));
        }
    }
    result
}

/// Open an existing database, refusing to create one implicitly
fn open_existing(path: &Path) -> anyhow::Result<mediasync::SqliteStore> {
    if !path.exists() {
        anyhow::bail!("no relation database at {} (run `mediasync init` or pass --database)", path.display());
    }
    Ok(mediasync::SqliteStore::open(path)?)
}
