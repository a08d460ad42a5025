use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pp")]
#[command(about = "Petrol Patrol sync CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile upstream FuelCheck data against the stores
    Sync {
        /// Layered config paths in merge order (base -> env -> local)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Compute and report every diff without writing
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Exit non-zero when any write failed
        #[arg(long, default_value_t = false)]
        strict_writes: bool,

        /// Refuse to run when the config has keys the sync never reads
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },

    /// Print the layered config hash and its canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Database commands
    Db {
        /// Layered config naming the database url env var (default PP_DATABASE_URL)
        #[arg(long = "config", global = true)]
        config_paths: Vec<String>,

        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Print the order-insensitive fingerprint of a JSON document
    Fingerprint {
        /// Path to a JSON file
        path: String,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity, schema and per-collection document counts
    Status,
    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env.local if present. Production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    match dispatch(Cli::parse()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<u8> {
    match cli.cmd {
        Commands::Sync {
            config_paths,
            dry_run,
            json,
            strict_writes,
            strict_config,
        } => {
            commands::sync::run_sync(commands::sync::SyncArgs {
                config_paths,
                dry_run,
                json,
                strict_writes,
                strict_config,
            })
            .await
        }

        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(0)
        }

        Commands::Db { config_paths, cmd } => match cmd {
            DbCmd::Status => commands::db::status(&config_paths).await,
            DbCmd::Migrate => commands::db::migrate(&config_paths).await,
        },

        Commands::Fingerprint { path } => commands::fingerprint_file(&path),
    }
}

/// Logs go to stderr so `--json` output stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
