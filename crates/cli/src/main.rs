use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Error as AnyhowError;
use clap::Parser;
use db::{DBService, DbErr};
use services::services::{
    autosave::AutosavePolicy,
    config::{
        Config, ConfigError, default_config_path, load_config_from_file, read_config_file,
        save_config_to_file,
    },
    project_sync::{ProjectSyncClient, ProjectSyncError},
    session::{ConfiguredIdentity, Session, SessionError},
    store::DbProjectStore,
};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use uuid::Uuid;

mod commands;
mod prompt;

use commands::Command;

#[derive(Debug, Error)]
pub enum EventflowError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Sync(#[from] ProjectSyncError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

/// Project management for event agencies.
#[derive(Parser, Debug)]
#[command(name = "eventflow", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured database url
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter_string = format!(
        "warn,eventflow_cli={level},services={level},db={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

/// A first run gets a fresh owner id persisted so later runs see the same
/// projects. A config file that does not parse is left alone.
async fn ensure_owner(mut config: Config, path: &Path) -> Result<Config, EventflowError> {
    if config.owner_id.is_none() {
        let owner_id = Uuid::new_v4();
        let mut stored = read_config_file(path).await?.unwrap_or_default();
        stored.owner_id = Some(owner_id);
        save_config_to_file(&stored, path).await?;
        tracing::info!("Created owner {owner_id} in {}", path.display());
        config.owner_id = Some(owner_id);
    }
    Ok(config)
}

async fn connect(config: &Config) -> Result<ProjectSyncClient, EventflowError> {
    let db = DBService::new(&config.database_url).await?;
    let identity = Arc::new(ConfiguredIdentity::from_config(config)?);
    let session = Session::acquire(identity).await?;
    let client = ProjectSyncClient::new(
        Arc::new(DbProjectStore::new(db)),
        session,
        AutosavePolicy::from(&config.autosave),
    );
    client.refresh().await?;
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<(), EventflowError> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    let mut config = load_config_from_file(&config_path).await.with_env_overrides();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let command = match cli.command {
        Command::Offline(command) => {
            println!("{}", commands::run_offline(command, &config).await?);
            return Ok(());
        }
        Command::Store(command) => command,
    };

    let config = ensure_owner(config, &config_path).await?;

    let client = connect(&config).await?;
    let output = commands::run(&client, &config, command).await;
    client.flush().await;
    println!("{}", output?);
    Ok(())
}
