use std::path::PathBuf;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};

mod commands;

mod config;
use config::Config;

mod db;
use db::Database;

mod error;
pub(crate) use error::{ApiError, ApiResult};

mod slug;

mod store;
use store::PasteStore;

pub(crate) mod types;

#[derive(Debug, Parser)]
#[command(name = "minibin", version, about = "A minimal paste-sharing service.")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Delete expired pastes and exit.
    PurgeExpired,
}

#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub store: PasteStore,
}

impl App {
    async fn build(config: Config) -> anyhow::Result<Self> {
        let database = Database::connect(&config.database)
            .await
            .context("failed to connect to the database")?;
        database
            .init_schema()
            .await
            .context("failed to initialize the database schema")?;

        let store = PasteStore::new(database, config.limits.clone());

        Ok(Self { config, store })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    let app = App::build(config).await?;

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::PurgeExpired => commands::purge_expired::run(app).await,
    }
}
