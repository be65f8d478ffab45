//! `tempmail` - disposable email REST API server.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tempmail::{AppState, Settings, retention};
use tempmail_core::Database;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tempmail")]
#[command(about = "Disposable email REST API server")]
#[command(version)]
struct Cli {
    /// Settings file (JSON). Defaults to the platform config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the settings file
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// `SQLite` database file, overriding the settings file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Master key for API key management and ingest
    #[arg(long, env = "TEMPMAIL_MASTER_KEY", hide_env_values = true)]
    master_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempmail=info,tempmail_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }
    if let Some(database) = cli.database {
        settings.database_path = Some(database);
    }
    if cli.master_key.is_some() {
        settings.master_key = cli.master_key;
    }
    if settings.master_key.is_none() {
        warn!("No master key configured; API key management and ingest are disabled");
    }

    info!("Starting tempmail");

    let database_path = settings.database_path();
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = Database::open(&database_path.to_string_lossy())
        .await
        .with_context(|| format!("Failed to open database {}", database_path.display()))?;

    let state = AppState::new(db.clone(), &settings);
    let sweeper = retention::spawn(
        state.messages.clone(),
        state.api_keys.clone(),
        Duration::from_secs(settings.purge_interval_secs),
    );

    let listener = TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;

    tempmail::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutting down");
    })
    .await?;

    sweeper.abort();
    db.close().await;
    Ok(())
}
