use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tokio_util::sync::CancellationToken;
use watchlist_media_server::catalog_client::KinopoiskClient;
use watchlist_media_server::config::{AppConfig, CliConfig, FileConfig};
use watchlist_media_server::media_service::{spawn_reconciler, MediaService};
use watchlist_media_server::media_store::SqliteMediaStore;
use watchlist_media_server::server::{metrics, run_server, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite media database file (created if missing).
    #[clap(value_parser = parse_path)]
    pub media_db: Option<PathBuf>,

    /// Path to a TOML config file; its values override the CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// API key for the external catalog. Falls back to the
    /// KINOPOISK_API_KEY environment variable.
    #[clap(long)]
    pub catalog_api_key: Option<String>,

    /// Base URL of the external catalog API.
    #[clap(long)]
    pub catalog_base_url: Option<String>,

    /// Timeout in seconds for catalog requests.
    #[clap(long, default_value_t = 10)]
    pub catalog_timeout_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        db_path: cli_args.media_db,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        catalog_base_url: cli_args.catalog_base_url,
        catalog_api_key: cli_args
            .catalog_api_key
            .or_else(|| std::env::var("KINOPOISK_API_KEY").ok()),
        catalog_timeout_sec: cli_args.catalog_timeout_sec,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening SQLite media database at {:?}...", config.db_path);
    let store = Arc::new(SqliteMediaStore::new(&config.db_path)?);

    let catalog = Arc::new(KinopoiskClient::new(
        &config.catalog.base_url,
        &config.catalog.api_key,
        config.catalog.timeout_sec,
    )?);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_token.cancel();
        }
    });

    let reconciler = spawn_reconciler(store.clone(), &config.reconcile, &shutdown);
    let service = Arc::new(MediaService::new(store, catalog, reconciler));

    info!("Ready to serve at port {}!", config.port);
    run_server(service, config.logging_level, config.port, shutdown).await
}
