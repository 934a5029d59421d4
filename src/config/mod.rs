mod file_config;

pub use file_config::{CatalogConfig, FileConfig, ReconcileConfig};

use crate::catalog_client::DEFAULT_BASE_URL;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that participate in config resolution. Mirrors the fields
/// a TOML config file can override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub catalog_base_url: Option<String>,
    pub catalog_api_key: Option<String>,
    pub catalog_timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub catalog: CatalogSettings,
    pub reconcile: ReconcileSettings,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Snapshots waiting for the worker; beyond this, submissions are dropped.
    pub queue_capacity: usize,
    /// Upper bound on one snapshot's reconciliation.
    pub task_timeout_sec: u64,
    /// Number of recent outcomes kept for inspection.
    pub outcome_log_capacity: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            task_timeout_sec: 30,
            outcome_log_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via the CLI or in the config file")
            })?;

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let catalog_file = file.catalog.unwrap_or_default();
        let api_key = catalog_file
            .api_key
            .or_else(|| cli.catalog_api_key.clone());
        let Some(api_key) = api_key else {
            bail!("catalog api key must be specified via --catalog-api-key or [catalog] api_key");
        };
        let catalog = CatalogSettings {
            base_url: catalog_file
                .base_url
                .or_else(|| cli.catalog_base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            timeout_sec: catalog_file.timeout_sec.unwrap_or(cli.catalog_timeout_sec),
        };

        let reconcile_file = file.reconcile.unwrap_or_default();
        let defaults = ReconcileSettings::default();
        let reconcile = ReconcileSettings {
            queue_capacity: reconcile_file
                .queue_capacity
                .unwrap_or(defaults.queue_capacity),
            task_timeout_sec: reconcile_file
                .task_timeout_sec
                .unwrap_or(defaults.task_timeout_sec),
            outcome_log_capacity: reconcile_file
                .outcome_log_capacity
                .unwrap_or(defaults.outcome_log_capacity),
        };

        Ok(Self {
            db_path,
            port,
            logging_level,
            catalog,
            reconcile,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
