//! Client for the external media catalog (Kinopoisk keyword search).

mod kinopoisk;
mod models;

pub use kinopoisk::{KinopoiskClient, DEFAULT_BASE_URL};

use crate::media_store::MediaRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network failure, timeout or undecodable response body.
    #[error("catalog request failed: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The catalog answered with a non-success status.
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Keyword search against the external catalog.
///
/// Returned records are catalog-only: their `id` is `None` and timestamps
/// are unset until the reconciler persists them.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<MediaRecord>, CatalogError>;
}
