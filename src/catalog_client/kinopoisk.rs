//! HTTP client for the Kinopoisk unofficial API.

use super::models::SearchByKeywordResponse;
use super::{CatalogClient, CatalogError};
use crate::media_store::MediaRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://kinopoiskapiunofficial.tech";

/// Client for `GET /api/v2.1/films/search-by-keyword`.
pub struct KinopoiskClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl KinopoiskClient {
    pub fn new(base_url: &str, api_key: &str, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CatalogClient for KinopoiskClient {
    async fn search(&self, keyword: &str) -> Result<Vec<MediaRecord>, CatalogError> {
        let url = format!("{}/api/v2.1/films/search-by-keyword", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("keyword", keyword), ("page", "1")])
            .header("X-API-KEY", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        let body: SearchByKeywordResponse = response.json().await?;
        debug!(
            "Catalog returned {} results for keyword {:?}",
            body.films.len(),
            keyword
        );

        Ok(body.films.into_iter().map(|f| f.into_record()).collect())
    }
}
