//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with methods for every media-server endpoint.
//! When API routes or request formats change, update only this file.

use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(&self.base_url)
            .send()
            .await
            .expect("home request failed")
    }

    pub async fn lookup(&self, name: &str) -> Response {
        self.client
            .get(format!("{}/v1/media", self.base_url))
            .query(&[("name", name)])
            .send()
            .await
            .expect("lookup request failed")
    }

    pub async fn search_catalog(&self, name: &str) -> Response {
        self.client
            .get(format!("{}/v1/catalog/search", self.base_url))
            .query(&[("name", name)])
            .send()
            .await
            .expect("catalog search request failed")
    }

    pub async fn get_media(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/media/{}", self.base_url, id))
            .send()
            .await
            .expect("get media request failed")
    }

    pub async fn get_media_by_kinopoisk_id(&self, kinopoisk_id: i64) -> Response {
        self.client
            .get(format!(
                "{}/v1/media/kinopoisk/{}",
                self.base_url, kinopoisk_id
            ))
            .send()
            .await
            .expect("get media by kinopoisk id request failed")
    }

    pub async fn create_media(&self, body: &Value) -> Response {
        self.client
            .post(format!("{}/v1/media", self.base_url))
            .json(body)
            .send()
            .await
            .expect("create media request failed")
    }

    pub async fn update_media(&self, id: i64, body: &Value) -> Response {
        self.client
            .put(format!("{}/v1/media/{}", self.base_url, id))
            .json(body)
            .send()
            .await
            .expect("update media request failed")
    }

    pub async fn delete_media(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/v1/media/{}", self.base_url, id))
            .send()
            .await
            .expect("delete media request failed")
    }

    pub async fn reconcile_outcomes(&self, limit: usize) -> Response {
        self.client
            .get(format!("{}/v1/reconcile/outcomes", self.base_url))
            .query(&[("limit", limit)])
            .send()
            .await
            .expect("reconcile outcomes request failed")
    }
}
