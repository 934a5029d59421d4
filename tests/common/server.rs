//! Test server lifecycle management
//!
//! Spawns the real app (with the real catalog client pointed at the stub)
//! on a random port. When dropped, the server shuts down and the temp
//! database is cleaned up.

use super::catalog_stub::{self, StubCatalogHandle};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use watchlist_media_server::catalog_client::KinopoiskClient;
use watchlist_media_server::config::ReconcileSettings;
use watchlist_media_server::media_service::{spawn_reconciler, MediaService};
use watchlist_media_server::media_store::{MediaStore, SqliteMediaStore};
use watchlist_media_server::server::{make_app, RequestsLoggingLevel, ServerConfig};

const SERVER_READY_TIMEOUT_MS: u64 = 5_000;

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Steers the stub catalog backing this server
    pub catalog: StubCatalogHandle,

    /// Direct store access for seeding and asserting on reconciled state
    pub store: Arc<SqliteMediaStore>,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port, backed by a fresh
    /// temporary database and a stub catalog.
    pub async fn spawn() -> Self {
        let catalog_handle = StubCatalogHandle::default();
        let catalog_url = catalog_stub::spawn(catalog_handle.clone()).await;

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteMediaStore::new(temp_dir.path().join("media.db"))
                .expect("Failed to open media store"),
        );

        let catalog = Arc::new(
            KinopoiskClient::new(&catalog_url, "test-key", 5)
                .expect("Failed to build catalog client"),
        );

        let shutdown = CancellationToken::new();
        let reconciler = spawn_reconciler(
            store.clone() as Arc<dyn MediaStore>,
            &ReconcileSettings::default(),
            &shutdown,
        );
        let service = Arc::new(MediaService::new(store.clone(), catalog, reconciler));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().expect("Failed to get local address").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let app = make_app(service, config, shutdown.clone());

        let serve_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            catalog: catalog_handle,
            store,
            _temp_dir: temp_dir,
            shutdown,
        };

        server.wait_for_ready().await;
        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            if start.elapsed() > timeout {
                panic!("Test server did not become ready within {:?}", timeout);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Polls until `predicate` returns true or a timeout expires. Background
    /// reconciliation has no completion signal by design, so tests observe
    /// its side effects this way.
    pub async fn wait_until<F: Fn() -> bool>(&self, predicate: F, what: &str) {
        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);
        while !predicate() {
            if start.elapsed() > timeout {
                panic!("Timed out waiting for: {}", what);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
