use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::state::{GuardedMediaService, GuardedReconcileLog, ServerState};
use super::{log_requests, metrics, RequestsLoggingLevel, ServerConfig};
use crate::media_service::{LookupError, MediaService};
use crate::media_store::{MediaRecord, StoreError};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct NameQuery {
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct OutcomesQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct DeleteResponse {
    pub deleted: bool,
}

fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => StatusCode::NOT_FOUND.into_response(),
        StoreError::DuplicateKinopoiskId(_) => {
            (StatusCode::CONFLICT, err.to_string()).into_response()
        }
        StoreError::KinopoiskIdMismatch { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        StoreError::Sqlite(_) => {
            error!("Store error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn lookup_error_response(err: LookupError) -> Response {
    match err {
        LookupError::Cancelled => StatusCode::REQUEST_TIMEOUT.into_response(),
        LookupError::Store(err) => store_error_response(err),
        LookupError::Catalog(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn lookup_media(
    State(state): State<ServerState>,
    Query(query): Query<NameQuery>,
) -> Response {
    let cancel = state.shutdown.child_token();
    match state.service.lookup_by_name(&query.name, &cancel).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => lookup_error_response(err),
    }
}

async fn search_catalog(
    State(state): State<ServerState>,
    Query(query): Query<NameQuery>,
) -> Response {
    let cancel = state.shutdown.child_token();
    match state.service.search_catalog(&query.name, &cancel).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => lookup_error_response(err),
    }
}

async fn get_media(
    State(service): State<GuardedMediaService>,
    Path(id): Path<i64>,
) -> Response {
    match service.get_by_id(id) {
        Ok(record) => Json(record).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_media_by_kinopoisk_id(
    State(service): State<GuardedMediaService>,
    Path(kinopoisk_id): Path<i64>,
) -> Response {
    match service.get_by_kinopoisk_id(kinopoisk_id) {
        Ok(record) => Json(record).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn create_media(
    State(service): State<GuardedMediaService>,
    Json(record): Json<MediaRecord>,
) -> Response {
    match service.save_media(&record) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn update_media(
    State(service): State<GuardedMediaService>,
    Path(id): Path<i64>,
    Json(record): Json<MediaRecord>,
) -> Response {
    let record = MediaRecord {
        id: Some(id),
        ..record
    };
    match service.update_media(&record) {
        Ok(updated) => Json(updated).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn delete_media(
    State(service): State<GuardedMediaService>,
    Path(id): Path<i64>,
) -> Response {
    match service.delete_media(id) {
        Ok(deleted) => Json(DeleteResponse { deleted }).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_reconcile_outcomes(
    State(log): State<GuardedReconcileLog>,
    Query(query): Query<OutcomesQuery>,
) -> Response {
    Json(log.recent(query.limit.unwrap_or(50))).into_response()
}

pub fn make_app(
    service: Arc<MediaService>,
    config: ServerConfig,
    shutdown: CancellationToken,
) -> Router {
    let reconcile_log = service.reconcile_log();
    let state = ServerState {
        config,
        start_time: Instant::now(),
        service,
        reconcile_log,
        shutdown,
        hash: env!("GIT_HASH").to_string(),
    };

    let media_routes: Router = Router::new()
        .route("/media", get(lookup_media))
        .route("/media", post(create_media))
        .route("/media/{id}", get(get_media))
        .route("/media/{id}", put(update_media))
        .route("/media/{id}", delete(delete_media))
        .route("/media/kinopoisk/{kinopoisk_id}", get(get_media_by_kinopoisk_id))
        .route("/catalog/search", get(search_catalog))
        .route("/reconcile/outcomes", get(get_reconcile_outcomes))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/v1", media_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    service: Arc<MediaService>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    shutdown: CancellationToken,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
    };
    let app = make_app(service, config, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_client::{CatalogClient, CatalogError};
    use crate::config::ReconcileSettings;
    use crate::media_service::reconcile_channel;
    use crate::media_store::{MediaKind, MediaStore, SqliteMediaStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct StubCatalog {
        records: Vec<MediaRecord>,
        fail: bool,
    }

    #[async_trait]
    impl CatalogClient for StubCatalog {
        async fn search(&self, _keyword: &str) -> Result<Vec<MediaRecord>, CatalogError> {
            if self.fail {
                Err(CatalogError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ))
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn record(kinopoisk_id: i64, name_en: &str) -> MediaRecord {
        MediaRecord {
            kinopoisk_id,
            kind: MediaKind::Movie,
            name_en: name_en.to_string(),
            year: "2020".to_string(),
            ..MediaRecord::default()
        }
    }

    struct TestApp {
        app: Router,
        store: Arc<SqliteMediaStore>,
        _temp_dir: TempDir,
    }

    fn make_test_app(catalog: StubCatalog) -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteMediaStore::new(temp_dir.path().join("media.db")).unwrap());

        let shutdown = CancellationToken::new();
        let (reconciler, worker) =
            reconcile_channel(store.clone(), &ReconcileSettings::default(), &shutdown);
        tokio::spawn(worker.run());

        let service = Arc::new(MediaService::new(
            store.clone(),
            Arc::new(catalog),
            reconciler,
        ));
        let config = ServerConfig {
            port: 0,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        TestApp {
            app: make_app(service, config, shutdown),
            store,
            _temp_dir: temp_dir,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &impl serde::Serialize) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn home_reports_uptime_and_hash() {
        let test_app = make_test_app(StubCatalog {
            records: Vec::new(),
            fail: false,
        });

        let response = test_app.app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body.get("uptime").is_some());
        assert!(body.get("hash").is_some());
    }

    #[tokio::test]
    async fn lookup_returns_merged_results() {
        let test_app = make_test_app(StubCatalog {
            records: vec![record(5, "New title"), record(9, "Other")],
            fail: false,
        });
        test_app.store.create(&record(5, "Old title")).unwrap();

        let response = test_app
            .app
            .oneshot(get_request("/v1/media?name=title"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name_en"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["New title", "Other"]);
    }

    #[tokio::test]
    async fn lookup_without_name_is_a_bad_request() {
        let test_app = make_test_app(StubCatalog {
            records: Vec::new(),
            fail: false,
        });

        let response = test_app
            .app
            .oneshot(get_request("/v1/media"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lookup_survives_catalog_failure() {
        let test_app = make_test_app(StubCatalog {
            records: Vec::new(),
            fail: true,
        });
        test_app.store.create(&record(5, "Local only")).unwrap();

        let response = test_app
            .app
            .oneshot(get_request("/v1/media?name=local"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn direct_catalog_search_maps_failure_to_bad_gateway() {
        let test_app = make_test_app(StubCatalog {
            records: Vec::new(),
            fail: true,
        });

        let response = test_app
            .app
            .oneshot(get_request("/v1/catalog/search?name=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let test_app = make_test_app(StubCatalog {
            records: Vec::new(),
            fail: false,
        });
        let app = test_app.app;

        // Create
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/media", &record(301, "Amelie")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();

        // Duplicate create conflicts
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/media", &record(301, "Amelie")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Read back by both keys
        let response = app
            .clone()
            .oneshot(get_request(&format!("/v1/media/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/v1/media/kinopoisk/301"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Update
        let mut renamed = record(301, "Amélie");
        renamed.id = Some(id);
        let response = app
            .clone()
            .oneshot(json_request("PUT", &format!("/v1/media/{}", id), &renamed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["name_en"], "Amélie");

        // Update with a different kinopoisk_id is rejected
        let mut hijacked = record(999, "Amélie");
        hijacked.id = Some(id);
        let response = app
            .clone()
            .oneshot(json_request("PUT", &format!("/v1/media/{}", id), &hijacked))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Delete twice: first removes, second reports deleted=false
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/v1/media/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["deleted"], true);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/v1/media/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["deleted"], false);

        // Gone
        let response = app
            .oneshot(get_request(&format!("/v1/media/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reconcile_outcomes_endpoint_returns_a_list() {
        let test_app = make_test_app(StubCatalog {
            records: Vec::new(),
            fail: false,
        });

        let response = test_app
            .app
            .oneshot(get_request("/v1/reconcile/outcomes?limit=10"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await.is_array());
    }
}
