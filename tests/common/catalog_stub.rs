//! In-process stub of the Kinopoisk search API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
struct StubState {
    films: Vec<Value>,
    fail: bool,
}

/// Steers the stub catalog from inside a test.
#[derive(Clone, Default)]
pub struct StubCatalogHandle {
    state: Arc<Mutex<StubState>>,
}

impl StubCatalogHandle {
    pub fn set_films(&self, films: Vec<Value>) {
        self.state.lock().unwrap().films = films;
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }
}

/// A film entry in the stub's wire format.
pub fn film(kinopoisk_id: i64, name_en: &str, name_ru: &str) -> Value {
    json!({
        "filmId": kinopoisk_id,
        "nameRu": name_ru,
        "nameEn": name_en,
        "type": "FILM",
        "year": "1999",
        "description": "A stubbed film",
        "posterUrl": format!("https://posters.example.com/{}.jpg", kinopoisk_id),
        "countries": [{"country": "USA"}],
        "genres": [{"genre": "drama"}]
    })
}

async fn search_by_keyword(State(handle): State<StubCatalogHandle>) -> Response {
    let state = handle.state.lock().unwrap();
    if state.fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let films = state.films.clone();
    Json(json!({ "keyword": "", "pagesCount": 1, "films": films })).into_response()
}

/// Bind the stub on a random port and return its base URL and handle.
pub async fn spawn(handle: StubCatalogHandle) -> String {
    let app = Router::new()
        .route("/api/v2.1/films/search-by-keyword", get(search_by_keyword))
        .with_state(handle);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub catalog");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub catalog failed");
    });

    base_url
}
