use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde_json::json;
use trailarr::{PlexClient, PlexError};

const TOKEN: &str = "test-token";

type Params = Query<HashMap<String, String>>;

#[derive(Clone, Default)]
struct FakePlex {
    refreshed: Arc<Mutex<Vec<String>>>,
}

fn authorized(params: &HashMap<String, String>) -> bool {
    params.get("X-Plex-Token").map(String::as_str) == Some(TOKEN)
}

async fn sections(Query(params): Params) -> Response {
    if !authorized(&params) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "MediaContainer": {
            "size": 3,
            "Directory": [
                { "key": "1", "title": "Movies", "type": "movie" },
                { "key": "2", "title": "Empty", "type": "movie" },
                { "key": "3", "title": "Broken", "type": "movie" }
            ]
        }
    }))
    .into_response()
}

async fn section_all(Path(key): Path<String>, Query(params): Params) -> Response {
    if !authorized(&params) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match key.as_str() {
        "1" => Json(json!({
            "MediaContainer": {
                "Metadata": [
                    {
                        "ratingKey": "101",
                        "title": "Fantasmas",
                        "Media": [{
                            "Part": [{ "file": "/media/movies/Fantasmas (2024)/Fantasmas.mkv" }]
                        }]
                    },
                    {
                        "ratingKey": "102",
                        "title": "Other",
                        "Media": [{
                            "Part": [{ "file": "/media/movies/Other (2020)/Other.mkv" }]
                        }]
                    },
                    { "ratingKey": "103", "title": "Loose Item" }
                ]
            }
        }))
        .into_response(),
        "2" => Json(json!({ "MediaContainer": { "size": 0 } })).into_response(),
        _ => (StatusCode::OK, "<html>not json</html>").into_response(),
    }
}

async fn refresh(
    State(state): State<FakePlex>,
    Path(key): Path<String>,
    Query(params): Params,
) -> Response {
    if !authorized(&params) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.refreshed.lock().unwrap().push(key);
    StatusCode::OK.into_response()
}

fn fake_plex(state: FakePlex) -> Router {
    Router::new()
        .route("/library/sections", get(sections))
        .route("/library/sections/{key}/all", get(section_all))
        .route("/library/metadata/{key}/refresh", put(refresh))
        .with_state(state)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client_with_token(token: &str) -> (PlexClient, FakePlex) {
    let state = FakePlex::default();
    let base_url = serve(fake_plex(state.clone())).await;
    (PlexClient::new(reqwest::Client::new(), format!("{base_url}/"), token), state)
}

#[tokio::test]
async fn lists_section_keys() {
    let (plex, _) = client_with_token(TOKEN).await;
    assert_eq!(plex.library_sections().await.unwrap(), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn section_items_expose_first_file() {
    let (plex, _) = client_with_token(TOKEN).await;

    let items = plex.section_items("1").await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].rating_key, "101");
    assert_eq!(items[0].file.as_deref(), Some("/media/movies/Fantasmas (2024)/Fantasmas.mkv"));
    assert_eq!(items[2].file, None);

    assert!(plex.section_items("2").await.unwrap().is_empty());
}

#[tokio::test]
async fn media_index_skips_broken_sections() {
    let (plex, _) = client_with_token(TOKEN).await;

    let index = plex.media_index().await.unwrap();
    let keyed: Vec<(&str, &str)> =
        index.iter().map(|(path, key)| (path.as_str(), key.as_str())).collect();
    assert_eq!(
        keyed,
        vec![
            ("/media/movies/Fantasmas (2024)/Fantasmas.mkv", "101"),
            ("/media/movies/Other (2020)/Other.mkv", "102"),
            ("Loose Item", "103"),
        ]
    );
}

fn listing(items: &[(&str, &str)]) -> Json<serde_json::Value> {
    let metadata: Vec<_> = items
        .iter()
        .map(|(key, file)| {
            json!({ "ratingKey": key, "title": key, "Media": [{ "Part": [{ "file": file }] }] })
        })
        .collect();
    Json(json!({ "MediaContainer": { "Metadata": metadata } }))
}

fn two_sections() -> Json<serde_json::Value> {
    Json(json!({ "MediaContainer": { "Directory": [{ "key": "1" }, { "key": "2" }] } }))
}

#[tokio::test]
async fn refresh_directory_uses_first_listed_match() {
    let state = FakePlex::default();
    let app = Router::new()
        .route("/library/sections", get(|| async { two_sections() }))
        .route(
            "/library/sections/{key}/all",
            get(|Path(key): Path<String>| async move {
                match key.as_str() {
                    "1" => listing(&[("201", "/z/Fantasmas/f.mkv"), ("202", "/a/Fantasmas/f.mkv")]),
                    _ => listing(&[("203", "/0/Fantasmas/f.mkv")]),
                }
            }),
        )
        .route("/library/metadata/{key}/refresh", put(refresh))
        .with_state(state.clone());
    let plex = PlexClient::new(reqwest::Client::new(), serve(app).await, TOKEN);

    let index = plex.media_index().await.unwrap();
    let keys: Vec<&str> = index.iter().map(|(_, key)| key.as_str()).collect();
    assert_eq!(keys, vec!["201", "202", "203"]);

    assert_eq!(plex.refresh_directory("Fantasmas").await.unwrap().as_deref(), Some("201"));
    assert_eq!(*state.refreshed.lock().unwrap(), vec!["201".to_string()]);
}

#[tokio::test]
async fn failing_section_aborts_refresh() {
    let state = FakePlex::default();
    let app = Router::new()
        .route("/library/sections", get(|| async { two_sections() }))
        .route(
            "/library/sections/{key}/all",
            get(|Path(key): Path<String>| async move {
                match key.as_str() {
                    "1" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
                    _ => listing(&[("301", "/movies/Fantasmas/f.mkv")]).into_response(),
                }
            }),
        )
        .route("/library/metadata/{key}/refresh", put(refresh))
        .with_state(state.clone());
    let plex = PlexClient::new(reqwest::Client::new(), serve(app).await, TOKEN);

    match plex.refresh_directory("Fantasmas").await.unwrap_err() {
        PlexError::Http(inner) => {
            assert_eq!(inner.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
        },
        other => panic!("expected http error, got {other:?}"),
    }
    assert!(state.refreshed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_section_body_aborts_index() {
    let app = Router::new()
        .route("/library/sections", get(|| async { two_sections() }))
        .route("/library/sections/{key}/all", get(|| async { "" }));
    let plex = PlexClient::new(reqwest::Client::new(), serve(app).await, TOKEN);

    assert!(matches!(plex.media_index().await.unwrap_err(), PlexError::EmptyResponse));
}

#[tokio::test]
async fn refresh_directory_refreshes_matching_item() {
    let (plex, state) = client_with_token(TOKEN).await;

    let rating_key = plex.refresh_directory("Fantasmas").await.unwrap();

    assert_eq!(rating_key.as_deref(), Some("101"));
    assert_eq!(*state.refreshed.lock().unwrap(), vec!["101".to_string()]);
}

#[tokio::test]
async fn refresh_directory_without_match_does_nothing() {
    let (plex, state) = client_with_token(TOKEN).await;

    assert_eq!(plex.refresh_directory("Nowhere To Be Found").await.unwrap(), None);
    assert!(state.refreshed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let (plex, _) = client_with_token("wrong").await;

    let err = plex.refresh_directory("Fantasmas").await.unwrap_err();
    assert!(matches!(err, PlexError::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn server_errors_are_wrapped() {
    let app = Router::new().route(
        "/library/sections",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let plex = PlexClient::new(reqwest::Client::new(), serve(app).await, TOKEN);

    let err = plex.library_sections().await.unwrap_err();
    match err {
        PlexError::Http(inner) => {
            assert_eq!(inner.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
        },
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_and_malformed_bodies_are_errors() {
    let app = Router::new()
        .route("/library/sections", get(|| async { "" }))
        .route("/library/sections/{key}/all", get(|| async { "{\"MediaContainer\":" }));
    let plex = PlexClient::new(reqwest::Client::new(), serve(app).await, TOKEN);

    assert!(matches!(plex.library_sections().await.unwrap_err(), PlexError::EmptyResponse));
    assert!(matches!(plex.section_items("1").await.unwrap_err(), PlexError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let plex = PlexClient::new(reqwest::Client::new(), format!("http://{addr}"), TOKEN);
    assert!(matches!(plex.library_sections().await.unwrap_err(), PlexError::Http(_)));
}
