use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    queue_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    decisions: Arc<Mutex<Vec<(String, String, String)>>>,
}

async fn handle_queue(
    State(state): State<ServerState>,
    Path(viewer): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!(viewer, "viewer-1");
    state.queue_queries.lock().await.push(query);
    Json(json!([5, "six", {"id": 7}]))
}

async fn handle_user(Path(id): Path<String>) -> Result<Json<Value>, (StatusCode, String)> {
    match id.as_str() {
        "5" => Ok(Json(json!({
            "user": {"id": 5, "name": "Morgan", "role": "Producer", "location": "Boise, ID"}
        }))),
        "six" => Ok(Json(json!({"id": "six", "name": "Quinn", "role": "", "location": ""}))),
        "garbled" => Ok(Json(json!({"unexpected": true}))),
        _ => Err((StatusCode::NOT_FOUND, "no such user".to_string())),
    }
}

async fn handle_decision(
    State(state): State<ServerState>,
    Path((viewer, decision, target)): Path<(String, String, String)>,
) -> StatusCode {
    state.decisions.lock().await.push((viewer, decision, target));
    StatusCode::NO_CONTENT
}

async fn handle_matches(Path(viewer): Path<String>) -> Json<Value> {
    assert_eq!(viewer, "viewer-1");
    Json(json!({"matches": [3, 4]}))
}

async fn spawn_profile_server() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/users/profile-queue/:viewer", get(handle_queue))
        .route("/users/user/:id", get(handle_user))
        .route("/users/users/:viewer/:decision/:target", post(handle_decision))
        .route("/users/matches/:viewer", get(handle_matches))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/users"), state))
}

fn viewer() -> ProfileId {
    ProfileId::new("viewer-1").expect("viewer")
}

#[tokio::test]
async fn profile_queue_sends_offset_and_limit() {
    let (base_url, state) = spawn_profile_server().await.expect("spawn server");
    let service = HttpProfileService::new(&base_url).expect("service");

    let ids = service
        .fetch_profile_queue(&viewer(), 20, 10)
        .await
        .expect("queue");
    let ids: Vec<&str> = ids.iter().map(ProfileId::as_str).collect();
    assert_eq!(ids, vec!["5", "six", "7"]);

    let queries = state.queue_queries.lock().await;
    assert_eq!(queries[0].get("offset").map(String::as_str), Some("20"));
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("10"));
}

#[tokio::test]
async fn profile_detail_maps_wrapped_and_bare_records() {
    let (base_url, _) = spawn_profile_server().await.expect("spawn server");
    let service = HttpProfileService::new(&base_url).expect("service");

    let morgan = service
        .fetch_profile(&ProfileId::new("5").expect("id"))
        .await
        .expect("profile");
    assert_eq!(morgan.name, "Morgan");
    assert_eq!(morgan.location.map(|l| l.city), Some("Boise".to_string()));

    let quinn = service
        .fetch_profile(&ProfileId::new("six").expect("id"))
        .await
        .expect("profile");
    assert_eq!(quinn.name, "Quinn");
    assert!(quinn.location.is_none());
}

#[tokio::test]
async fn non_success_status_carries_status_and_body() {
    let (base_url, _) = spawn_profile_server().await.expect("spawn server");
    let service = HttpProfileService::new(&base_url).expect("service");

    let err = service
        .fetch_profile(&ProfileId::new("404").expect("id"))
        .await
        .expect_err("should fail");
    match err {
        ServiceError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such user");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_record_is_a_decode_error() {
    let (base_url, _) = spawn_profile_server().await.expect("spawn server");
    let service = HttpProfileService::new(&base_url).expect("service");

    let err = service
        .fetch_profile(&ProfileId::new("garbled").expect("id"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, ServiceError::Decode(_)), "unexpected: {err}");
}

#[tokio::test]
async fn decisions_post_to_like_and_dislike_paths() {
    let (base_url, state) = spawn_profile_server().await.expect("spawn server");
    let service = HttpProfileService::new(&base_url).expect("service");
    let target = ProfileId::new("5").expect("id");

    service
        .post_decision(&viewer(), &target, Decision::Like)
        .await
        .expect("like");
    service
        .record_decision(&viewer(), &target, Decision::Dislike)
        .await
        .expect("dislike");

    let decisions = state.decisions.lock().await;
    assert_eq!(
        *decisions,
        vec![
            ("viewer-1".to_string(), "like".to_string(), "5".to_string()),
            ("viewer-1".to_string(), "dislike".to_string(), "5".to_string()),
        ]
    );
}

#[tokio::test]
async fn matches_are_listed() {
    let (base_url, _) = spawn_profile_server().await.expect("spawn server");
    let service = HttpProfileService::new(&base_url).expect("service");

    let matches = service.fetch_matches(&viewer()).await.expect("matches");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[1].as_str(), "4");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = HttpProfileService::new(&format!("http://{addr}/users")).expect("service");
    let err = service
        .fetch_profile_queue(&viewer(), 0, 10)
        .await
        .expect_err("should fail");
    assert!(matches!(err, ServiceError::Transport(_)), "unexpected: {err}");
    assert!(err.status().is_none());
}

#[test]
fn ids_are_percent_encoded_as_path_segments() {
    let service = HttpProfileService::new("http://localhost:3000/users/").expect("service");
    let url = service.endpoint(&["user", "a/b c"]).expect("url");
    assert_eq!(url.as_str(), "http://localhost:3000/users/user/a%2Fb%20c");
}
