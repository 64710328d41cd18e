use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use client_core::{
    AdvanceOutcome, HttpProfileService, LoadOutcome, QueueController, QueueEvent, QueueOptions,
    QueuePhase,
};
use serde_json::{json, Value};
use shared::domain::{Decision, ProfileId};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct Backend {
    users: Arc<Vec<u32>>,
    fail_queue: bool,
    likes: Arc<Mutex<Vec<(String, String)>>>,
}

async fn queue(
    State(backend): State<Backend>,
    Path(_viewer): Path<String>,
    Query(query): Query<HashMap<String, usize>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if backend.fail_queue {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "db offline".to_string()));
    }
    let offset = query.get("offset").copied().unwrap_or(0);
    let limit = query.get("limit").copied().unwrap_or(10);
    let page: Vec<Value> = backend
        .users
        .iter()
        .skip(offset)
        .take(limit)
        .map(|id| json!({ "id": id }))
        .collect();
    Ok(Json(Value::Array(page)))
}

async fn user(Path(id): Path<u32>) -> Result<Json<Value>, StatusCode> {
    if id == 4 {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(json!({
        "user": {
            "id": id,
            "name": format!("Member {id}"),
            "role": "Writer",
            "location": "Tulsa, OK",
            "created_at": "2024-01-05 09:00:00"
        }
    })))
}

async fn like(
    State(backend): State<Backend>,
    Path((viewer, target)): Path<(String, String)>,
) -> &'static str {
    backend.likes.lock().await.push((viewer, target));
    "ok"
}

async fn spawn_backend(users: Vec<u32>, fail_queue: bool) -> (String, Backend) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let backend = Backend {
        users: Arc::new(users),
        fail_queue,
        likes: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/users/profile-queue/:viewer", get(queue))
        .route("/users/user/:id", get(user))
        .route("/users/users/:viewer/like/:target", post(like))
        .with_state(backend.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/users"), backend)
}

fn controller_for(base_url: &str) -> Arc<QueueController> {
    let service = HttpProfileService::new(base_url).expect("service");
    QueueController::new(
        Arc::new(service),
        ProfileId::new("viewer-42").expect("viewer"),
        QueueOptions {
            request_timeout: Duration::from_secs(5),
            ..QueueOptions::default()
        },
    )
}

#[tokio::test]
async fn http_500_on_first_page_yields_placeholder_queue() {
    let (base_url, _) = spawn_backend(Vec::new(), true).await;
    let controller = controller_for(&base_url);

    assert_eq!(controller.reset().await, LoadOutcome::FellBack);
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.len, 5);
    assert!(!snapshot.more_available);
    assert_eq!(
        snapshot.current.map(|p| p.id.to_string()),
        Some("mock-1".to_string())
    );
}

#[tokio::test]
async fn swiping_through_the_backend_pages_until_exhausted() {
    let (base_url, backend) = spawn_backend((1..=13).collect(), false).await;
    let controller = controller_for(&base_url);
    let mut events = controller.subscribe_events();

    // user 4 fails its detail fetch and is skipped
    assert_eq!(controller.reset().await, LoadOutcome::Appended { added: 9 });
    let first = controller.snapshot().await;
    assert_eq!(first.offset, 10);
    assert_eq!(
        first.current.as_ref().and_then(|p| p.location.clone()).map(|l| l.state),
        Some("OK".to_string())
    );

    let mut top_ups = Vec::new();
    loop {
        let snapshot = controller.snapshot().await;
        let Some(current) = snapshot.current else {
            break;
        };
        match controller.advance(Decision::Like, &current.id).await {
            AdvanceOutcome::Advanced { top_up, .. } => {
                if let Some(handle) = top_up {
                    top_ups.push(handle.await.expect("join"));
                }
            }
            AdvanceOutcome::Ignored => panic!("advance ignored"),
        }
    }

    assert_eq!(
        top_ups,
        vec![LoadOutcome::Appended { added: 3 }, LoadOutcome::Exhausted]
    );
    assert_eq!(controller.phase().await, QueuePhase::Exhausted);
    assert_eq!(controller.snapshot().await.len, 12);

    let mut recorded = 0;
    while recorded < 12 {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Ok(QueueEvent::DecisionRecorded { .. })) => recorded += 1,
            Ok(Ok(_)) => {}
            other => panic!("missing decision events: {other:?}"),
        }
    }
    let likes = backend.likes.lock().await;
    assert_eq!(likes.len(), 12);
    assert!(likes.iter().all(|(viewer, _)| viewer == "viewer-42"));
}
