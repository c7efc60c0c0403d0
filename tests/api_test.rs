mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use common::{FakeRemote, course, setup_test_db};
use eduflow::api;
use eduflow::kv::{KeyValueStore, MemoryKvStore};
use eduflow::seed::SeedData;
use eduflow::spillover::DEFAULT_GC_GRACE;
use eduflow::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app_with(
    remote: Arc<FakeRemote>,
    kv: Arc<dyn KeyValueStore>,
    threshold: usize,
) -> (Router, AppState) {
    let state = AppState::new(
        setup_test_db().await,
        kv,
        remote,
        SeedData::default(),
        threshold,
        DEFAULT_GC_GRACE,
    );
    (api::router(state.clone()), state)
}

async fn app() -> (Router, AppState) {
    app_with(
        Arc::new(FakeRemote::with_courses(vec![course("c1")])),
        Arc::new(MemoryKvStore::new(usize::MAX)),
        1_000_000,
    )
    .await
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _state) = app().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_courses_serve_seed_until_first_snapshot() {
    let (app, state) = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/courses").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body[0]["id"], "demo-1");

    state.mirror.refresh().await;
    let response = app
        .oneshot(Request::get("/courses/c1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["title"], "Kelas c1");
}

#[tokio::test]
async fn test_unknown_course_is_404() {
    let (app, _state) = app().await;
    let response = app
        .oneshot(Request::get("/courses/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_submission_is_409() {
    let (app, state) = app().await;
    state.mirror.refresh().await;
    let submission = json!({
        "student_id": "s1",
        "student_name": "Ani",
        "assignment_id": "c1-assign",
        "file_ref": "https://cdn.example.com/tugas.pdf",
        "file_name": "tugas.pdf"
    });

    let first = app
        .clone()
        .oneshot(json_request("POST", "/courses/c1/submissions", submission.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(json_request("POST", "/courses/c1/submissions", submission))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_upload_spills_and_resolves() {
    let (app, _state) = app_with(
        Arc::new(FakeRemote::default()),
        Arc::new(MemoryKvStore::new(usize::MAX)),
        16,
    )
    .await;

    let upload = Request::post("/files")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("a fairly long piece of text"))
        .unwrap();
    let response = app.clone().oneshot(upload).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert_eq!(body["spilled"], true);
    let reference = body["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("LOCAL:file_"));

    let response = app
        .oneshot(
            Request::get(format!("/files/resolve?reference={}", reference))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let content = read_json(response).await["content"].as_str().unwrap().to_string();
    assert!(content.starts_with("data:text/plain;base64,"));
}

#[tokio::test]
async fn test_upload_over_quota_is_507() {
    let (app, _state) = app_with(
        Arc::new(FakeRemote::default()),
        Arc::new(MemoryKvStore::new(8)),
        4,
    )
    .await;

    let upload = Request::post("/files")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("too big for the quota"))
        .unwrap();
    let response = app.oneshot(upload).await.unwrap();
    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
}

#[tokio::test]
async fn test_session_sign_in_and_out() {
    let (app, _state) = app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/session",
            json!({ "user": { "uid": "u1", "email": "ani@sekolah.id" } }),
        ))
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body["state"], "authenticated");
    assert_eq!(body["profile"]["name"], "ani");
    assert_eq!(body["profile"]["role"], "student");

    let response = app
        .oneshot(json_request("POST", "/session", json!({ "user": null })))
        .await
        .unwrap();
    assert_eq!(read_json(response).await["state"], "unauthenticated");
}

#[tokio::test]
async fn test_deck_for_unknown_course_is_rejected() {
    let (app, _state) = app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/flashcards",
            json!({
                "title": "Kosakata",
                "subject": "Bahasa Inggris",
                "course_id": "missing",
                "cards": [{ "question": "cat", "answer": "kucing" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
