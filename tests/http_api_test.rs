//! End-to-end tests of the HTTP API against a temporary store and a fake
//! repository host.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use common::{commit, temp_store, FakeHost};
use homework_tracker::domain::models::CommitCount;
use homework_tracker::{AppState, HttpServer, HttpServerConfig, JsonStore, ResponseCache};

struct TestApp {
    _dir: TempDir,
    store: Arc<JsonStore>,
    host: Arc<FakeHost>,
    router: Router,
}

fn test_app() -> TestApp {
    let (dir, store) = temp_store();
    let host = FakeHost::new();
    let state = Arc::new(AppState::new(store.clone(), host.clone(), ResponseCache::new()));
    let router = HttpServer::new(state, HttpServerConfig::default()).router();
    TestApp {
        _dir: dir,
        store,
        host,
        router,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body, headers)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body, _) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(router, uri, body.to_string()).await
}

async fn post_raw(router: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let (status, body, _) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn add(app: &TestApp, name: &str, repo: &str) {
    let (status, body) = post_json(&app.router, "/api/students/add", json!({"name": name, "repo": repo})).await;
    assert_eq!(status, StatusCode::OK, "add {name}: {body}");
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_empty_roster_lists_nothing() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/api/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_add_and_list() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/api/students/add",
        json!({"name": "  alice ", "repo": "https://github.com/alice/hw", "scores": [90, 80, "70", 200, -5]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, list) = get_json(&app.router, "/api/list").await;
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "alice");
    assert_eq!(rows[0]["scores"], json!([90, 80, 70, 100, 0]));
    assert_eq!(rows[0]["avatar_url"], "https://github.com/alice.png?size=80");
    assert_eq!(rows[0]["updated_since_view"], false);
    assert_eq!(rows[0]["commits_count"], 0);
}

#[tokio::test]
async fn test_add_validation_and_conflicts() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let (status, body) = post_json(&app.router, "/api/students/add", json!({"name": "bob"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"ok": false, "error": "missing name or repo"}));

    let (status, body) = post_json(
        &app.router,
        "/api/students/add",
        json!({"name": "alice", "repo": "https://github.com/alice/other"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "name exists");

    let (status, body) = post_json(
        &app.router,
        "/api/students/add",
        json!({"name": "carol", "repo": "https://github.com/alice/hw"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "repo exists");
}

#[tokio::test]
async fn test_malformed_body_is_treated_as_empty() {
    let app = test_app();
    let (status, body) = post_raw(&app.router, "/api/students/add", "not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing name or repo");

    let (status, body) = post_raw(&app.router, "/api/students/delete", "[1,2,3]".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing name");
}

#[tokio::test]
async fn test_update_rename_carries_state_and_remarks() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;
    let (status, _) = post_json(&app.router, "/api/mark_viewed", json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(
        &app.router,
        "/api/students/alice/remarks",
        json!({"text": "great start", "tags": ["diligent"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        &app.router,
        "/api/students/update",
        json!({"old_name": "alice", "name": "alicia", "repo": "https://github.com/alice/hw"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, list) = get_json(&app.router, "/api/list").await;
    assert_eq!(list[0]["name"], "alicia");
    assert!(list[0]["last_viewed_at"].is_string());

    let (_, remarks) = get_json(&app.router, "/api/students/alicia/remarks").await;
    assert_eq!(remarks["text"], "great start");
    assert_eq!(remarks["tags"], json!(["diligent"]));

    let state = app.store.load_state().await.unwrap();
    assert!(state.contains_key("alicia"));
    assert!(!state.contains_key("alice"));
}

#[tokio::test]
async fn test_update_unknown_student() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/api/students/update",
        json!({"name": "ghost", "repo": "https://github.com/ghost/hw"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"ok": false, "error": "not found"}));
}

#[tokio::test]
async fn test_delete_student() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let (status, _) = post_json(&app.router, "/api/students/delete", json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app.router, "/api/students/delete", json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = get_json(&app.router, "/api/list").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_set_score_and_history() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let (status, body) = post_json(
        &app.router,
        "/api/students/score",
        json!({"name": "alice", "phase": "2", "score": 150}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["student"]["scores"], json!([0, 0, 100, 0, 0]));

    // Same value again records nothing new.
    post_json(&app.router, "/api/students/score", json!({"name": "alice", "phase": 2, "score": 100})).await;

    let history = app.store.load_score_history().await.unwrap();
    let events = &history["alice"];
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].phase, 2);
    assert_eq!(events[0].old_score, 0);
    assert_eq!(events[0].new_score, 100);
}

#[tokio::test]
async fn test_set_score_validation() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let cases = [
        (json!({"phase": 1, "score": 50}), StatusCode::BAD_REQUEST, "missing name"),
        (json!({"name": "alice", "score": 50}), StatusCode::BAD_REQUEST, "missing phase or score"),
        (json!({"name": "alice", "phase": "x", "score": 50}), StatusCode::BAD_REQUEST, "invalid phase or score"),
        (json!({"name": "alice", "phase": 5, "score": 50}), StatusCode::BAD_REQUEST, "invalid phase"),
        (json!({"name": "bob", "phase": 0, "score": 50}), StatusCode::NOT_FOUND, "not found"),
    ];
    for (body, expected_status, expected_error) in cases {
        let (status, response) = post_json(&app.router, "/api/students/score", body.clone()).await;
        assert_eq!(status, expected_status, "{body}");
        assert_eq!(response["error"], expected_error, "{body}");
    }
}

#[tokio::test]
async fn test_import_text_and_structured() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let (status, body) = post_json(
        &app.router,
        "/api/students/import",
        json!({
            "students": [{"name": "alice", "repo": "https://github.com/alice/hw2"}],
            "text": "bob,https://github.com/bob/hw\nhttps://github.com/carol/homework\n\ndave https://github.com/bob/hw"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "added": 2, "updated": 1, "skipped": 1}));

    let students = app.store.load_students().await.unwrap();
    let names: Vec<&str> = students.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert_eq!(students[0].repo, "https://github.com/alice/hw2");
}

#[tokio::test]
async fn test_import_without_entries() {
    let app = test_app();
    let (status, body) = post_json(&app.router, "/api/students/import", json!({"text": "\n  \n"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no valid entries");
}

#[tokio::test]
async fn test_leaderboard_ranks_and_sort() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;
    add(&app, "bob", "https://github.com/bob/hw").await;
    post_json(&app.router, "/api/students/score", json!({"name": "bob", "phase": 0, "score": 90})).await;

    app.host.set_repo("https://github.com/alice/hw", Some("2024-03-01T10:00:00Z"), CommitCount::Known(40));
    let (status, _) = post_json(&app.router, "/api/check", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, board) = get_json(&app.router, "/api/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["name"], "bob");
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["name"], "alice");
    assert_eq!(board[1]["rank"], 2);

    let (_, board) = get_json(&app.router, "/api/leaderboard?sort_by=commits_count").await;
    assert_eq!(board[0]["name"], "alice");
    assert_eq!(board[0]["commits_count"], 40);

    let (_, board) = get_json(&app.router, "/api/leaderboard?sort_by=nonsense").await;
    assert_eq!(board[0]["name"], "bob");
}

#[tokio::test]
async fn test_leaderboard_cache_invalidated_by_mutation() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let (_, board) = get_json(&app.router, "/api/leaderboard").await;
    assert_eq!(board.as_array().unwrap().len(), 1);

    add(&app, "bob", "https://github.com/bob/hw").await;
    let (_, board) = get_json(&app.router, "/api/leaderboard").await;
    assert_eq!(board.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_export_csv() {
    let app = test_app();
    add(&app, "alice, jr", "https://github.com/alice/hw").await;
    post_json(&app.router, "/api/students/score", json!({"name": "alice, jr", "phase": 0, "score": 88})).await;

    let request = Request::builder().uri("/api/export/csv").body(Body::empty()).unwrap();
    let (status, body, headers) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=students_scores.csv"
    );

    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with('\u{feff}'));
    let lines: Vec<&str> = text.trim_start_matches('\u{feff}').split("\r\n").collect();
    assert!(lines[0].starts_with("姓名,仓库链接,最后更新时间,最后查看时间,第一阶段"));
    assert!(lines[0].ends_with("平均分"));
    assert_eq!(lines[1], "\"alice, jr\",https://github.com/alice/hw,,,88,0,0,0,0,17.6");
}

#[tokio::test]
async fn test_view_redirects_and_marks_viewed() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;

    let request = Request::builder().uri("/view/alice").body(Body::empty()).unwrap();
    let (status, _, headers) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "https://github.com/alice/hw");

    let state = app.store.load_state().await.unwrap();
    assert!(state["alice"].last_viewed_at.is_some());
    assert_eq!(app.host.calls(), 0);
}

#[tokio::test]
async fn test_view_unknown_student() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/view/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn test_check_then_view_clears_update_flag() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;
    app.host.set_repo("https://github.com/alice/hw", Some("2024-03-01T10:00:00Z"), CommitCount::Known(3));

    let (status, body) = post_json(&app.router, "/api/check", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["alice"]["commits_count"], 3);

    let (_, list) = get_json(&app.router, "/api/list").await;
    assert_eq!(list[0]["updated_since_view"], true);

    let (status, body) = post_json(&app.router, "/api/mark_viewed", json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (_, list) = get_json(&app.router, "/api/list").await;
    assert_eq!(list[0]["updated_since_view"], false);
}

#[tokio::test]
async fn test_mark_viewed_requires_name() {
    let app = test_app();
    let (status, body) = post_json(&app.router, "/api/mark_viewed", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing name");
}

#[tokio::test]
async fn test_settings_round_trip_is_clamped() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"server_poll_interval_seconds": 300, "client_refresh_seconds": 60}));

    let (status, body) = post_json(
        &app.router,
        "/api/settings",
        json!({"server_poll_interval_seconds": 1, "client_refresh_seconds": "99999"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"], json!({"server_poll_interval_seconds": 5, "client_refresh_seconds": 3600}));

    let (_, body) = get_json(&app.router, "/api/settings").await;
    assert_eq!(body["server_poll_interval_seconds"], 5);
}

#[tokio::test]
async fn test_student_details() {
    let app = test_app();
    add(&app, "alice", "https://github.com/alice/hw").await;
    post_json(&app.router, "/api/students/score", json!({"name": "alice", "phase": 0, "score": 95})).await;

    let today = chrono::Utc::now().format("%Y-%m-%dT08:00:00Z").to_string();
    app.host.set_repo("https://github.com/alice/hw", Some(&today), CommitCount::Known(2));
    app.host.set_history(
        "https://github.com/alice/hw",
        vec![commit("aaaaaaa", &today), commit("bbbbbbb", &today)],
    );

    let (status, body) = get_json(&app.router, "/api/students/alice/details").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["student"]["name"], "alice");
    assert_eq!(body["commits"].as_array().unwrap().len(), 2);

    let frequency = body["commit_frequency"].as_array().unwrap();
    assert_eq!(frequency.len(), 30);
    assert_eq!(frequency[29]["count"], 2);

    let trend = body["score_trend"].as_array().unwrap();
    assert_eq!(trend.len(), 5);
    assert_eq!(trend[0], json!({"phase": "第一阶段", "score": 95}));
    assert_eq!(body["score_history"].as_array().unwrap().len(), 1);
    assert_eq!(body["remarks"], json!({"text": "", "tags": [], "updated_at": null}));
}

#[tokio::test]
async fn test_student_details_unknown() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/api/students/ghost/details").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn test_static_pages_when_configured() {
    let (dir, store) = temp_store();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("homework.html"), "<h1>roster</h1>").unwrap();
    std::fs::write(static_dir.join("app.js"), "console.log(1)").unwrap();

    let state = Arc::new(AppState::new(store, FakeHost::new(), ResponseCache::new()));
    let config = HttpServerConfig {
        static_dir: Some(static_dir),
        ..Default::default()
    };
    let router = HttpServer::new(state, config).router();

    let (status, body, _) = send(&router, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>roster</h1>");

    let (status, _, _) = send(&router, Request::builder().uri("/static/app.js").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&router, Request::builder().uri("/leaderboard").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
