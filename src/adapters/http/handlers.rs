//! Request handlers.
//!
//! Bodies are parsed leniently: anything that is not a JSON object is
//! treated as `{}` and then validated by the services, so that malformed
//! requests get the same 400 messages as incomplete ones.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::errors::DomainError;
use crate::domain::models::{ReconciliationEntry, Remark, Settings};
use crate::services::import_parser::entries_from_request;
use crate::services::views::{StudentDetails, StudentRow};
use crate::services::{LeaderboardSort, ScoreInput, StudentInput};

use super::server::AppState;

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

/// Map a domain error onto a status code and error body.
///
/// Storage and serialization failures are logged; their message is still
/// returned so that operators see it in the browser.
pub fn api_error(err: DomainError) -> ApiError {
    let (status, message) = match &err {
        DomainError::ValidationFailed(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        DomainError::StudentNotFound(_) => (StatusCode::NOT_FOUND, "not found".to_string()),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        DomainError::StorageError(_) | DomainError::SerializationError(_) => {
            tracing::error!(error = %err, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    };
    (
        status,
        Json(ErrorResponse {
            ok: false,
            error: message,
        }),
    )
}

/// Parse a request body, falling back to an empty object.
pub fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}))
}

/// Plain `{ok: true}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

const OK: OkResponse = OkResponse { ok: true };

/// Query parameters for the leaderboard.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    #[serde(default)]
    pub sort_by: Option<String>,
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_students(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<StudentRow>>> {
    state.views.list().await.map(Json).map_err(api_error)
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> ApiResult<Json<Value>> {
    let sort = LeaderboardSort::parse(params.sort_by.as_deref());
    let rows = state.views.leaderboard(sort).await.map_err(api_error)?;
    Ok(Json(Value::clone(&rows)))
}

pub async fn export_csv(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let csv = state.views.export_csv().await.map_err(api_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=students_scores.csv",
            ),
        ],
        csv,
    ))
}

pub async fn check_now(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let snapshot = state.reconciler.check_all().await.map_err(api_error)?;
    Ok(Json(json!({ "ok": true, "state": snapshot })))
}

#[derive(Debug, Serialize)]
pub struct MarkViewedResponse {
    pub ok: bool,
    pub entry: ReconciliationEntry,
}

pub async fn mark_viewed(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<MarkViewedResponse>> {
    let body = json_body(&body);
    let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
    let entry = state.reconciler.mark_viewed(name).await.map_err(api_error)?;
    Ok(Json(MarkViewedResponse { ok: true, entry }))
}

/// Mark a student viewed and redirect to their repository.
pub async fn view_repo(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let repo = state.reconciler.open_repo(&name).await.map_err(api_error)?;
    Ok((StatusCode::FOUND, [(header::LOCATION, repo)]))
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<Settings>> {
    state.roster.settings().await.map(Json).map_err(api_error)
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub ok: bool,
    pub settings: Settings,
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<SettingsResponse>> {
    let settings = state
        .roster
        .save_settings(&json_body(&body))
        .await
        .map_err(api_error)?;
    Ok(Json(SettingsResponse { ok: true, settings }))
}

pub async fn import_students(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let entries = entries_from_request(&json_body(&body));
    let summary = state.roster.import(entries).await.map_err(api_error)?;
    Ok(Json(json!({
        "ok": true,
        "added": summary.added,
        "updated": summary.updated,
        "skipped": summary.skipped,
    })))
}

pub async fn add_student(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<OkResponse>> {
    let input = StudentInput::from_json(&json_body(&body));
    state.roster.add(input).await.map_err(api_error)?;
    Ok(Json(OK))
}

pub async fn update_student(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<OkResponse>> {
    let input = StudentInput::from_json(&json_body(&body));
    state.roster.update(input).await.map_err(api_error)?;
    Ok(Json(OK))
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<OkResponse>> {
    let body = json_body(&body);
    let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
    state.roster.delete(name).await.map_err(api_error)?;
    Ok(Json(OK))
}

pub async fn set_score(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let input = ScoreInput::from_json(&json_body(&body));
    let student = state.roster.set_score(input).await.map_err(api_error)?;
    Ok(Json(json!({
        "ok": true,
        "student": {
            "name": student.name,
            "repo": student.repo,
            "scores": student.scores,
        }
    })))
}

pub async fn student_details(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<StudentDetails>> {
    state.views.details(&name).await.map(Json).map_err(api_error)
}

pub async fn get_remarks(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Remark>> {
    state.roster.remarks(&name).await.map(Json).map_err(api_error)
}

#[derive(Debug, Serialize)]
pub struct RemarksResponse {
    pub ok: bool,
    pub remarks: Remark,
}

pub async fn save_remarks(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RemarksResponse>> {
    let remarks = state
        .roster
        .save_remarks(&name, &json_body(&body))
        .await
        .map_err(api_error)?;
    Ok(Json(RemarksResponse { ok: true, remarks }))
}
