use crate::ai::{self, Summarizer};
use crate::config::Config;
use crate::ledger::LedgerService;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::model::{ActivityDraft, ActivityPatch, ActivityRecord};
use crate::mood;
use anyhow::anyhow;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

pub const OWNER_HEADER: &str = "x-owner-id";

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub ledger: Arc<LedgerService>,
    pub summarizer: Arc<dyn Summarizer>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/activities", get(activities_list).post(activities_add))
        .route("/api/activities/summary", get(activities_summary))
        .route("/api/activities/dates", get(activities_dates))
        .route(
            "/api/activities/:id",
            put(activities_update).delete(activities_delete),
        )
        .route("/api/mood", get(mood_for_date).post(mood_for_activities))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatesQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct MoodRequest {
    activities: Option<Vec<ActivityDraft>>,
}

async fn status(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "service": "ok",
        "api_port": state.config.api_port,
        "default_owner": state.config.default_owner,
        "ai_enabled": state.config.ai_enabled,
        "ai_configured": state.config.ai_enabled && ai::has_api_key(&state.config),
        "ai_model": state.config.ai_model,
    }))
}

async fn activities_list(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Vec<ActivityRecord>>> {
    let owner = owner_from(&headers, &state.config);
    let date = required_date(query)?;

    let records = blocking(move || state.ledger.list_by_date(&owner, &date)).await?;
    Ok(Json(records))
}

async fn activities_add(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<ActivityDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ActivityRecord>)> {
    let owner = owner_from(&headers, &state.config);
    let Json(draft) = payload?;

    let record = blocking(move || state.ledger.add(&owner, &draft)).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn activities_update(
    State(state): State<ApiState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ActivityPatch>, JsonRejection>,
) -> ApiResult<Json<ActivityRecord>> {
    let owner = owner_from(&headers, &state.config);
    let Path(id) = id?;
    let Json(patch) = payload?;

    let record = blocking(move || state.ledger.update(&owner, id, &patch)).await?;
    Ok(Json(record))
}

async fn activities_delete(
    State(state): State<ApiState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let owner = owner_from(&headers, &state.config);
    let Path(id) = id?;

    let outcome = blocking(move || state.ledger.delete(&owner, id)).await?;
    Ok(Json(json!({
        "success": true,
        "id": outcome.id,
        "removed": outcome.removed,
    })))
}

async fn activities_summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Value>> {
    let owner = owner_from(&headers, &state.config);
    let date = required_date(query)?;
    let response_date = date.clone();

    let rollup = blocking(move || state.ledger.aggregate_for_date(&owner, &date)).await?;
    Ok(Json(json!({
        "date": response_date,
        "total_minutes": rollup.total_minutes,
        "remaining_minutes": rollup.remaining_minutes,
        "completion_percent": rollup.completion_percent,
        "per_category_minutes": rollup.per_category_minutes,
    })))
}

async fn activities_dates(
    State(state): State<ApiState>,
    headers: HeaderMap,
    query: Result<Query<DatesQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let owner = owner_from(&headers, &state.config);
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(7);

    let dates = blocking(move || state.ledger.recent_dates(&owner, limit)).await?;
    Ok(Json(json!({ "dates": dates })))
}

async fn mood_for_activities(
    State(state): State<ApiState>,
    payload: Result<Json<MoodRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let entries = request
        .activities
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            draft.validate_entry().map_err(|err| match err {
                LedgerError::Validation(message) => {
                    LedgerError::validation(format!("activity {index}: {message}"))
                }
                other => other,
            })
        })
        .collect::<LedgerResult<Vec<_>>>()?;
    let prompt = mood::synthesize(&entries)?;

    let text = blocking(move || mood::analyze(state.summarizer.as_ref(), &prompt)).await?;
    Ok(Json(json!({ "mood": text })))
}

async fn mood_for_date(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Value>> {
    let owner = owner_from(&headers, &state.config);
    let date = required_date(query)?;
    let response_date = date.clone();

    let (prompt, text) = blocking(move || {
        let prompt = state.ledger.mood_prompt_for_date(&owner, &date)?;
        let text = mood::analyze(state.summarizer.as_ref(), &prompt)?;
        Ok((prompt, text))
    })
    .await?;

    Ok(Json(json!({
        "date": response_date,
        "total_minutes": prompt.total_minutes,
        "remaining_minutes": prompt.remaining_minutes,
        "mood": text,
    })))
}

fn owner_from(headers: &HeaderMap, config: &Config) -> String {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(&config.default_owner)
        .to_string()
}

fn required_date(query: DateQuery) -> ApiResult<String> {
    query
        .date
        .filter(|date| !date.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Date parameter is required".to_string()))
}

/// Ledger calls may wait on a date lock or a summarizer round-trip, so they run off the
/// async worker threads.
async fn blocking<T, F>(task: F) -> ApiResult<T>
where
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|join_error| ApiError::Internal(anyhow!("ledger task failed: {join_error}")))?
        .map_err(ApiError::from)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    BudgetExceeded { requested: u32, available: u32 },
    Upstream(String),
    Internal(anyhow::Error),
}

impl From<LedgerError> for ApiError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Validation(message) => Self::BadRequest(message),
            LedgerError::NotFound(id) => Self::NotFound(format!("Activity not found: {id}")),
            LedgerError::BudgetExceeded {
                requested,
                available,
            } => Self::BudgetExceeded {
                requested,
                available,
            },
            error @ LedgerError::Summarizer(_) => Self::Upstream(error.to_string()),
            LedgerError::Storage(error) => Self::Internal(error),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "kind": "validation_error" })),
            )
                .into_response(),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": message, "kind": "not_found" })),
            )
                .into_response(),
            ApiError::BudgetExceeded {
                requested,
                available,
            } => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": format!("Daily limit reached. Only {available} minutes left for this date."),
                    "kind": "budget_exceeded",
                    "requested": requested,
                    "available": available,
                })),
            )
                .into_response(),
            ApiError::Upstream(message) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": message, "kind": "summarizer_failure" })),
            )
                .into_response(),
            ApiError::Internal(error) => {
                error!(error = %format!("{error:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": error.to_string(), "kind": "storage_failure" })),
                )
                    .into_response()
            }
        }
    }
}
