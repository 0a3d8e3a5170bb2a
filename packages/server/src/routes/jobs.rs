//! Job polling and cancellation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use scanner::JobView;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub limit: Option<usize>,
}

pub async fn poll(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<Json<JobView>, ApiError> {
    let id = parse_job_id(&job_id)?;
    let view = state.manager.get(id, query.limit)?;
    Ok(Json(view))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let id = parse_job_id(&job_id)?;
    state.manager.cancel(id)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "cancelling" }))))
}

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("job not found"))
}
