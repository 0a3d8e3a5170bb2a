//! Face-restoration proxy to the optional external service.

use axum::extract::State;
use axum::Json;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use scanner::restore::RestoreOutcome;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    /// Base64-encoded image
    pub image: String,
    #[serde(default = "default_fidelity")]
    pub fidelity: f32,
}

fn default_fidelity() -> f32 {
    0.5
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub image: String,
}

pub async fn restore(
    State(state): State<AppState>,
    Json(request): Json<RestoreRequest>,
) -> Result<Json<RestoreResponse>, ApiError> {
    let client = state
        .restore
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("face restoration is not configured"))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&request.image)
        .map_err(|_| ApiError::bad_request("image is not valid base64"))?;

    match client.restore(&bytes, request.fidelity).await {
        RestoreOutcome::Restored(restored) => Ok(Json(RestoreResponse {
            image: base64::engine::general_purpose::STANDARD.encode(restored),
        })),
        RestoreOutcome::Unavailable => Err(ApiError::unavailable("face restoration unavailable")),
    }
}
