//! Scan submission.

use axum::extract::State;
use axum::Json;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use scanner::SubmitOptions;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub username: String,
    #[serde(default)]
    pub providers: Option<Vec<String>>,
    /// Base64-encoded reference face images
    #[serde(default)]
    pub reference_images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub job_id: String,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let mut references = Vec::with_capacity(request.reference_images.len());
    for encoded in &request.reference_images {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| ApiError::bad_request("reference image is not valid base64"))?;
        references.push(bytes);
    }

    let options = SubmitOptions {
        providers: request.providers.unwrap_or_default(),
        references,
    };
    let job_id = state.manager.submit(&request.username, options)?;

    Ok(Json(ScanResponse {
        job_id: job_id.to_string(),
    }))
}
