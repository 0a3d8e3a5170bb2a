//! Reverse-image search links.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ReverseImageQuery {
    pub image_url: String,
}

pub async fn lookup(
    Query(query): Query<ReverseImageQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if query.image_url.trim().is_empty() {
        return Err(ApiError::bad_request("image_url is required"));
    }
    let links = scanner::reverse_image::links_for(&query.image_url);
    Ok(Json(json!({ "links": links })))
}
