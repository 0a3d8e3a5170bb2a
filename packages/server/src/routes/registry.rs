//! Registry hot-reload.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::app::AppState;

pub async fn reload(State(state): State<AppState>) -> Json<serde_json::Value> {
    let providers = state.manager.registry().reload();
    Json(json!({ "providers": providers }))
}
