//! Models listing handler: returns the configured catalog in `OpenAI` format.

use axum::{Json, extract::State};
use gigagate_translate::unix_timestamp;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;

/// Handles `GET /v1/models` requests.
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let created = unix_timestamp();
    let data: Vec<Value> = state
        .config
        .models
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "created": created,
                "owned_by": "Sber",
                "permission": [],
                "root": id,
                "parent": null,
            })
        })
        .collect();

    Json(json!({
        "object": "list",
        "data": data,
    }))
}
