// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

/// The single fixed model id this bridge ever reports.
pub const MODEL_ID: &str = "chatgpt-macos";

#[derive(Debug, Serialize)]
pub struct ModelObject {
    pub id: &'static str,
    pub object: &'static str,
    pub owned_by: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub object: &'static str,
    pub data: Vec<ModelObject>,
}

/// `GET /v1/models` — authenticated.
pub async fn list_models(State(_state): State<Arc<AppState>>) -> Json<ModelListResponse> {
    Json(ModelListResponse {
        object: "list",
        data: vec![ModelObject { id: MODEL_ID, object: "model", owned_by: "chatgpt-bridge" }],
    })
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
