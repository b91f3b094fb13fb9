// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ready: bool,
    pub mode: String,
    #[serde(rename = "queueDepth")]
    pub queue_depth: usize,
    pub version: &'static str,
    #[serde(rename = "uiAutomation")]
    pub ui_automation: crate::driver::HealthStatus,
}

/// `GET /health` — unauthenticated.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ui_automation = state.driver.health().await;
    Json(HealthResponse {
        ok: ui_automation.ok,
        ready: ui_automation.ok,
        mode: state.config.mode.clone(),
        queue_depth: state.job_queue.depth(),
        version: super::BRIDGE_VERSION,
        ui_automation,
    })
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
