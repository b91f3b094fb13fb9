// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::{insert_retry_after, resolve_request_id, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<String>,
}

/// `GET /v1/bridge/conversations` — authenticated; runs through the FIFO
/// job queue rather than the completion-only `add_if_idle` gate.
pub async fn list_conversations(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let request_id = resolve_request_id(&headers);
    let meta = ResponseMeta { request_id: request_id.clone(), queue_depth: state.job_queue.depth(), ..Default::default() };

    let job_timeout = Duration::from_millis(state.config.job_timeout_ms);
    let driver = state.driver.clone();
    let result = state.job_queue.enqueue(job_timeout, async move { driver.get_conversations(&request_id).await }).await;

    match result {
        Ok(conversations) => meta.apply(Json(ConversationListResponse { conversations }).into_response()),
        Err(err) => {
            let (status, json) = err.to_http_response();
            let mut response = meta.apply((status, json).into_response());
            insert_retry_after(&mut response, &err);
            response
        }
    }
}

#[cfg(test)]
#[path = "conversations_tests.rs"]
mod tests;
