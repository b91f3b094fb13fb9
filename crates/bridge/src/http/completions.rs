// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /v1/chat/completions` — the full request lifecycle: schema parse,
//! session routing, prompt rendering, file-context expansion, marker
//! append, size validation, single-flight admission, and response shaping.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{insert_retry_after, models, sse, AppState, ResponseMeta};
use crate::admission::{fingerprint, Admission, FingerprintInputs};
use crate::audit::AuditEvent;
use crate::driver::AskRequest;
use crate::error::{BridgeError, ErrorCode};
use crate::file_context::{self, BridgeFileRequest};
use crate::marker;
use crate::prompt::{ChatMessage, RenderOutcome};

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub bridge_files: Vec<BridgeFileRequest>,
}

/// The settled result of a single admitted (or joined) UI transaction.
/// `Clone` so it can be broadcast to every coalesced joiner.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub text: String,
    pub context_reset: bool,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ResponseMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: &'static str,
    pub choices: Vec<ChatChoice>,
}

fn unix_now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn non_stream_body(outcome: &CompletionOutcome) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
        object: "chat.completion",
        created: unix_now_secs(),
        model: models::MODEL_ID,
        choices: vec![ChatChoice {
            index: 0,
            message: ResponseMessage { role: "assistant", content: outcome.text.clone() },
            finish_reason: "stop",
        }],
    }
}

/// Render the `[BRIDGE_FILES]`-combined requests and validate/append marker
/// and size caps. Returns the fully rendered prompt (with marker) and the
/// body used for fingerprinting (without marker).
fn render_full_prompt(
    state: &AppState,
    req: &ChatCompletionRequest,
    rendered_body: String,
    request_id: &str,
) -> Result<(String, String), BridgeError> {
    let (stripped_body, block_requests, _non_terminal_ignored) = file_context::extract_bridge_files_block(&rendered_body);

    let mut requests = req.bridge_files.clone();
    requests.extend(block_requests);

    let expansion = file_context::expand(
        &requests,
        &state.config.file_context_allowed_roots,
        state.config.file_context_max_file_chars,
        state.config.file_context_max_total_chars,
    )?;

    let body_with_files = if expansion.section.is_empty() {
        stripped_body
    } else {
        format!("{}\n\n{}", stripped_body.trim_end(), expansion.section)
    };

    let marker_line = marker::build_marker(&state.marker_secret, request_id);
    let rendered_with_marker = marker::append_marker(&body_with_files, &marker_line);

    crate::prompt::validate_sizes(&req.messages, &rendered_with_marker, state.config.max_message_chars, state.config.max_prompt_chars)
        .map_err(|cap| BridgeError::new(ErrorCode::PromptTooLarge, format!("prompt exceeds {cap}")).with_detail("cap", cap))?;

    Ok((rendered_with_marker, body_with_files))
}

async fn run_ask(state: &Arc<AppState>, ask_request: AskRequest) -> Result<CompletionOutcome, BridgeError> {
    let response = state.driver.ask(ask_request).await?;

    Ok(CompletionOutcome {
        text: response.text,
        context_reset: response.context_reset,
        conversation_id: response.opened_conversation_id.unwrap_or_default(),
    })
}

#[allow(clippy::too_many_arguments)]
fn build_response(meta: ResponseMeta, stream: bool, outcome: Result<CompletionOutcome, BridgeError>) -> Response {
    match (stream, outcome) {
        (false, Ok(outcome)) => meta.apply(Json(non_stream_body(&outcome)).into_response()),
        (false, Err(err)) => error_response(meta, &err),
        (true, Ok(outcome)) => meta.apply(sse::stream_response(&outcome)),
        (true, Err(err)) => {
            let mut response = meta.apply(sse::error_stream_response(&err));
            apply_completion_error_headers(&mut response, &err);
            response
        }
    }
}

fn error_response(meta: ResponseMeta, err: &BridgeError) -> Response {
    let (status, json) = err.to_http_response();
    let mut response = meta.apply((status, json).into_response());
    apply_completion_error_headers(&mut response, err);
    response
}

/// Headers every completion-endpoint error carries, streamed or not:
/// `x-should-retry: false` (this is a non-idempotent UI action, never
/// auto-retry it) and `Retry-After` when the failure carries a hint.
fn apply_completion_error_headers(response: &mut Response, err: &BridgeError) {
    response.headers_mut().insert("x-should-retry", HeaderValue::from_static("false"));
    insert_retry_after(response, err);
}

pub async fn chat_completions(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let request_id = super::resolve_request_id(&headers);
    let mut meta = ResponseMeta { request_id: request_id.clone(), queue_depth: state.job_queue.depth(), ..Default::default() };

    if body.len() > state.config.http_body_limit_bytes {
        let err = BridgeError::new(ErrorCode::PromptTooLarge, "request body exceeds the configured size cap");
        return error_response(meta, &err);
    }

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            let err = BridgeError::new(ErrorCode::InvalidRequest, format!("invalid request body: {e}"));
            return error_response(meta, &err);
        }
    };

    meta.reset_strict = state.config.reset_strict;

    if let Err(err) = state.limiter.check() {
        return error_response(meta, &err);
    }

    let routing_mode = match state.config.routing_mode() {
        Ok(mode) => mode,
        Err(e) => return error_response(meta, &BridgeError::new(ErrorCode::Unknown, e.to_string())),
    };
    let raw_slot = req.session_key.as_deref().unwrap_or_default();
    let body_conversation_id = req.conversation_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let resolution = match state.session_router.resolve(routing_mode, raw_slot, body_conversation_id).await {
        Ok(r) => r,
        Err(err) => return error_response(meta, &err),
    };
    meta.session_slot = resolution.slot.clone();
    meta.conversation_id = resolution.conversation_id.clone().unwrap_or_default();

    let Some(render_outcome) = state.prompt_renderer.render(&req.messages) else {
        let err = BridgeError::new(ErrorCode::InvalidRequest, "messages must contain at least one user-role message");
        return error_response(meta, &err);
    };

    let rendered_body = match render_outcome {
        RenderOutcome::AnnounceSkip => {
            state.audit.record(AuditEvent::new("announce_skip", request_id.clone()));
            let outcome = CompletionOutcome {
                text: crate::prompt::ANNOUNCE_SKIP_TEXT.to_owned(),
                context_reset: false,
                conversation_id: resolution.conversation_id.clone().unwrap_or_default(),
            };
            return build_response(meta, req.stream, Ok(outcome));
        }
        RenderOutcome::Prompt(body) => body,
    };

    let (rendered_with_marker, body_without_marker) = match render_full_prompt(&state, &req, rendered_body, &request_id) {
        Ok(pair) => pair,
        Err(err) => return error_response(meta, &err),
    };

    let fp = fingerprint(&FingerprintInputs {
        prompt_body_without_marker: &body_without_marker,
        routing_mode: state.config.session_binding_mode.as_str(),
        session_slot: &resolution.slot,
        conversation_id: resolution.conversation_id.as_deref().unwrap_or(""),
        strict_open: resolution.strict_open,
    });

    let admission = state.admission.try_admit(&fp).await;
    let outcome = match admission {
        Admission::Reject => Err(BridgeError::new(ErrorCode::PreviousResponsePending, "a different request is in flight")),
        Admission::Join(mut rx) => match rx.recv().await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::new(ErrorCode::Unknown, "in-flight result channel closed unexpectedly")),
        },
        Admission::Admitted => {
            state.audit.record(
                AuditEvent::new("prompt_send", request_id.clone())
                    .with_field("session_slot", resolution.slot.clone())
                    .with_field("routing_mode", state.config.session_binding_mode.clone()),
            );

            let ask_request = AskRequest {
                prompt: rendered_with_marker,
                marker: marker::build_marker(&state.marker_secret, &request_id),
                request_id: request_id.clone(),
                conversation_id: resolution.conversation_id.clone(),
                strict_open: resolution.strict_open,
                reset_each_request: state.config.reset_chat_each_request,
                reset_strict: state.config.reset_strict,
            };

            let job_timeout = Duration::from_millis(state.config.effective_job_timeout_ms());
            let result = state
                .job_queue
                .add_if_idle(job_timeout, async { run_ask(&state, ask_request).await })
                .await
                .map_err(|err| match err.code {
                    ErrorCode::QueueFull => {
                        BridgeError::new(ErrorCode::PreviousResponsePending, "the UI worker is already busy with another request")
                    }
                    _ => err,
                });

            if let Ok(outcome) = &result {
                if let Err(e) = state.session_router.record_binding(routing_mode, &resolution, Some(&outcome.conversation_id).filter(|s| !s.is_empty())).await {
                    tracing::warn!(error = %e, "failed to persist session binding");
                }
            }

            state.admission.settle(result.clone()).await;
            result
        }
    };

    meta.context_reset = match &outcome {
        Ok(o) => o.context_reset,
        Err(err) => err.context_reset.unwrap_or(false),
    };
    if let Some(existing) = outcome.as_ref().map(|o| o.conversation_id.clone()).filter(|s| !s.is_empty()) {
        meta.conversation_id = existing;
    }

    build_response(meta, req.stream, outcome)
}

#[cfg(test)]
#[path = "completions_tests.rs"]
mod tests;
