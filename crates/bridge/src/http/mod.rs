// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: axum router, shared application state, and per-endpoint
//! handlers for the OpenAI-compatible surface.

pub mod auth;
pub mod completions;
pub mod conversations;
pub mod health;
pub mod models;
pub mod sse;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::admission::{AdmissionGate, JobQueue};
use crate::audit::AuditLog;
use crate::config::Config;
use crate::driver::UiDriver;
use crate::limiter::RateLimit;
use crate::prompt::PromptRenderer;
use crate::session_router::SessionRouter;
use completions::CompletionOutcome;

pub const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared dependencies reachable from every handler via axum's `State`
/// extractor.
pub struct AppState {
    pub config: Config,
    pub driver: Arc<dyn UiDriver>,
    pub admission: AdmissionGate<Result<CompletionOutcome, crate::error::BridgeError>>,
    pub job_queue: JobQueue,
    pub limiter: RateLimit,
    pub session_router: SessionRouter,
    pub audit: AuditLog,
    pub prompt_renderer: PromptRenderer,
    pub marker_secret: String,
}

impl AppState {
    pub fn new(
        config: Config,
        driver: Arc<dyn UiDriver>,
        marker_secret: String,
        prompt_renderer: PromptRenderer,
    ) -> anyhow::Result<Self> {
        let sanitize_mode = config.sanitize_mode()?;
        let audit = AuditLog::new(config.audit_log_path.clone(), config.audit_log_max_bytes, config.audit_log_max_age_days, sanitize_mode);
        let session_router =
            SessionRouter::new(config.session_bindings_path.clone(), config.session_default_slot.clone(), config.session_binding_strict_open);
        let job_queue = JobQueue::new(config.max_queue_size);
        let limiter = RateLimit::new(config.rate_limit_rpm, config.rate_limit_burst);

        Ok(Self {
            config,
            driver,
            admission: AdmissionGate::new(),
            job_queue,
            limiter,
            session_router,
            audit,
            prompt_renderer,
            marker_secret,
        })
    }
}

/// Everything that goes into the common `x-bridge-*` response headers,
/// required on every response per the external interface contract.
#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
    pub request_id: String,
    pub queue_depth: usize,
    pub context_reset: bool,
    pub reset_strict: bool,
    pub session_slot: String,
    pub conversation_id: String,
}

impl ResponseMeta {
    pub fn apply(&self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        insert_header(headers, "x-bridge-version", BRIDGE_VERSION);
        insert_header(headers, "x-bridge-request-id", &self.request_id);
        insert_header(headers, "x-bridge-queue-depth", &self.queue_depth.to_string());
        insert_header(headers, "x-bridge-context-reset", if self.context_reset { "1" } else { "0" });
        insert_header(headers, "x-bridge-reset-strict", if self.reset_strict { "1" } else { "0" });
        insert_header(headers, "x-bridge-session-slot", &self.session_slot);
        insert_header(headers, "x-bridge-conversation-id", &self.conversation_id);
        response
    }
}

fn insert_header(headers: &mut axum::http::HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

/// Set `Retry-After` from `err.retry_after_sec` when the failure carries one.
/// Shared by every handler that turns a `BridgeError` into a response, since
/// `queue_full`, `usage_cap`, and `rate_limited_by_chatgpt` all need it
/// regardless of which endpoint produced them.
pub fn insert_retry_after(response: &mut Response, err: &crate::error::BridgeError) {
    if let Some(secs) = err.retry_after_sec {
        insert_header(response.headers_mut(), "retry-after", &secs.to_string());
    }
}

/// Resolve the client-supplied `x-request-id` header if it is non-empty and
/// a legal header value, otherwise mint a fresh one.
pub fn resolve_request_id(headers: &axum::http::HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Build the axum `Router` with every route and the auth middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/models", get(models::list_models))
        .route("/v1/bridge/conversations", get(conversations::list_conversations))
        .route("/v1/chat/completions", post(completions::chat_completions))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
