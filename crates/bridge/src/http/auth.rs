// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::{resolve_request_id, AppState, ResponseMeta};
use crate::error::{BridgeError, ErrorCode};

/// Constant-time comparison, used so a mismatched bearer token can't be
/// brute-forced via response-timing measurements.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; the token itself byte-for-byte. `expected = None`
/// disables auth entirely (local development only).
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), BridgeError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let unauthorized = || BridgeError::new(ErrorCode::AuthRequired, "missing or invalid bearer token");

    let header = headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or_else(unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(unauthorized());
    }
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(unauthorized())
    }
}

/// Axum middleware enforcing bearer auth on every route except `/health`.
pub async fn auth_layer(State(state): State<Arc<AppState>>, req: Request<axum::body::Body>, next: Next) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    if let Err(err) = validate_bearer(req.headers(), state.config.bridge_token.as_deref()) {
        let request_id = resolve_request_id(req.headers());
        let meta = ResponseMeta { request_id, context_reset: false, ..Default::default() };
        let (status, json) = err.to_http_response();
        return meta.apply((status, json).into_response());
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
