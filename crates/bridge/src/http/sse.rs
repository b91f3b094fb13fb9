// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streamed chat-completion frames: a role-only delta, a single full-text
//! delta, and the terminal `[DONE]` marker. A pre-emission failure sends
//! one OpenAI-shaped error frame instead and closes without a `[DONE]`.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::http::HeaderValue;
use futures_util::stream;
use serde_json::json;

use super::completions::CompletionOutcome;
use super::models;
use crate::error::BridgeError;

fn streaming_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert("cache-control", HeaderValue::from_static("no-cache"));
    headers.insert("connection", HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

fn delta_frame(delta: serde_json::Value) -> Event {
    let body = json!({
        "id": format!("chatcmpl-{}", uuid::Uuid::new_v4()),
        "object": "chat.completion.chunk",
        "model": models::MODEL_ID,
        "choices": [{"index": 0, "delta": delta, "finish_reason": serde_json::Value::Null}],
    });
    Event::default().data(body.to_string())
}

/// Three-frame success stream: role delta, content delta, `[DONE]`.
pub fn stream_response(outcome: &CompletionOutcome) -> Response {
    let role_frame = delta_frame(json!({"role": "assistant"}));
    let content_frame = delta_frame(json!({"content": outcome.text}));
    let done = Event::default().data("[DONE]");

    let frames: Vec<Result<Event, Infallible>> = vec![Ok(role_frame), Ok(content_frame), Ok(done)];
    let sse = Sse::new(stream::iter(frames));
    streaming_headers(sse.into_response())
}

/// Mid-stream (pre-emission) failure: a single OpenAI-style error frame,
/// then close. No `[DONE]` follows an error.
pub fn error_stream_response(err: &BridgeError) -> Response {
    let body = json!({
        "error": {
            "code": err.code.as_str(),
            "message": err.message,
            "type": "bridge_error",
        }
    });
    let frame: Result<Event, Infallible> = Ok(Event::default().data(body.to_string()));
    let sse = Sse::new(stream::iter(vec![frame]));
    streaming_headers(sse.into_response())
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
