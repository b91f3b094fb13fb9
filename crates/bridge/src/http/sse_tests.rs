// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::body::to_bytes;

use super::*;
use crate::error::ErrorCode;

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn success_stream_carries_three_frames_ending_in_done() {
    let outcome = CompletionOutcome { text: "hello there".to_owned(), context_reset: false, conversation_id: String::new() };
    let response = stream_response(&outcome);
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");
    assert_eq!(response.headers().get("connection").unwrap(), "keep-alive");
    assert_eq!(response.headers().get("x-accel-buffering").unwrap(), "no");

    let text = body_text(response).await;
    let frames: Vec<&str> = text.split("\n\n").map(str::trim).filter(|l| !l.is_empty()).collect();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].contains("\"role\":\"assistant\""));
    assert!(frames[1].contains("hello there"));
    assert_eq!(frames[2], "data: [DONE]");
}

#[tokio::test]
async fn error_stream_carries_a_single_frame_with_no_done() {
    let err = BridgeError::new(ErrorCode::RateLimitedByChatgpt, "too many requests right now");
    let response = error_stream_response(&err);
    let text = body_text(response).await;
    let frames: Vec<&str> = text.split("\n\n").map(str::trim).filter(|l| !l.is_empty()).collect();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].contains("rate_limited_by_chatgpt"));
    assert!(!text.contains("[DONE]"));
}
