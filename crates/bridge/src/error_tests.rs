// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    app_not_running = { ErrorCode::AppNotRunning, 503 },
    accessibility_denied = { ErrorCode::AccessibilityDenied, 503 },
    ui_element_not_found = { ErrorCode::UiElementNotFound, 428 },
    ui_reset_failed = { ErrorCode::UiResetFailed, 502 },
    ui_error = { ErrorCode::UiError, 502 },
    usage_cap = { ErrorCode::UsageCap, 429 },
    rate_limited = { ErrorCode::RateLimitedByChatgpt, 429 },
    captcha = { ErrorCode::Captcha, 403 },
    auth_required = { ErrorCode::AuthRequired, 403 },
    network_error = { ErrorCode::NetworkError, 502 },
    conversation_not_found = { ErrorCode::ConversationNotFound, 404 },
    file_context_invalid = { ErrorCode::FileContextInvalid, 400 },
    file_context_unsupported = { ErrorCode::FileContextUnsupported, 400 },
    file_context_access_denied = { ErrorCode::FileContextAccessDenied, 403 },
    file_context_not_found = { ErrorCode::FileContextNotFound, 404 },
    prompt_too_large = { ErrorCode::PromptTooLarge, 400 },
    invalid_request = { ErrorCode::InvalidRequest, 400 },
    queue_full = { ErrorCode::QueueFull, 429 },
    previous_response_pending = { ErrorCode::PreviousResponsePending, 409 },
    timeout = { ErrorCode::Timeout, 504 },
    unknown = { ErrorCode::Unknown, 500 },
)]
fn http_status_matches_taxonomy(code: ErrorCode, expected: u16) {
    assert_eq!(code.http_status(), expected);
}

#[test]
fn rate_like_kinds_default_to_60s_retry() {
    assert_eq!(ErrorCode::UsageCap.default_retry_after_sec(), Some(60));
    assert_eq!(ErrorCode::RateLimitedByChatgpt.default_retry_after_sec(), Some(60));
}

#[test]
fn queue_full_defaults_to_10s_retry() {
    assert_eq!(ErrorCode::QueueFull.default_retry_after_sec(), Some(10));
}

#[test]
fn other_kinds_have_no_default_retry() {
    assert_eq!(ErrorCode::UiError.default_retry_after_sec(), None);
    assert_eq!(ErrorCode::ConversationNotFound.default_retry_after_sec(), None);
}

#[test]
fn bridge_error_carries_context_reset_through_details() {
    let err = BridgeError::new(ErrorCode::UiError, "boom").with_context_reset(true);
    assert_eq!(err.context_reset, Some(true));
}

#[test]
fn to_http_response_uses_code_status() {
    let err = BridgeError::new(ErrorCode::Timeout, "deadline exceeded");
    let (status, Json(body)) = err.to_http_response();
    assert_eq!(status.as_u16(), 504);
    assert_eq!(body.error.code, "timeout");
}
