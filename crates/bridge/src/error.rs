// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed error taxonomy shared across the poll loop, admission layer, and
//! HTTP surface. Every failure in the bridge is classified into one of
//! these kinds before it reaches the wire; `unknown` is the only escape
//! hatch and its appearance indicates a mapping bug.

use std::collections::HashMap;
use std::fmt;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Closed set of failure kinds. Adding a variant here requires adding it to
/// every match below — there is no default arm, by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AppNotRunning,
    AccessibilityDenied,
    UiElementNotFound,
    UiResetFailed,
    UiError,
    UsageCap,
    RateLimitedByChatgpt,
    Captcha,
    AuthRequired,
    NetworkError,
    ConversationNotFound,
    FileContextInvalid,
    FileContextUnsupported,
    FileContextAccessDenied,
    FileContextNotFound,
    PromptTooLarge,
    InvalidRequest,
    QueueFull,
    PreviousResponsePending,
    Timeout,
    Unknown,
}

impl ErrorCode {
    /// HTTP status this kind maps to. `prompt_too_large` is 400 in general
    /// but callers that hit the raw body-size cap upgrade it to 413
    /// themselves (see `http::completions::body_limit`).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AppNotRunning => 503,
            Self::AccessibilityDenied => 503,
            Self::UiElementNotFound => 428,
            Self::UiResetFailed => 502,
            Self::UiError => 502,
            Self::UsageCap => 429,
            Self::RateLimitedByChatgpt => 429,
            Self::Captcha => 403,
            Self::AuthRequired => 403,
            Self::NetworkError => 502,
            Self::ConversationNotFound => 404,
            Self::FileContextInvalid => 400,
            Self::FileContextUnsupported => 400,
            Self::FileContextAccessDenied => 403,
            Self::FileContextNotFound => 404,
            Self::PromptTooLarge => 400,
            Self::InvalidRequest => 400,
            Self::QueueFull => 429,
            Self::PreviousResponsePending => 409,
            Self::Timeout => 504,
            Self::Unknown => 500,
        }
    }

    /// `Retry-After` hint in seconds, if this kind carries one by default.
    pub fn default_retry_after_sec(&self) -> Option<u64> {
        match self {
            Self::UsageCap | Self::RateLimitedByChatgpt => Some(60),
            Self::QueueFull => Some(10),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppNotRunning => "app_not_running",
            Self::AccessibilityDenied => "accessibility_denied",
            Self::UiElementNotFound => "ui_element_not_found",
            Self::UiResetFailed => "ui_reset_failed",
            Self::UiError => "ui_error",
            Self::UsageCap => "usage_cap",
            Self::RateLimitedByChatgpt => "rate_limited_by_chatgpt",
            Self::Captcha => "captcha",
            Self::AuthRequired => "auth_required",
            Self::NetworkError => "network_error",
            Self::ConversationNotFound => "conversation_not_found",
            Self::FileContextInvalid => "file_context_invalid",
            Self::FileContextUnsupported => "file_context_unsupported",
            Self::FileContextAccessDenied => "file_context_access_denied",
            Self::FileContextNotFound => "file_context_not_found",
            Self::PromptTooLarge => "prompt_too_large",
            Self::InvalidRequest => "invalid_request",
            Self::QueueFull => "queue_full",
            Self::PreviousResponsePending => "previous_response_pending",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-formed failure, carrying everything the wire mapper and the
/// audit log need. Constructed at the failure site and propagated
/// unchanged — never downgraded to a success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_sec: Option<u64>,
    /// Whether a "new chat" reset happened before this error occurred, so
    /// handlers can still emit `x-bridge-context-reset` on a failed call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_reset: Option<bool>,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let retry_after_sec = code.default_retry_after_sec();
        Self { code, message: message.into(), details: HashMap::new(), retry_after_sec, context_reset: None }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_retry_after_sec(mut self, secs: u64) -> Self {
        self.retry_after_sec = Some(secs);
        self
    }

    pub fn with_context_reset(mut self, reset: bool) -> Self {
        self.context_reset = Some(reset);
        self
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for BridgeError {}

/// OpenAI-shaped error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl BridgeError {
    /// Convert to the `(status, json)` pair axum handlers return directly.
    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status = StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: ErrorBody { code: self.code.as_str().to_owned(), message: self.message.clone(), kind: "bridge_error".to_owned() },
        };
        (status, Json(body))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
