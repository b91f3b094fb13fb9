// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UI-error detection: scan the full scraped text for known error patterns
//! before attempting extraction.

use crate::error::{BridgeError, ErrorCode};

/// One configurable detection pattern: a fixed error kind, matched when the
/// scraped text contains any of `includes` (case-insensitively).
#[derive(Debug, Clone)]
pub struct UiErrorPattern {
    pub code: ErrorCode,
    pub includes: Vec<String>,
}

/// Default pattern set matching the fixed kinds named in the error design.
pub fn default_patterns() -> Vec<UiErrorPattern> {
    vec![
        UiErrorPattern {
            code: ErrorCode::UsageCap,
            includes: vec!["you've reached".to_owned(), "message limit".to_owned(), "try again later".to_owned()],
        },
        UiErrorPattern {
            code: ErrorCode::RateLimitedByChatgpt,
            includes: vec!["you're sending messages too quickly".to_owned(), "rate limit".to_owned()],
        },
        UiErrorPattern {
            code: ErrorCode::NetworkError,
            includes: vec!["network error".to_owned(), "check your connection".to_owned()],
        },
        UiErrorPattern {
            code: ErrorCode::Captcha,
            includes: vec!["verify you are human".to_owned(), "unusual activity".to_owned()],
        },
        UiErrorPattern {
            code: ErrorCode::AuthRequired,
            includes: vec!["log in to continue".to_owned(), "session expired".to_owned()],
        },
    ]
}

/// Scan `full_text` against `patterns`, returning the first match as a
/// `BridgeError` carrying the kind's default `retry_after_sec` hint.
pub fn detect(full_text: &str, patterns: &[UiErrorPattern]) -> Option<BridgeError> {
    let lower = full_text.to_lowercase();
    for pattern in patterns {
        if pattern.includes.iter().any(|needle| lower.contains(&needle.to_lowercase())) {
            return Some(BridgeError::new(pattern.code, format!("UI reported a {} condition", pattern.code)));
        }
    }
    None
}

#[cfg(test)]
#[path = "ui_error_tests.rs"]
mod tests;
