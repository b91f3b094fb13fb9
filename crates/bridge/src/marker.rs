// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic per-request markers appended to sent prompts so the
//! extractor can unambiguously locate the response segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::hmac;

/// Prefix every marker line starts with.
pub const MARKER_PREFIX: &str = "[[OC=";
const MARKER_SUFFIX: char = ']';
const TAG_LEN: usize = 16;

/// Compute the marker tag for `request_id` under `secret`: the first 16
/// chars of base64url(HMAC-SHA256(secret, request_id)).
pub fn compute_tag(secret: &str, request_id: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let sig = hmac::sign(&key, request_id.as_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(sig.as_ref());
    encoded.chars().take(TAG_LEN).collect()
}

/// Build the full marker line: `[[OC=<rid>.<tag>]]`.
pub fn build_marker(secret: &str, request_id: &str) -> String {
    let tag = compute_tag(secret, request_id);
    format!("{MARKER_PREFIX}{request_id}.{tag}{MARKER_SUFFIX}{MARKER_SUFFIX}")
}

/// Whether `text` ends (after trimming trailing whitespace) with a
/// well-formed bridge marker line.
pub fn ends_with_marker(text: &str) -> bool {
    parse_trailing_marker(text).is_some()
}

/// If `text`'s last non-blank line is a well-formed marker, return it.
pub fn parse_trailing_marker(text: &str) -> Option<&str> {
    let trimmed = text.trim_end();
    let last_line = trimmed.rsplit('\n').next()?.trim();
    if is_marker_line(last_line) {
        Some(last_line)
    } else {
        None
    }
}

/// Whether `line` is a single, well-formed marker: `[[OC=<rid>.<tag>]]`,
/// no embedded brackets or newlines.
pub fn is_marker_line(line: &str) -> bool {
    let Some(inner) = line.strip_prefix("[[OC=").and_then(|s| s.strip_suffix("]]")) else {
        return false;
    };
    if inner.contains('[') || inner.contains(']') || inner.contains('\n') {
        return false;
    }
    let Some((rid, tag)) = inner.rsplit_once('.') else {
        return false;
    };
    !rid.is_empty() && tag.len() == TAG_LEN && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Append the marker as the final line of `body`, separated by a single
/// blank line, as required by the `RenderedPrompt` invariant.
pub fn append_marker(body: &str, marker: &str) -> String {
    let trimmed = body.trim_end();
    if trimmed.is_empty() {
        marker.to_owned()
    } else {
        format!("{trimmed}\n\n{marker}")
    }
}

/// Whether `text` contains a leaked bridge marker anywhere (used by the
/// extractor to reject results that echo the marker back).
pub fn contains_any_marker(text: &str) -> bool {
    text.lines().any(is_marker_line)
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
