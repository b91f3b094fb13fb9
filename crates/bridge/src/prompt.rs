// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt rendering: reduce an OpenAI-shaped `messages` array down to the
//! single string pushed into the chat app, stripping internal control
//! metadata the caller may have embedded.

use regex::Regex;

/// A single incoming chat message, OpenAI wire-shape subset.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Internal-announce control prompts get a synthetic reply with no UI
/// interaction. Matched case-insensitively against whitespace-collapsed text.
const ANNOUNCE_PATTERNS: &[&str] = &["ping", "are you there", "internal health check", "connectivity test"];

pub const ANNOUNCE_SKIP_TEXT: &str = "ANNOUNCE_SKIP";

/// Compiled patterns used to strip internal control metadata from a
/// message body before it is sent to the UI. Built once at startup; the
/// patterns are fixed literals, so construction only fails if one of them
/// is not valid regex syntax (caught immediately by startup tests).
pub struct PromptRenderer {
    subagent_header: Regex,
    timestamp_header: Regex,
}

/// Outcome of rendering: either a real prompt to send, or a short-circuit
/// synthetic reply for an internal-announce control prompt.
pub enum RenderOutcome {
    Prompt(String),
    AnnounceSkip,
}

impl PromptRenderer {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            subagent_header: Regex::new(r"(?m)^\s*(\[[A-Za-z0-9 _-]+\]|#{1,6}\s*(Task|Subagent|Context)\b.*)$")?,
            timestamp_header: Regex::new(
                r"(?m)^\s*\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2})?([.,]\d+)?(Z|[+-]\d{2}:?\d{2})?\s*$",
            )?,
        })
    }

    /// Drop any line that is itself a well-formed bridge marker — callers
    /// must never let a client-supplied message smuggle a marker-shaped
    /// line into the rendered prompt.
    fn strip_leaked_marker_lines(&self, body: &str) -> String {
        body.lines().filter(|line| !crate::marker::is_marker_line(line.trim())).collect::<Vec<_>>().join("\n")
    }

    /// Strip leaked marker fragments, subagent metadata headers, and dated
    /// timestamp headers from a single message body.
    fn strip_control_metadata(&self, body: &str) -> String {
        let mut out = self.subagent_header.replace_all(body, "").into_owned();
        out = self.timestamp_header.replace_all(&out, "").into_owned();
        out = self.strip_leaked_marker_lines(&out);

        // Collapse runs of blank lines left behind by stripping.
        let mut lines: Vec<&str> = Vec::new();
        let mut last_blank = false;
        for line in out.lines() {
            let blank = line.trim().is_empty();
            if blank && last_blank {
                continue;
            }
            lines.push(line);
            last_blank = blank;
        }
        lines.join("\n").trim().to_owned()
    }

    /// Render the prompt body from the incoming messages: only the last
    /// user-role message survives, after control-metadata stripping.
    /// Returns `None` if there is no user message at all.
    pub fn render_body(&self, messages: &[ChatMessage]) -> Option<String> {
        let last_user = messages.iter().rev().find(|m| m.role == "user")?;
        Some(self.strip_control_metadata(&last_user.content))
    }

    /// Full render pipeline: extract the last user message, strip
    /// metadata, and check for the control-prompt short circuit.
    pub fn render(&self, messages: &[ChatMessage]) -> Option<RenderOutcome> {
        let body = self.render_body(messages)?;
        if is_control_prompt(&body) {
            Some(RenderOutcome::AnnounceSkip)
        } else {
            Some(RenderOutcome::Prompt(body))
        }
    }
}

/// Collapse runs of whitespace to a single space and lowercase, for
/// matching control prompts regardless of formatting.
fn whitespace_collapsed_lower(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    out.trim().to_owned()
}

/// Whether `rendered` matches one of the fixed internal-announce patterns.
pub fn is_control_prompt(rendered: &str) -> bool {
    let collapsed = whitespace_collapsed_lower(rendered);
    ANNOUNCE_PATTERNS.iter().any(|p| collapsed == *p)
}

/// Validate message and total prompt sizes against the configured caps.
/// Returns `Err` with the offending cap name on violation.
pub fn validate_sizes(
    messages: &[ChatMessage],
    rendered_with_marker: &str,
    max_message_chars: usize,
    max_prompt_chars: usize,
) -> Result<(), &'static str> {
    for m in messages {
        if m.content.chars().count() > max_message_chars {
            return Err("max_message_chars");
        }
    }
    if rendered_with_marker.chars().count() > max_prompt_chars {
        return Err("max_prompt_chars");
    }
    Ok(())
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
