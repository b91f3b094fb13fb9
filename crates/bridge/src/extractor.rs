// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure extraction of the assistant's reply out of a full accessibility-tree
//! scrape. Never touches the UI, so the poll loop can call it every tick.

use regex::Regex;

use crate::error::{BridgeError, ErrorCode};
use crate::marker;

/// Minimum length (chars) or multi-line-ness for a normalized substring of
/// the prompt to count as a prompt-echo rejection rather than a coincidence.
const PROMPT_SUBSTRING_REJECT_LEN: usize = 120;

/// Window size used by the trailing-window snapshot-delta strategy.
const SNAPSHOT_WINDOW_CHARS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Marker,
    SnapshotDelta,
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub mode: ExtractionMode,
}

/// Known UI chrome lines stripped from a candidate before it is judged.
const NOISE_LINES: &[&str] = &[
    "Regenerate",
    "Continue generating",
    "Copy",
    "Copy code",
    "Share",
    "Edit",
    "Good response",
    "Bad response",
];

const TYPING_CURSOR_GLYPHS: &[char] = &['▍', '▏', '\u{2588}'];
const INVISIBLE_GLYPHS: &[char] = &['\u{200B}', '\u{FEFF}', '\u{FFFC}'];

/// Compiled noise patterns used by `is_noise_line`/`strip_noise`. Built once
/// at startup; the patterns are fixed literals, so construction only fails
/// if one of them is not valid regex syntax.
pub struct NoisePatterns {
    version: Regex,
    thinking_header: Regex,
}

impl NoisePatterns {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            version: Regex::new(r"(?i)^chatgpt\s+\d+(\.\d+)*\s*$")?,
            thinking_header: Regex::new(r"(?im)^\s*(thinking|réflexion)\.{0,3}\s*$")?,
        })
    }

    fn is_noise_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        if NOISE_LINES.iter().any(|n| trimmed.eq_ignore_ascii_case(n)) {
            return true;
        }
        if self.version.is_match(trimmed) || self.thinking_header.is_match(trimmed) {
            return true;
        }
        let stripped: String =
            trimmed.chars().filter(|c| !TYPING_CURSOR_GLYPHS.contains(c) && !INVISIBLE_GLYPHS.contains(c)).collect();
        stripped.trim().is_empty()
    }

    fn strip_noise(&self, text: &str) -> String {
        let cleaned: String =
            text.chars().filter(|c| !TYPING_CURSOR_GLYPHS.contains(c) && !INVISIBLE_GLYPHS.contains(c)).collect();
        cleaned.lines().filter(|l| !self.is_noise_line(l)).collect::<Vec<_>>().join("\n").trim().to_owned()
    }
}

pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Whether `text` contains a typing-cursor glyph, used by the poll loop's
/// done predicate (a visible cursor means the reply is still streaming).
pub fn contains_typing_cursor(text: &str) -> bool {
    text.chars().any(|c| TYPING_CURSOR_GLYPHS.contains(&c))
}

/// Strip leading lines of `text` that echo `anchor` (the pre-send prompt),
/// `[FILE_CONTEXT]` framing, `--- BEGIN/END FILE` markers, or `path:` lines.
fn strip_leading_prompt_echo(text: &str, anchor: &str) -> String {
    let anchor_lines: std::collections::HashSet<String> =
        anchor.lines().map(|l| normalize(l.trim())).filter(|l| !l.is_empty()).collect();

    let mut lines = text.lines().peekable();
    let mut out: Vec<&str> = Vec::new();
    let mut still_echo = true;
    for line in lines.by_ref() {
        if still_echo {
            let norm = normalize(line.trim());
            let is_echo = norm.is_empty()
                || anchor_lines.contains(&norm)
                || line.trim() == "[FILE_CONTEXT]"
                || line.trim() == "[/FILE_CONTEXT]"
                || line.trim_start().starts_with("--- BEGIN FILE")
                || line.trim_start().starts_with("--- END FILE")
                || line.trim_start().starts_with("path:");
            if is_echo {
                continue;
            }
            still_echo = false;
        }
        out.push(line);
    }
    out.join("\n").trim().to_owned()
}

/// If `text` splits into two equal, identical halves (by line or by char),
/// collapse to one half. Counters accessibility-tree duplication.
fn dedup_halves(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() >= 2 && lines.len() % 2 == 0 {
        let mid = lines.len() / 2;
        if lines[..mid] == lines[mid..] {
            return lines[..mid].join("\n").trim().to_owned();
        }
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() >= 2 && chars.len() % 2 == 0 {
        let mid = chars.len() / 2;
        let (a, b) = (&chars[..mid], &chars[mid..]);
        if a == b {
            return a.iter().collect::<String>().trim().to_owned();
        }
    }
    text.to_owned()
}

/// Whether `candidate` should be rejected as not-yet-ready output.
fn is_rejectable(candidate: &str, anchor: &str, noise: &NoisePatterns) -> bool {
    if candidate.trim().is_empty() {
        return true;
    }
    if marker::contains_any_marker(candidate) {
        return true;
    }
    let norm_candidate = normalize(candidate);
    let norm_anchor = normalize(anchor);
    if norm_candidate == norm_anchor {
        return true;
    }
    if norm_anchor.contains(&norm_candidate)
        && (norm_candidate.chars().count() >= PROMPT_SUBSTRING_REJECT_LEN || candidate.trim().contains('\n'))
    {
        return true;
    }
    if candidate.lines().all(|l| noise.is_noise_line(l)) {
        return true;
    }
    false
}

fn process_candidate(raw: &str, anchor: &str, noise: &NoisePatterns) -> Option<String> {
    let stripped = noise.strip_noise(raw);
    let echo_stripped = strip_leading_prompt_echo(&stripped, anchor);
    let deduped = dedup_halves(&echo_stripped);
    if is_rejectable(&deduped, anchor, noise) {
        None
    } else {
        Some(deduped)
    }
}

/// Strict marker path: the anchor ends with a bridge marker. The exact
/// marker line must appear (last occurrence) in `full_text`; everything
/// after it is the candidate.
fn extract_strict(full_text: &str, anchor: &str, noise: &NoisePatterns) -> Result<Option<ExtractionResult>, BridgeError> {
    let marker_line = marker::parse_trailing_marker(anchor)
        .ok_or_else(|| BridgeError::new(ErrorCode::UiError, "anchor does not end with a well-formed marker"))?;

    let Some(pos) = full_text.rfind(marker_line) else {
        return Err(BridgeError::new(ErrorCode::UiError, "bridge marker not found in scraped text")
            .with_detail("reason", "marker_not_found"));
    };
    let after = &full_text[pos + marker_line.len()..];

    match process_candidate(after, anchor, noise) {
        Some(text) => Ok(Some(ExtractionResult { text, mode: ExtractionMode::Marker })),
        None => Err(BridgeError::new(ErrorCode::UiError, "extracted candidate was rejected as not yet ready")
            .with_detail("reason", "response_not_ready")),
    }
}

/// Legacy / snapshot-delta path: the anchor carries no bridge marker.
/// Returns `Ok(None)` (keep polling) rather than an error when nothing
/// usable is found yet — unlike the strict path there is no hard failure
/// mode here, only "not ready".
fn extract_legacy(
    full_text: &str,
    anchor: &str,
    pre_send_snapshot: Option<&str>,
    noise: &NoisePatterns,
) -> Option<ExtractionResult> {
    let prompt_body = anchor.trim();

    if let Some(pos) = full_text.rfind(prompt_body) {
        if let Some(text) = process_candidate(&full_text[pos + prompt_body.len()..], anchor, noise) {
            return Some(ExtractionResult { text, mode: ExtractionMode::SnapshotDelta });
        }
    }
    if let Some(pos) = full_text.find(prompt_body) {
        if let Some(text) = process_candidate(&full_text[pos + prompt_body.len()..], anchor, noise) {
            return Some(ExtractionResult { text, mode: ExtractionMode::SnapshotDelta });
        }
    }

    if let Some(first_line) = prompt_body.lines().next().map(str::trim) {
        if first_line.chars().count() >= 20 {
            if let Some(pos) = full_text.find(first_line) {
                let after = &full_text[pos + first_line.len()..];
                if let Some(text) = process_candidate(after, anchor, noise) {
                    return Some(ExtractionResult { text, mode: ExtractionMode::SnapshotDelta });
                }
            }
        }
    }

    if let Some(snapshot) = pre_send_snapshot {
        if let Some(delta) = snapshot_delta(full_text, snapshot) {
            if let Some(text) = process_candidate(&delta, anchor, noise) {
                return Some(ExtractionResult { text, mode: ExtractionMode::SnapshotDelta });
            }
        }
    }

    None
}

/// Compute the suffix of `current` beyond its longest overlap with
/// `snapshot`: first try locating `snapshot`'s trailing 1024-char window
/// inside `current`, then fall back to the longest common prefix of the two.
fn snapshot_delta(current: &str, snapshot: &str) -> Option<String> {
    let snap_chars: Vec<char> = snapshot.chars().collect();
    let window_start = snap_chars.len().saturating_sub(SNAPSHOT_WINDOW_CHARS);
    let window: String = snap_chars[window_start..].iter().collect();
    if !window.is_empty() {
        if let Some(pos) = current.rfind(&window) {
            return Some(current[pos + window.len()..].to_owned());
        }
    }

    let cur_chars: Vec<char> = current.chars().collect();
    let common = cur_chars.iter().zip(snap_chars.iter()).take_while(|(a, b)| a == b).count();
    if common < cur_chars.len() {
        Some(cur_chars[common..].iter().collect())
    } else {
        None
    }
}

/// Entry point: dispatch to the strict marker path or the legacy path
/// depending on whether `anchor` ends with a bridge marker.
pub fn extract(
    full_text: &str,
    anchor: &str,
    pre_send_snapshot: Option<&str>,
    noise: &NoisePatterns,
) -> Result<Option<ExtractionResult>, BridgeError> {
    if marker::ends_with_marker(anchor) {
        extract_strict(full_text, anchor, noise)
    } else {
        Ok(extract_legacy(full_text, anchor, pre_send_snapshot, noise))
    }
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
