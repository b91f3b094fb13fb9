// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn noise() -> NoisePatterns {
    NoisePatterns::new().expect("fixed regex literals compile")
}

#[test]
fn strict_path_extracts_text_after_last_marker_occurrence() {
    let anchor = "what is the capital of France?\n\n[[OC=req-1.abcdefghijklmnop]]";
    let full_text = format!("some sidebar noise\n{anchor}\nParis is the capital of France.");
    let result = extract(&full_text, anchor, None, &noise()).expect("should not error").expect("should extract");
    assert_eq!(result.mode, ExtractionMode::Marker);
    assert_eq!(result.text, "Paris is the capital of France.");
}

#[test]
fn strict_path_uses_last_occurrence_when_marker_repeated() {
    let anchor = "question\n\n[[OC=req-2.abcdefghijklmnop]]";
    let marker = "[[OC=req-2.abcdefghijklmnop]]";
    let full_text = format!("{marker}\nstale draft\n{marker}\nfinal answer");
    let result = extract(&full_text, anchor, None, &noise()).unwrap().unwrap();
    assert_eq!(result.text, "final answer");
}

#[test]
fn strict_path_errors_with_marker_not_found_when_absent() {
    let anchor = "question\n\n[[OC=req-3.abcdefghijklmnop]]";
    let err = extract("just some screen text with no marker", anchor, None, &noise()).unwrap_err();
    assert_eq!(err.code, ErrorCode::UiError);
    assert_eq!(err.details.get("reason").and_then(|v| v.as_str()), Some("marker_not_found"));
}

#[test]
fn strict_path_rejects_when_candidate_equals_prompt() {
    let anchor = "question\n\n[[OC=req-4.abcdefghijklmnop]]";
    let marker = "[[OC=req-4.abcdefghijklmnop]]";
    let full_text = format!("{marker}\nquestion");
    let err = extract(&full_text, anchor, None, &noise()).unwrap_err();
    assert_eq!(err.details.get("reason").and_then(|v| v.as_str()), Some("response_not_ready"));
}

#[test]
fn strict_path_rejects_candidate_containing_leaked_marker() {
    let anchor = "question\n\n[[OC=req-5.abcdefghijklmnop]]";
    let marker = "[[OC=req-5.abcdefghijklmnop]]";
    let leaked = "[[OC=other-req.zyxwvutsrqponmlk]]";
    let full_text = format!("{marker}\nreal answer\n{leaked}");
    let err = extract(&full_text, anchor, None, &noise()).unwrap_err();
    assert_eq!(err.details.get("reason").and_then(|v| v.as_str()), Some("response_not_ready"));
}

#[test]
fn strict_path_strips_noise_lines_and_version_string() {
    let anchor = "question\n\n[[OC=req-6.abcdefghijklmnop]]";
    let marker = "[[OC=req-6.abcdefghijklmnop]]";
    let full_text = format!("{marker}\nChatGPT 4.0\nRegenerate\nthe real answer\nCopy code");
    let result = extract(&full_text, anchor, None, &noise()).unwrap().unwrap();
    assert_eq!(result.text, "the real answer");
}

#[test]
fn strict_path_dedups_doubled_ax_text() {
    let anchor = "question\n\n[[OC=req-7.abcdefghijklmnop]]";
    let marker = "[[OC=req-7.abcdefghijklmnop]]";
    let full_text = format!("{marker}\nthe answer\nthe answer");
    let result = extract(&full_text, anchor, None, &noise()).unwrap().unwrap();
    assert_eq!(result.text, "the answer");
}

#[test]
fn legacy_path_finds_last_prompt_occurrence() {
    let anchor = "plain legacy question with no marker";
    let full_text = format!("{anchor}\nstale\n{anchor}\nthe real reply");
    let result = extract(&full_text, anchor, None, &noise()).unwrap().unwrap();
    assert_eq!(result.mode, ExtractionMode::SnapshotDelta);
    assert_eq!(result.text, "the real reply");
}

#[test]
fn legacy_path_returns_none_when_nothing_found() {
    let anchor = "a prompt that never appears in the scrape";
    let result = extract("totally unrelated screen contents", anchor, None, &noise()).unwrap();
    assert!(result.is_none());
}

#[test]
fn legacy_path_falls_back_to_snapshot_delta_trailing_window() {
    // Anchor never appears verbatim in either blob, forcing every prompt-substring
    // strategy to miss so only the trailing-window snapshot-delta fallback applies.
    let anchor = "a prompt that is not present in the snapshot or the screen at all";
    let snapshot = "here is some boilerplate screen content ".repeat(50);
    let window: String = snapshot.chars().rev().take(1024).collect::<Vec<_>>().into_iter().rev().collect();
    let full_text = format!("{window}the delta reply");
    let result = extract(&full_text, anchor, Some(&snapshot), &noise()).unwrap().expect("fallback should extract");
    assert_eq!(result.mode, ExtractionMode::SnapshotDelta);
    assert_eq!(result.text, "the delta reply");
}

#[test]
fn strip_leading_prompt_echo_removes_file_context_framing() {
    let anchor = "question about the file";
    let candidate = "[FILE_CONTEXT]\n--- BEGIN FILE: a.txt ---\npath: /tmp/a.txt\n--- END FILE: a.txt ---\n[/FILE_CONTEXT]\nthe actual reply";
    assert_eq!(strip_leading_prompt_echo(candidate, anchor), "the actual reply");
}
