// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn msg(role: &str, content: &str) -> ChatMessage {
    ChatMessage { role: role.to_owned(), content: content.to_owned() }
}

fn renderer() -> PromptRenderer {
    PromptRenderer::new().expect("fixed regex literals compile")
}

#[test]
fn picks_last_user_message_only() {
    let r = renderer();
    let messages = vec![
        msg("user", "first question"),
        msg("assistant", "first answer"),
        msg("user", "second question"),
    ];
    assert_eq!(r.render_body(&messages).as_deref(), Some("second question"));
}

#[test]
fn returns_none_without_a_user_message() {
    let r = renderer();
    let messages = vec![msg("assistant", "hello"), msg("system", "be nice")];
    assert!(r.render_body(&messages).is_none());
}

#[test]
fn strips_subagent_header_lines() {
    let r = renderer();
    let messages = vec![msg("user", "[Subagent Context]\nActual question here")];
    let body = r.render_body(&messages).unwrap();
    assert_eq!(body, "Actual question here");
}

#[test]
fn strips_markdown_task_headers() {
    let r = renderer();
    let messages = vec![msg("user", "### Task: investigate\nWhat is the weather?")];
    let body = r.render_body(&messages).unwrap();
    assert_eq!(body, "What is the weather?");
}

#[test]
fn strips_timestamp_header_lines() {
    let r = renderer();
    let messages = vec![msg("user", "2026-07-28T10:15:00Z\nWhat time is it?")];
    let body = r.render_body(&messages).unwrap();
    assert_eq!(body, "What time is it?");
}

#[test]
fn strips_leaked_marker_lines() {
    let r = renderer();
    let marker = crate::marker::build_marker("s3cr3t", "req-1");
    let content = format!("real question\n{marker}\nmore text");
    let messages = vec![msg("user", &content)];
    let body = r.render_body(&messages).unwrap();
    assert!(!crate::marker::contains_any_marker(&body));
    assert_eq!(body, "real question\nmore text");
}

#[test]
fn collapses_consecutive_blank_lines_left_by_stripping() {
    let r = renderer();
    let messages = vec![msg("user", "[Task]\n\n\nquestion one\n\n\n\nquestion two")];
    let body = r.render_body(&messages).unwrap();
    assert_eq!(body, "question one\n\nquestion two");
}

#[test]
fn control_prompt_short_circuits_to_announce_skip() {
    let r = renderer();
    let messages = vec![msg("user", "  Are   You There  ")];
    assert!(matches!(r.render(&messages), Some(RenderOutcome::AnnounceSkip)));
}

#[test]
fn non_control_prompt_renders_normally() {
    let r = renderer();
    let messages = vec![msg("user", "What is the capital of France?")];
    match r.render(&messages) {
        Some(RenderOutcome::Prompt(body)) => assert_eq!(body, "What is the capital of France?"),
        _ => panic!("expected a rendered prompt"),
    }
}

#[test]
fn is_control_prompt_matches_each_fixed_pattern_case_insensitively() {
    assert!(is_control_prompt("PING"));
    assert!(is_control_prompt("Are You There"));
    assert!(is_control_prompt("Internal Health Check"));
    assert!(is_control_prompt("connectivity   test"));
    assert!(!is_control_prompt("ping me later"));
}

#[test]
fn validate_sizes_rejects_oversized_message() {
    let messages = vec![msg("user", "x".repeat(10))];
    let err = validate_sizes(&messages, "x", 5, 1000).unwrap_err();
    assert_eq!(err, "max_message_chars");
}

#[test]
fn validate_sizes_rejects_oversized_total_prompt_at_boundary() {
    let messages = vec![msg("user", "hello")];
    let rendered = "x".repeat(1001);
    let err = validate_sizes(&messages, &rendered, 10_000, 1000).unwrap_err();
    assert_eq!(err, "max_prompt_chars");
}

#[test]
fn validate_sizes_accepts_exact_boundary() {
    let messages = vec![msg("user", "hello")];
    let rendered = "x".repeat(1000);
    assert!(validate_sizes(&messages, &rendered, 10_000, 1000).is_ok());
}
