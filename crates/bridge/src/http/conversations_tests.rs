// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum_test::TestServer;
use clap::Parser;

use super::super::build_router;
use super::*;
use crate::config::Config;
use crate::driver::stub::StubDriver;
use crate::prompt::PromptRenderer;

fn server_with_conversations(titles: Vec<String>) -> TestServer {
    let config = Config::parse_from(["chatgpt-bridge"]);
    let driver = StubDriver::new("hello").with_conversations(titles);
    let state = Arc::new(AppState::new(config, driver, "test-secret".to_owned(), PromptRenderer::new().unwrap()).unwrap());
    TestServer::new(build_router(state)).unwrap()
}

fn server_with_zero_capacity_queue() -> TestServer {
    let config = Config::parse_from(["chatgpt-bridge", "--max-queue-size", "0"]);
    let driver = StubDriver::new("hello");
    let state = Arc::new(AppState::new(config, driver, "test-secret".to_owned(), PromptRenderer::new().unwrap()).unwrap());
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn returns_the_driver_reported_conversations() {
    let server = server_with_conversations(vec!["Project Alpha".to_owned(), "Project Beta".to_owned()]);
    let response = server.get("/v1/bridge/conversations").await;
    response.assert_status_ok();
    let body: ConversationListResponse = response.json();
    assert_eq!(body.conversations, vec!["Project Alpha", "Project Beta"]);
}

#[tokio::test]
async fn response_carries_the_common_bridge_headers() {
    let server = server_with_conversations(Vec::new());
    let response = server.get("/v1/bridge/conversations").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-bridge-request-id"));
    assert!(response.headers().contains_key("x-bridge-version"));
}

#[tokio::test]
async fn a_queue_full_error_carries_a_retry_after_header() {
    let server = server_with_zero_capacity_queue();
    let response = server.get("/v1/bridge/conversations").await;
    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get("retry-after").unwrap(), "10");
}
