// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use clap::Parser;

use super::*;
use crate::config::Config;
use crate::driver::stub::StubDriver;
use crate::prompt::PromptRenderer;

fn test_state() -> Arc<AppState> {
    let config = Config::parse_from(["chatgpt-bridge"]);
    let driver = StubDriver::new("hello");
    Arc::new(AppState::new(config, driver, "test-secret".to_owned(), PromptRenderer::new().unwrap()).unwrap())
}

#[tokio::test]
async fn health_reports_driver_status_and_queue_depth() {
    let state = test_state();
    let response = health(State(state)).await.0;
    assert!(response.ok);
    assert!(response.ready);
    assert_eq!(response.queue_depth, 0);
    assert_eq!(response.mode, "http");
}
