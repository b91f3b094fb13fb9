// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The UI driver contract: the only boundary the core request-lifecycle
//! engine crosses into OS-accessibility automation. Swapping the desktop
//! chat app out for another one means writing a new `UiDriver`, nothing
//! else in the crate changes.

pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Accessibility permission state as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityState {
    Granted,
    Denied,
    Unknown,
}

/// `health()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub accessibility: AccessibilityState,
    pub app_running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `ask()` request.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub prompt: String,
    pub marker: String,
    pub request_id: String,
    pub conversation_id: Option<String>,
    pub strict_open: bool,
    pub reset_each_request: bool,
    pub reset_strict: bool,
}

/// Extraction mode reported back by a successful `ask()`, mirrored from
/// [`crate::extractor::ExtractionMode`] at the driver boundary so this
/// module does not need to depend on the extractor's internals directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Marker,
    SnapshotDelta,
}

/// `ask()` response.
#[derive(Debug, Clone)]
pub struct AskResponse {
    pub text: String,
    pub context_reset: bool,
    pub opened_conversation_id: Option<String>,
    pub extraction_mode: ExtractionMode,
}

/// The operations the core depends on. Implementations are expected to:
/// preflight window availability; optionally reset to a new chat; open a
/// named conversation from the sidebar (or fail under `strict_open`); focus
/// the input; acquire a process-wide clipboard lock; paste; submit; and run
/// the poll loop. Clipboard contents must be restored on every exit path.
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn health(&self) -> HealthStatus;

    async fn ask(&self, request: AskRequest) -> Result<AskResponse, BridgeError>;

    async fn get_conversations(&self, request_id: &str) -> Result<Vec<String>, BridgeError>;
}
