// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A configurable in-memory [`UiDriver`] used by integration tests. Also
//! serves as the binary's placeholder driver until a real OS-accessibility
//! driver is wired in by the launcher.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AccessibilityState, AskRequest, AskResponse, ExtractionMode, HealthStatus, UiDriver};
use crate::error::BridgeError;

/// Fixed reply text, an optional artificial delay before answering, and an
/// optional failure to return instead. Builder-configured per test.
pub struct StubDriver {
    reply_text: String,
    ask_delay: Duration,
    ask_failure: Mutex<Option<BridgeError>>,
    opened_conversation_id: Mutex<Option<String>>,
    conversations: Vec<String>,
    ask_call_count: AtomicU32,
    last_request: Mutex<Option<AskRequest>>,
}

impl StubDriver {
    pub fn new(reply_text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply_text: reply_text.into(),
            ask_delay: Duration::ZERO,
            ask_failure: Mutex::new(None),
            opened_conversation_id: Mutex::new(None),
            conversations: Vec::new(),
            ask_call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn with_delay(mut self: Arc<Self>, delay: Duration) -> Arc<Self> {
        if let Some(s) = Arc::get_mut(&mut self) {
            s.ask_delay = delay;
        }
        self
    }

    pub fn with_conversations(mut self: Arc<Self>, titles: Vec<String>) -> Arc<Self> {
        if let Some(s) = Arc::get_mut(&mut self) {
            s.conversations = titles;
        }
        self
    }

    pub fn ask_call_count(&self) -> u32 {
        self.ask_call_count.load(Ordering::SeqCst)
    }

    pub async fn last_request_conversation_id(&self) -> Option<String> {
        self.last_request.lock().await.as_ref().and_then(|r| r.conversation_id.clone())
    }

    pub async fn set_ask_failure(&self, err: BridgeError) {
        *self.ask_failure.lock().await = Some(err);
    }

    pub async fn set_opened_conversation_id(&self, id: impl Into<String>) {
        *self.opened_conversation_id.lock().await = Some(id.into());
    }
}

#[async_trait]
impl UiDriver for StubDriver {
    async fn health(&self) -> HealthStatus {
        HealthStatus { ok: true, accessibility: AccessibilityState::Granted, app_running: Some(true), code: None, message: None }
    }

    async fn ask(&self, request: AskRequest) -> Result<AskResponse, BridgeError> {
        self.ask_call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some(request.clone());

        if self.ask_delay > Duration::ZERO {
            tokio::time::sleep(self.ask_delay).await;
        }
        if let Some(err) = self.ask_failure.lock().await.clone() {
            return Err(err);
        }

        let opened_conversation_id =
            self.opened_conversation_id.lock().await.clone().or_else(|| request.conversation_id.clone());

        Ok(AskResponse {
            text: self.reply_text.clone(),
            context_reset: request.reset_each_request,
            opened_conversation_id,
            extraction_mode: ExtractionMode::Marker,
        })
    }

    async fn get_conversations(&self, _request_id: &str) -> Result<Vec<String>, BridgeError> {
        Ok(self.conversations.clone())
    }
}
