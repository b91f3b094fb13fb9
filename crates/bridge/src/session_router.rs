// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves a conversation binding per request (off / sticky / explicit) and
//! persists successful sticky/explicit bindings through [`BindingsStore`].

use crate::bindings_store::BindingsStore;
use crate::config::RoutingMode;
use crate::error::{BridgeError, ErrorCode};

/// Where a routing resolution's conversation id (if any) came from. Only
/// `Body` persists a fresh binding — a binding resolved from the store is
/// already persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationSource {
    Body,
    PersistedBinding,
    Unspecified,
}

/// Resolved routing decision for one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub slot: String,
    pub conversation_id: Option<String>,
    pub source: ConversationSource,
    pub strict_open: bool,
}

/// Normalize a session slot: trim, lowercase, fall back to `default_slot`
/// when empty.
pub fn normalize_slot(raw: &str, default_slot: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default_slot.trim().to_lowercase()
    } else {
        trimmed.to_lowercase()
    }
}

pub struct SessionRouter {
    store: BindingsStore,
    default_slot: String,
    strict_open: bool,
}

impl SessionRouter {
    pub fn new(bindings_path: impl Into<std::path::PathBuf>, default_slot: impl Into<String>, strict_open: bool) -> Self {
        Self { store: BindingsStore::new(bindings_path), default_slot: default_slot.into(), strict_open }
    }

    /// Resolve routing for one request. `body_conversation_id` is whatever
    /// the client sent in the request body (already trimmed), if any.
    pub async fn resolve(
        &self,
        mode: RoutingMode,
        raw_slot: &str,
        body_conversation_id: Option<&str>,
    ) -> Result<Resolution, BridgeError> {
        let slot = normalize_slot(raw_slot, &self.default_slot);

        match mode {
            RoutingMode::Off => {
                Ok(Resolution { slot: String::new(), conversation_id: None, source: ConversationSource::Unspecified, strict_open: false })
            }
            RoutingMode::Explicit => {
                let conversation_id = body_conversation_id.filter(|s| !s.is_empty());
                let Some(conversation_id) = conversation_id else {
                    return Err(BridgeError::new(ErrorCode::InvalidRequest, "conversation_id is required in explicit routing mode")
                        .with_detail("reason", "missing_conversation_id"));
                };
                Ok(Resolution {
                    slot,
                    conversation_id: Some(conversation_id.to_owned()),
                    source: ConversationSource::Body,
                    strict_open: self.strict_open,
                })
            }
            RoutingMode::Sticky => {
                if let Some(id) = body_conversation_id.filter(|s| !s.is_empty()) {
                    return Ok(Resolution {
                        slot,
                        conversation_id: Some(id.to_owned()),
                        source: ConversationSource::Body,
                        strict_open: self.strict_open,
                    });
                }
                let persisted = self.store.get(&slot).await.map_err(|err| {
                    BridgeError::new(ErrorCode::Unknown, format!("failed to read session bindings: {err}"))
                })?;
                match persisted {
                    Some(id) => Ok(Resolution { slot, conversation_id: Some(id), source: ConversationSource::PersistedBinding, strict_open: self.strict_open }),
                    None => Ok(Resolution { slot, conversation_id: None, source: ConversationSource::Unspecified, strict_open: self.strict_open }),
                }
            }
        }
    }

    /// Persist a binding after a successful ask, when the driver reports an
    /// opened conversation id and the resolution came from the request body
    /// (sticky or explicit).
    pub async fn record_binding(&self, mode: RoutingMode, resolution: &Resolution, opened_conversation_id: Option<&str>) -> anyhow::Result<()> {
        if mode == RoutingMode::Off {
            return Ok(());
        }
        let should_persist = matches!(mode, RoutingMode::Explicit) || resolution.source == ConversationSource::Body;
        if !should_persist {
            return Ok(());
        }
        if let Some(conversation_id) = opened_conversation_id {
            self.store.set(&resolution.slot, conversation_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_router_tests.rs"]
mod tests;
