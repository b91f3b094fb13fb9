// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The request-lifecycle engine behind an OpenAI-compatible HTTP bridge
//! over a desktop chat application driven through OS accessibility
//! automation: admission, poll loop, extractor, session routing, error
//! taxonomy, and the HTTP surface that ties them together. The actual
//! OS-automation primitives live behind [`driver::UiDriver`] and are
//! supplied externally; this crate never touches the accessibility tree
//! directly.

pub mod admission;
pub mod audit;
pub mod bindings_store;
pub mod config;
pub mod driver;
pub mod error;
pub mod extractor;
pub mod file_context;
pub mod http;
pub mod limiter;
pub mod marker;
pub mod poll;
pub mod prompt;
pub mod session_router;
pub mod ui_error;

pub use config::Config;
pub use error::{BridgeError, ErrorCode};
