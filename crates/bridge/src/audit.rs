// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL audit log with size-based rotation and age-based
//! purge. Every line is a self-contained, sanitized event; nothing is ever
//! rewritten in place.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::SanitizeMode;

const SENSITIVE_HEADER_NAMES: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key", "proxy-authorization"];
const SENSITIVE_FIELD_SUBSTRINGS: &[&str] = &["token", "secret", "password", "authorization", "apikey", "api_key"];
const REDACTED: &str = "[redacted]";
/// Fields dropped entirely under metadata-only sanitization — anything that
/// could carry prompt or response content.
const CONTENT_FIELD_NAMES: &[&str] = &["body", "prompt", "content", "headers", "messages", "text"];

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// One audit record. `fields` carries event-specific data (e.g. for
/// `prompt_send`: session slot, routing mode, byte counts); sensitive
/// content is sanitized per the configured mode before it ever reaches disk.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub kind: &'static str,
    pub request_id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl AuditEvent {
    pub fn new(kind: &'static str, request_id: impl Into<String>) -> Self {
        Self { kind, request_id: request_id.into(), fields: serde_json::Map::new() }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[derive(Serialize)]
struct LogLine {
    timestamp_ms: u64,
    kind: &'static str,
    request_id: String,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

fn is_sensitive_field(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_FIELD_SUBSTRINGS.iter().any(|needle| lower.contains(needle))
}

fn sanitize_headers_object(value: &mut serde_json::Value) {
    if let serde_json::Value::Object(map) = value {
        for (key, val) in map.iter_mut() {
            if SENSITIVE_HEADER_NAMES.contains(&key.to_lowercase().as_str()) {
                *val = serde_json::Value::String(REDACTED.to_owned());
            }
        }
    }
}

/// Apply a sanitization mode to an event's fields, returning the map that
/// will actually be written to disk.
fn sanitize(mode: SanitizeMode, mut fields: serde_json::Map<String, serde_json::Value>) -> serde_json::Map<String, serde_json::Value> {
    match mode {
        SanitizeMode::Full => {
            for (key, value) in fields.iter_mut() {
                if key == "headers" {
                    sanitize_headers_object(value);
                } else if is_sensitive_field(key) {
                    *value = serde_json::Value::String(REDACTED.to_owned());
                }
            }
            fields
        }
        SanitizeMode::Headers => {
            if let Some(headers) = fields.get_mut("headers") {
                sanitize_headers_object(headers);
            }
            fields
        }
        SanitizeMode::Metadata => {
            fields.retain(|key, _| !CONTENT_FIELD_NAMES.contains(&key.as_str()));
            fields
        }
    }
}

/// Append-only JSONL audit log. Rotation and writes are serialized behind a
/// single mutex; file I/O is blocking (one append + occasional rename),
/// matching the write-chain discipline used for session bindings.
pub struct AuditLog {
    path: PathBuf,
    max_bytes: u64,
    max_age_days: u64,
    sanitize_mode: SanitizeMode,
    state: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, max_age_days: u64, sanitize_mode: SanitizeMode) -> Self {
        Self { path: path.into(), max_bytes, max_age_days, sanitize_mode, state: Mutex::new(()) }
    }

    /// Append one event, rotating and purging as needed first.
    pub fn record(&self, event: AuditEvent) {
        let _guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let fields = sanitize(self.sanitize_mode, event.fields);
        let line = LogLine { timestamp_ms: now_ms(), kind: event.kind, request_id: event.request_id, fields };
        let Ok(mut serialized) = serde_json::to_string(&line) else {
            return;
        };
        serialized.push('\n');

        self.rotate_if_needed(serialized.len() as u64);
        self.purge_aged_out();

        if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = file.write_all(serialized.as_bytes());
        }
    }

    fn rotate_if_needed(&self, incoming_bytes: u64) {
        let current_size = std::fs::metadata(&self.path).map(|meta| meta.len()).unwrap_or(0);
        if current_size == 0 || current_size + incoming_bytes <= self.max_bytes {
            return;
        }

        let next_index = self.highest_rotated_index().saturating_add(1);
        let rotated_path = self.rotated_path(next_index);
        let _ = std::fs::rename(&self.path, rotated_path);
    }

    fn rotated_path(&self, index: u64) -> PathBuf {
        let mut name = file_name(&self.path);
        name.push('.');
        name.push_str(&index.to_string());
        directory_of(&self.path).join(name)
    }

    fn highest_rotated_index(&self) -> u64 {
        let dir = directory_of(&self.path);
        let prefix = format!("{}.", file_name(&self.path));
        std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().and_then(|n| n.strip_prefix(&prefix)).and_then(|suffix| suffix.parse::<u64>().ok()))
            .max()
            .unwrap_or(0)
    }

    fn purge_aged_out(&self) {
        let dir = directory_of(&self.path);
        let prefix = format!("{}.", file_name(&self.path));
        let max_age = Duration::from_secs(self.max_age_days.saturating_mul(86_400));
        let now = SystemTime::now();

        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let is_rotated = entry.file_name().to_str().is_some_and(|n| n.starts_with(&prefix));
            if !is_rotated {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(modified) = meta.modified() else { continue };
            if now.duration_since(modified).unwrap_or(Duration::ZERO) > max_age {
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("audit.jsonl").to_owned()
}

fn directory_of(path: &Path) -> PathBuf {
    path.parent().filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
