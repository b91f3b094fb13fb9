// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

/// Runtime configuration for the bridge process.
///
/// Every field has an environment-variable alias so the bridge can be
/// driven entirely by env vars under a launcher/supervisor, or by flags
/// for local development.
#[derive(Debug, Parser, Clone)]
#[command(name = "chatgpt-bridge", version, about)]
pub struct Config {
    /// Transport mode: `http` (default) or `stdio`.
    #[arg(long, env = "BRIDGE_MODE", default_value = "http")]
    pub mode: String,

    /// HTTP bind host.
    #[arg(long, env = "HTTP_HOST", default_value = "127.0.0.1")]
    pub http_host: String,

    /// HTTP bind port.
    #[arg(long, env = "HTTP_PORT", default_value = "7765")]
    pub http_port: u16,

    /// Shared-secret bearer token. When unset, auth is disabled (dev only).
    #[arg(long, env = "CHATGPT_BRIDGE_TOKEN")]
    pub bridge_token: Option<String>,

    /// HMAC key used to compute the per-request marker tag. If unset, an
    /// ephemeral random key is generated at startup and a warning logged —
    /// markers then only match within a single process lifetime.
    #[arg(long, env = "MARKER_SECRET")]
    pub marker_secret: Option<String>,

    /// Maximum size of the non-completion FIFO job queue.
    #[arg(long, env = "MAX_QUEUE_SIZE", default_value = "20")]
    pub max_queue_size: usize,

    /// Default per-job timeout for queued (non-completion) jobs, in ms.
    /// Clamped to at least `max_wait_sec * 1000 + 15_000`.
    #[arg(long, env = "JOB_TIMEOUT_MS", default_value = "30000")]
    pub job_timeout_ms: u64,

    /// Poll-loop deadline in seconds.
    #[arg(long, env = "MAX_WAIT_SEC", default_value = "120")]
    pub max_wait_sec: u64,

    /// Delay between poll iterations, in seconds.
    #[arg(long, env = "POLL_INTERVAL_SEC", default_value = "1")]
    pub poll_interval_sec: u64,

    /// Consecutive stable extractions required before declaring done.
    #[arg(long, env = "STABLE_CHECKS", default_value = "3")]
    pub stable_checks: u32,

    /// How long extracted text must sit unchanged (ms) before the
    /// completion gate passes in the absence of completion indicators.
    #[arg(long, env = "EXTRACT_NO_INDICATOR_STABLE_MS", default_value = "1500")]
    pub extract_no_indicator_stable_ms: u64,

    /// Inner timeout for a single scrape call, in ms.
    #[arg(long, env = "SCRAPE_CALL_TIMEOUT_MS", default_value = "5000")]
    pub scrape_call_timeout_ms: u64,

    /// Maximum characters in the fully-rendered prompt (incl. marker and
    /// file context) sent to the UI.
    #[arg(long, env = "MAX_PROMPT_CHARS", default_value = "512000")]
    pub max_prompt_chars: usize,

    /// Maximum characters in any single original message.
    #[arg(long, env = "MAX_MESSAGE_CHARS", default_value = "512000")]
    pub max_message_chars: usize,

    /// Maximum characters contributed by a single expanded file.
    #[arg(long, env = "FILE_CONTEXT_MAX_FILE_CHARS", default_value = "100000")]
    pub file_context_max_file_chars: usize,

    /// Maximum total characters contributed by file-context expansion.
    #[arg(long, env = "FILE_CONTEXT_MAX_TOTAL_CHARS", default_value = "400000")]
    pub file_context_max_total_chars: usize,

    /// Comma-separated list of absolute directories file-context paths must
    /// resolve inside. Empty means unrestricted (single-user default).
    #[arg(long, env = "FILE_CONTEXT_ALLOWED_ROOTS", value_delimiter = ',')]
    pub file_context_allowed_roots: Vec<String>,

    /// Requests per minute for the token-bucket limiter.
    #[arg(long, env = "RATE_LIMIT_RPM", default_value = "60")]
    pub rate_limit_rpm: u32,

    /// Burst capacity for the token-bucket limiter.
    #[arg(long, env = "RATE_LIMIT_BURST", default_value = "10")]
    pub rate_limit_burst: u32,

    /// Require completion indicator labels (vs. quiet-window-only gating).
    #[arg(long, env = "REQUIRE_COMPLETION_INDICATORS", default_value = "false")]
    pub require_completion_indicators: bool,

    /// Reset to a new chat before every request.
    #[arg(long, env = "RESET_CHAT_EACH_REQUEST", default_value = "false")]
    pub reset_chat_each_request: bool,

    /// Fail the request if a requested reset cannot be performed.
    #[arg(long, env = "RESET_STRICT", default_value = "false")]
    pub reset_strict: bool,

    /// Session routing mode: `off`, `sticky`, or `explicit`.
    #[arg(long, env = "SESSION_BINDING_MODE", default_value = "off")]
    pub session_binding_mode: String,

    /// Default slot name used when the client doesn't supply one.
    #[arg(long, env = "SESSION_DEFAULT_SLOT", default_value = "default")]
    pub session_default_slot: String,

    /// Path to the session-bindings JSON file.
    #[arg(long, env = "SESSION_BINDINGS_PATH", default_value = "session-bindings.json")]
    pub session_bindings_path: String,

    /// Require the named conversation to already exist in the sidebar.
    #[arg(long, env = "SESSION_BINDING_STRICT_OPEN", default_value = "false")]
    pub session_binding_strict_open: bool,

    /// Log format: `json` or `text`.
    #[arg(long, env = "BRIDGE_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level filter.
    #[arg(long, env = "BRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path to the append-only audit log JSONL file.
    #[arg(long, env = "AUDIT_LOG_PATH", default_value = "audit.jsonl")]
    pub audit_log_path: String,

    /// Audit log rotation threshold, in bytes.
    #[arg(long, env = "AUDIT_LOG_MAX_BYTES", default_value = "10485760")]
    pub audit_log_max_bytes: u64,

    /// Maximum age (in days) of rotated audit log files before purge.
    #[arg(long, env = "AUDIT_LOG_MAX_AGE_DAYS", default_value = "14")]
    pub audit_log_max_age_days: u64,

    /// Audit log sanitization mode: `full`, `headers`, or `metadata`.
    #[arg(long, env = "AUDIT_LOG_SANITIZE", default_value = "full")]
    pub audit_log_sanitize: String,

    /// Maximum raw HTTP request body size, in bytes.
    #[arg(long, env = "HTTP_BODY_LIMIT_BYTES", default_value = "2097152")]
    pub http_body_limit_bytes: usize,
}

/// Session routing mode, parsed from `Config::session_binding_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    Off,
    Sticky,
    Explicit,
}

/// Audit log sanitization mode, parsed from `Config::audit_log_sanitize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    Full,
    Headers,
    Metadata,
}

impl Config {
    /// Validate cross-field invariants and clamp derived values. Called
    /// once at startup before the server binds.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode != "http" && self.mode != "stdio" {
            anyhow::bail!("invalid --mode: {} (expected http or stdio)", self.mode);
        }
        self.routing_mode()?;
        self.sanitize_mode()?;
        if self.stable_checks == 0 {
            anyhow::bail!("--stable-checks must be >= 1");
        }
        if self.rate_limit_burst == 0 {
            anyhow::bail!("--rate-limit-burst must be >= 1");
        }
        Ok(())
    }

    pub fn routing_mode(&self) -> anyhow::Result<RoutingMode> {
        match self.session_binding_mode.to_lowercase().as_str() {
            "off" => Ok(RoutingMode::Off),
            "sticky" => Ok(RoutingMode::Sticky),
            "explicit" => Ok(RoutingMode::Explicit),
            other => anyhow::bail!("invalid session binding mode: {other}"),
        }
    }

    pub fn sanitize_mode(&self) -> anyhow::Result<SanitizeMode> {
        match self.audit_log_sanitize.to_lowercase().as_str() {
            "full" => Ok(SanitizeMode::Full),
            "headers" => Ok(SanitizeMode::Headers),
            "metadata" => Ok(SanitizeMode::Metadata),
            other => anyhow::bail!("invalid audit log sanitize mode: {other}"),
        }
    }

    /// Effective job timeout, clamped to at least `max_wait_sec + 15s`.
    pub fn effective_job_timeout_ms(&self) -> u64 {
        let floor = self.max_wait_sec.saturating_mul(1000).saturating_add(15_000);
        self.job_timeout_ms.max(floor)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
