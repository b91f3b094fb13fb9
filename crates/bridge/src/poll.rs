// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll-loop state machine: the single-threaded cooperative loop that
//! repeatedly scrapes the UI and decides when a reply is done, recoverable,
//! or fatally failed. Kept as an explicit state record plus a transition
//! function so it can be driven and property-tested without a real clock
//! or a real UI driver.

use std::time::{Duration, Instant};

use crate::error::{BridgeError, ErrorCode};
use crate::extractor::{self, ExtractionResult, NoisePatterns};

/// Knobs the poll loop needs, independent of the full `Config` so it can be
/// constructed directly in tests.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub stable_checks: u32,
    pub extract_no_indicator_stable: Duration,
    pub scrape_call_timeout: Duration,
    pub require_completion_indicators: bool,
    pub completion_indicators: Vec<String>,
    pub ui_unavailable_grace: Duration,
    pub scrape_timeout_grace: Duration,
    pub scrape_timeout_backoff_step: Duration,
    pub scrape_timeout_backoff_cap: Duration,
}

impl PollConfig {
    pub fn from_parts(max_wait_sec: u64, poll_interval_sec: u64, stable_checks: u32, extract_no_indicator_stable_ms: u64, scrape_call_timeout_ms: u64, require_completion_indicators: bool) -> Self {
        let max_wait = Duration::from_secs(max_wait_sec);
        Self {
            poll_interval: Duration::from_secs(poll_interval_sec),
            max_wait,
            stable_checks,
            extract_no_indicator_stable: Duration::from_millis(extract_no_indicator_stable_ms),
            scrape_call_timeout: Duration::from_millis(scrape_call_timeout_ms),
            require_completion_indicators,
            completion_indicators: vec!["Regenerate".to_owned(), "Continue generating".to_owned()],
            ui_unavailable_grace: Duration::from_secs(120),
            scrape_timeout_grace: Duration::from_secs(120).max(max_wait),
            scrape_timeout_backoff_step: Duration::from_secs(5),
            scrape_timeout_backoff_cap: Duration::from_secs(60),
        }
    }
}

/// One scrape attempt's outcome, as classified by the driver before it is
/// handed to the state machine.
pub enum ScrapeOutcome {
    Ok(String),
    UiUnavailable(BridgeError),
    ScrapeTimeout,
    DetectedError(BridgeError),
}

/// Result of a single `PollState::step` call.
pub enum StepOutcome {
    Continue,
    Done(ExtractionResult),
    Failed(BridgeError),
}

/// Explicit poll-loop state, carried across iterations by the caller.
#[derive(Debug, Clone)]
pub struct PollState {
    pub previous_full: Option<String>,
    pub previous_extracted_normalized: Option<String>,
    pub stable_count: u32,
    pub stable_since: Option<Instant>,
    pub scrape_timeout_since: Option<Instant>,
    pub ui_unavailable_since: Option<Instant>,
    pub scrape_timeout_current: Duration,
    last_progress_log: Option<Instant>,
}

impl PollState {
    pub fn new(cfg: &PollConfig) -> Self {
        Self {
            previous_full: None,
            previous_extracted_normalized: None,
            stable_count: 0,
            stable_since: None,
            scrape_timeout_since: None,
            ui_unavailable_since: None,
            scrape_timeout_current: cfg.scrape_call_timeout,
            last_progress_log: None,
        }
    }

    /// Whether a periodic (~30s) progress log should fire now, updating the
    /// internal cadence tracker as a side effect of answering `true`.
    pub fn should_log_progress(&mut self, now: Instant) -> bool {
        match self.last_progress_log {
            Some(last) if now.duration_since(last) < Duration::from_secs(30) => false,
            _ => {
                self.last_progress_log = Some(now);
                true
            }
        }
    }

    fn completion_gate_passed(&self, full_text: &str, cfg: &PollConfig, now: Instant) -> bool {
        let indicators_present = cfg.completion_indicators.iter().any(|label| {
            full_text.to_lowercase().contains(&label.to_lowercase())
        });
        if cfg.require_completion_indicators {
            return indicators_present;
        }
        let stable_long_enough =
            self.stable_since.is_some_and(|since| now.duration_since(since) >= cfg.extract_no_indicator_stable);
        indicators_present || stable_long_enough
    }

    /// Advance the state machine by one scrape outcome. `anchor` is the
    /// pre-send prompt (with marker, if strict); `pre_send_snapshot` feeds
    /// the legacy snapshot-delta fallback.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        outcome: ScrapeOutcome,
        anchor: &str,
        pre_send_snapshot: Option<&str>,
        noise: &NoisePatterns,
        cfg: &PollConfig,
        now: Instant,
    ) -> StepOutcome {
        match outcome {
            ScrapeOutcome::DetectedError(err) => {
                self.stable_count = 0;
                StepOutcome::Failed(err)
            }
            ScrapeOutcome::UiUnavailable(err) => {
                let since = *self.ui_unavailable_since.get_or_insert(now);
                self.stable_count = 0;
                self.previous_extracted_normalized = None;
                if now.duration_since(since) >= cfg.ui_unavailable_grace {
                    StepOutcome::Failed(err.with_detail("grace_exhausted_sec", cfg.ui_unavailable_grace.as_secs()))
                } else {
                    StepOutcome::Continue
                }
            }
            ScrapeOutcome::ScrapeTimeout => {
                let since = *self.scrape_timeout_since.get_or_insert(now);
                self.stable_count = 0;
                if now.duration_since(since) >= cfg.scrape_timeout_grace {
                    StepOutcome::Failed(BridgeError::new(ErrorCode::Timeout, "scrape call timed out repeatedly"))
                } else {
                    self.scrape_timeout_current =
                        (self.scrape_timeout_current + cfg.scrape_timeout_backoff_step).min(cfg.scrape_timeout_backoff_cap);
                    StepOutcome::Continue
                }
            }
            ScrapeOutcome::Ok(full_text) => {
                self.ui_unavailable_since = None;
                self.scrape_timeout_since = None;
                self.scrape_timeout_current = cfg.scrape_call_timeout;
                self.previous_full = Some(full_text.clone());

                match extractor::extract(&full_text, anchor, pre_send_snapshot, noise) {
                    Err(err) => StepOutcome::Failed(err),
                    Ok(None) => {
                        self.stable_count = 0;
                        self.previous_extracted_normalized = None;
                        self.stable_since = None;
                        StepOutcome::Continue
                    }
                    Ok(Some(result)) => {
                        let normalized = extractor::normalize(&result.text);
                        let stable_vs_previous = self.previous_extracted_normalized.as_deref() == Some(normalized.as_str());
                        if stable_vs_previous {
                            self.stable_count += 1;
                        } else {
                            self.stable_count = 1;
                            self.stable_since = Some(now);
                        }
                        self.previous_extracted_normalized = Some(normalized);

                        let strict_marker_required = crate::marker::ends_with_marker(anchor);
                        let marker_gate_passed =
                            !strict_marker_required || result.mode == extractor::ExtractionMode::Marker;

                        let done = stable_vs_previous
                            && !extractor::contains_typing_cursor(&full_text)
                            && self.completion_gate_passed(&full_text, cfg, now)
                            && marker_gate_passed
                            && self.stable_count >= cfg.stable_checks;

                        if done {
                            StepOutcome::Done(result)
                        } else {
                            StepOutcome::Continue
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
