// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight admission: at most one UI transaction runs end-to-end.
//! A fingerprint-keyed in-flight entry coalesces exact retries and rejects
//! mismatched concurrent callers; a separate bounded FIFO queue serializes
//! non-completion jobs (conversation listing).
//!
//! Idempotency-Key based replay (beyond in-flight coalescing) is explicitly
//! out of scope; see the design notes. A future dedup store would key a
//! TTL map by `(idempotency_key, fingerprint)` and return the cached
//! response on replay — not implemented here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;

use crate::error::{BridgeError, ErrorCode};

/// Canonical fingerprint inputs. The marker is deliberately excluded so
/// retries with fresh request ids (and therefore fresh markers) still
/// coalesce against the same in-flight entry.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintInputs<'a> {
    pub prompt_body_without_marker: &'a str,
    pub routing_mode: &'a str,
    pub session_slot: &'a str,
    pub conversation_id: &'a str,
    pub strict_open: bool,
}

/// Compute the fingerprint: a stable hash of the canonical JSON
/// serialization of the inputs.
pub fn fingerprint(inputs: &FingerprintInputs<'_>) -> String {
    let canonical = serde_json::to_string(inputs).unwrap_or_default();
    let digest = ring::digest::digest(&ring::digest::SHA256, canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(digest.as_ref())
}

/// Outcome of an admission attempt.
pub enum Admission<T> {
    /// No entry existed; the caller now owns running the task and must
    /// call [`AdmissionGate::settle`] when it completes.
    Admitted,
    /// An identical in-flight entry existed; await this receiver for the
    /// same result the original caller will get.
    Join(broadcast::Receiver<T>),
    /// A different fingerprint is in flight.
    Reject,
}

struct InFlightEntry<T> {
    fingerprint: String,
    result_tx: broadcast::Sender<T>,
}

/// Single-slot admission gate. `T` must be `Clone` so the settled result can
/// be broadcast to every joiner.
pub struct AdmissionGate<T: Clone + Send + 'static> {
    slot: Mutex<Option<InFlightEntry<T>>>,
}

impl<T: Clone + Send + 'static> Default for AdmissionGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> AdmissionGate<T> {
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Attempt to admit `fingerprint`. See [`Admission`] for outcomes.
    pub async fn try_admit(&self, fingerprint: &str) -> Admission<T> {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(entry) if entry.fingerprint == fingerprint => Admission::Join(entry.result_tx.subscribe()),
            Some(_) => Admission::Reject,
            None => {
                let (result_tx, _rx) = broadcast::channel(1);
                *slot = Some(InFlightEntry { fingerprint: fingerprint.to_owned(), result_tx });
                Admission::Admitted
            }
        }
    }

    /// Settle the in-flight entry: broadcast the result to every joiner and
    /// clear the slot. Must be called exactly once by the admitted caller.
    pub async fn settle(&self, result: T) {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.take() {
            let _ = entry.result_tx.send(result);
        }
    }
}

/// Bounded FIFO job queue for non-completion operations (conversation
/// listing, stdio ask). Completion handlers use [`Self::add_if_idle`]
/// instead, which never blocks behind queued work.
pub struct JobQueue {
    semaphore: Arc<tokio::sync::Semaphore>,
    max_size: usize,
    running: Arc<tokio::sync::Mutex<()>>,
    default_retry_after_sec: u64,
}

impl JobQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_size)),
            max_size,
            running: Arc::new(tokio::sync::Mutex::new(())),
            default_retry_after_sec: 10,
        }
    }

    pub fn depth(&self) -> usize {
        self.max_size.saturating_sub(self.semaphore.available_permits())
    }

    /// Enqueue `task`, running it in FIFO order behind any already-queued
    /// work. Rejects with `queue_full` if the queue is at capacity.
    pub async fn enqueue<F, T>(&self, job_timeout: Duration, task: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, BridgeError>> + Send,
    {
        let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
            return Err(BridgeError::new(ErrorCode::QueueFull, "job queue is at capacity")
                .with_retry_after_sec(self.default_retry_after_sec));
        };

        let outcome = timeout(job_timeout, task).await;
        drop(permit);
        match outcome {
            Ok(result) => result,
            Err(_) => Err(BridgeError::new(ErrorCode::Timeout, "job timed out waiting for the queue")),
        }
    }

    /// Enqueue `task` only if the queue is empty and no job is currently
    /// running; otherwise return `queue_full`, which the HTTP layer maps to
    /// `409 previous_response_pending` for completion handlers. See the
    /// design notes on the `add_if_idle` race: a genuinely idle queue with a
    /// different in-flight fingerprint is intentionally rejected here
    /// rather than widened to coalesce, matching documented behavior.
    pub async fn add_if_idle<F, T>(&self, job_timeout: Duration, task: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, BridgeError>> + Send,
    {
        if self.depth() > 0 {
            return Err(BridgeError::new(ErrorCode::QueueFull, "a job is already queued"));
        }
        let Ok(_running_guard) = self.running.clone().try_lock_owned() else {
            return Err(BridgeError::new(ErrorCode::QueueFull, "a job is already running"));
        };
        self.enqueue(job_timeout, task).await
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
