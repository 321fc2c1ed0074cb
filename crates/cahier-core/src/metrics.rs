//! Global atomic counters for Cahier observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a pipeline run).
//! Nothing in the stores or agents reads these values back.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    versions_created: AtomicU64,
    requests_registered: AtomicU64,
    llm_calls: AtomicU64,
    malformed_replies: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            versions_created: AtomicU64::new(0),
            requests_registered: AtomicU64::new(0),
            llm_calls: AtomicU64::new(0),
            malformed_replies: AtomicU64::new(0),
        }
    }

    pub fn inc_versions_created(&self) {
        self.versions_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "versions_created", "counter incremented");
    }

    pub fn inc_requests_registered(&self) {
        self.requests_registered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "requests_registered", "counter incremented");
    }

    pub fn inc_llm_calls(&self) {
        self.llm_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "llm_calls", "counter incremented");
    }

    pub fn inc_malformed_replies(&self) {
        self.malformed_replies.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "malformed_replies", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            versions_created = self.versions_created(),
            requests_registered = self.requests_registered(),
            llm_calls = self.llm_calls(),
            malformed_replies = self.malformed_replies(),
        );
    }

    pub fn versions_created(&self) -> u64 {
        self.versions_created.load(Ordering::Relaxed)
    }

    pub fn requests_registered(&self) -> u64 {
        self.requests_registered.load(Ordering::Relaxed)
    }

    pub fn llm_calls(&self) -> u64 {
        self.llm_calls.load(Ordering::Relaxed)
    }

    pub fn malformed_replies(&self) -> u64 {
        self.malformed_replies.load(Ordering::Relaxed)
    }
}
