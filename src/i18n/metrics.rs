//! Render metrics and observability.
//!
//! Counters are updated by the scheduler as passes and batches run, and can
//! be snapshotted into a serializable [`MetricsReport`].

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for render activity of one translator.
#[derive(Debug, Default)]
pub struct RenderMetrics {
    /// Passes that were started
    passes_started: AtomicUsize,

    /// Passes that ran to the end of their trigger list
    passes_completed: AtomicUsize,

    /// Passes that stopped because a newer pass superseded them
    passes_aborted: AtomicUsize,

    /// Batches executed across all passes
    batches: AtomicUsize,

    /// Elements written with a resolved translation
    translated: AtomicUsize,

    /// Elements restored to their captured default content
    fallbacks: AtomicUsize,

    /// Triggers skipped because the document rejected them
    failures: AtomicUsize,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass_started(&self) {
        self.passes_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass_completed(&self) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass_aborted(&self) {
        self.passes_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated(&self) {
        self.translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let translated = self.translated.load(Ordering::Relaxed);
        let fallbacks = self.fallbacks.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);

        let touched = translated + fallbacks + failures;
        let translation_rate = if touched > 0 {
            (translated as f64 / touched as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            passes_started: self.passes_started.load(Ordering::Relaxed),
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            passes_aborted: self.passes_aborted.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            translated,
            fallbacks,
            failures,
            translation_rate,
        }
    }
}

/// Snapshot of render statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub passes_started: usize,
    pub passes_completed: usize,
    pub passes_aborted: usize,
    pub batches: usize,
    pub translated: usize,
    pub fallbacks: usize,
    pub failures: usize,

    /// Share of touched elements that received a translation (0-100)
    pub translation_rate: f64,
}
