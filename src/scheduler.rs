//! Chunked render scheduler.
//!
//! The scheduler keeps one [`TranslationTrigger`] per marked element and
//! replays them onto the document in batches of at most `chunk_size`,
//! awaiting the frame clock before every batch.
//!
//! Each render pass takes a new generation id. A pass whose generation is
//! no longer the latest when its next batch is due stops without touching
//! the document, so overlapping passes cannot leave the page in a mix of
//! two languages.

use crate::document::{DocumentAdapter, ElementId};
use crate::error::Result;
use crate::frame::FrameClock;
use crate::i18n::{RenderMetrics, TranslationStore};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// What a trigger wrote into its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The key resolved to non-empty text.
    Translated,
    /// The key was missing (or empty), so the captured default was restored.
    Fallback,
}

/// Binding between one marked element and its translation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTrigger {
    element: ElementId,
    key: String,
    default_content: String,
}

impl TranslationTrigger {
    pub fn new(
        element: ElementId,
        key: impl Into<String>,
        default_content: impl Into<String>,
    ) -> Self {
        Self {
            element,
            key: key.into(),
            default_content: default_content.into(),
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Content captured when the element was discovered.
    pub fn default_content(&self) -> &str {
        &self.default_content
    }

    /// Resolve the key in the effective language and write the result.
    pub fn fire(
        &self,
        store: &RwLock<TranslationStore>,
        document: &dyn DocumentAdapter,
    ) -> Result<TriggerOutcome> {
        // Producers run after the read lock is released.
        let value = store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(&self.key, None)?;

        match value.map(|value| value.render()).filter(|text| !text.is_empty()) {
            Some(text) => {
                document.set_content(self.element, &text)?;
                Ok(TriggerOutcome::Translated)
            }
            None => {
                document.set_content(self.element, &self.default_content)?;
                Ok(TriggerOutcome::Fallback)
            }
        }
    }
}

/// Remaining triggers of one in-flight render pass.
#[derive(Debug)]
pub struct PendingChunkJob {
    triggers: Arc<[TranslationTrigger]>,
    next: usize,
}

impl PendingChunkJob {
    pub fn new(triggers: Arc<[TranslationTrigger]>) -> Self {
        Self { triggers, next: 0 }
    }

    /// Take up to `size` triggers from the front.
    pub fn take(&mut self, size: usize) -> &[TranslationTrigger] {
        let start = self.next;
        self.next = (start + size).min(self.triggers.len());
        &self.triggers[start..self.next]
    }

    pub fn remaining(&self) -> usize {
        self.triggers.len() - self.next
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// Summary of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    /// Generation id of the pass
    pub generation: u64,

    /// Triggers in the pass snapshot
    pub total: usize,

    /// Batches executed (each preceded by one frame yield)
    pub batches: usize,

    pub translated: usize,
    pub fallbacks: usize,

    /// Triggers skipped because they failed
    pub failures: usize,

    /// Whether a newer pass superseded this one before it finished
    pub aborted: bool,
}

impl RenderReport {
    /// Triggers that ran, successfully or not.
    pub fn processed(&self) -> usize {
        self.translated + self.fallbacks + self.failures
    }

    pub fn is_complete(&self) -> bool {
        !self.aborted && self.processed() == self.total
    }
}

/// Owns the trigger list and runs render passes over it.
#[derive(Debug)]
pub struct RenderScheduler {
    marker_attribute: String,
    triggers: Mutex<Option<Arc<[TranslationTrigger]>>>,
    generation: AtomicU64,
}

impl RenderScheduler {
    pub fn new(marker_attribute: impl Into<String>) -> Self {
        Self {
            marker_attribute: marker_attribute.into(),
            triggers: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn marker_attribute(&self) -> &str {
        &self.marker_attribute
    }

    /// Rebuild the trigger list from the document.
    ///
    /// Each element's current content becomes its fallback, so rescanning an
    /// already translated page captures the translated text. Returns the
    /// number of triggers.
    pub fn rescan(&self, document: &dyn DocumentAdapter) -> usize {
        let triggers: Vec<TranslationTrigger> = document
            .marked_elements(&self.marker_attribute)
            .into_iter()
            .filter_map(|marked| match document.content(marked.id) {
                Ok(content) => Some(TranslationTrigger::new(marked.id, marked.key, content)),
                Err(e) => {
                    warn!("Skipping element {} during rescan: {}", marked.id, e);
                    None
                }
            })
            .collect();

        let count = triggers.len();
        *self.triggers.lock().unwrap_or_else(PoisonError::into_inner) = Some(triggers.into());
        debug!("Rescanned document: {} marked elements", count);
        count
    }

    /// Number of known triggers, or `None` before the first rescan.
    pub fn trigger_count(&self) -> Option<usize> {
        self.triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|triggers| triggers.len())
    }

    /// Copy of the current trigger list.
    pub fn triggers(&self) -> Vec<TranslationTrigger> {
        self.triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|triggers| triggers.to_vec())
            .unwrap_or_default()
    }

    /// Generation id of the most recently started pass.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn snapshot(&self, document: &dyn DocumentAdapter) -> Arc<[TranslationTrigger]> {
        if let Some(triggers) = self
            .triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(triggers);
        }

        self.rescan(document);
        self.triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Claim the next generation id, superseding every pass started before.
    ///
    /// Callers that run the pass on another task must claim the id before
    /// spawning, so the order of requests decides which pass wins.
    pub fn begin_pass(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claim a generation and run the pass on the current task.
    pub async fn render(
        &self,
        store: &RwLock<TranslationStore>,
        document: &dyn DocumentAdapter,
        clock: &dyn FrameClock,
        metrics: &RenderMetrics,
    ) -> RenderReport {
        let generation = self.begin_pass();
        self.render_pass(generation, store, document, clock, metrics)
            .await
    }

    /// Run the pass claimed by [`RenderScheduler::begin_pass`] to completion
    /// (or until superseded).
    ///
    /// Rescans first if no trigger list exists yet. The chunk size is read
    /// from the store before every batch, so changes made mid-pass apply to
    /// the next batch. Failing triggers are logged and skipped.
    pub async fn render_pass(
        &self,
        generation: u64,
        store: &RwLock<TranslationStore>,
        document: &dyn DocumentAdapter,
        clock: &dyn FrameClock,
        metrics: &RenderMetrics,
    ) -> RenderReport {
        let mut job = PendingChunkJob::new(self.snapshot(document));
        let mut report = RenderReport {
            generation,
            total: job.remaining(),
            ..RenderReport::default()
        };

        metrics.record_pass_started();
        info!(
            "Render pass {} started: {} elements",
            generation, report.total
        );

        while !job.is_empty() {
            clock.next_frame().await;

            let latest = self.current_generation();
            if latest != generation {
                warn!(
                    "Render pass {} superseded by pass {} after {} batches",
                    generation, latest, report.batches
                );
                report.aborted = true;
                metrics.record_pass_aborted();
                return report;
            }

            let chunk_size = store
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .chunk_size()
                .get();

            let batch = job.take(chunk_size);
            for trigger in batch {
                match trigger.fire(store, document) {
                    Ok(TriggerOutcome::Translated) => {
                        report.translated += 1;
                        metrics.record_translated();
                    }
                    Ok(TriggerOutcome::Fallback) => {
                        report.fallbacks += 1;
                        metrics.record_fallback();
                    }
                    Err(e) => {
                        warn!(
                            "Render pass {}: element {} ({}) failed: {}",
                            generation,
                            trigger.element(),
                            trigger.key(),
                            e
                        );
                        report.failures += 1;
                        metrics.record_failure();
                    }
                }
            }

            report.batches += 1;
            metrics.record_batch();
            debug!(
                "Render pass {}: batch {} done, {} remaining",
                generation,
                report.batches,
                job.remaining()
            );
        }

        metrics.record_pass_completed();
        info!(
            "Render pass {} completed in {} batches ({} translated, {} fallbacks, {} failures)",
            generation, report.batches, report.translated, report.fallbacks, report.failures
        );
        report
    }
}
