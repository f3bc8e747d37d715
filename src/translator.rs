//! The translator facade.
//!
//! [`Translator`] ties the translation store to the render scheduler and to
//! the injected document and frame clock. It is cheap to clone; clones share
//! the same state.
//!
//! Changing the language always starts a new render pass on the Tokio
//! runtime. Outside a runtime those calls fail with
//! [`TranslatorError::RuntimeUnavailable`] and change nothing.

use crate::config::TranslatorConfig;
use crate::document::DocumentAdapter;
use crate::error::{DocumentError, Result, TranslatorError};
use crate::frame::FrameClock;
use crate::i18n::{ChunkSize, MetricsReport, RenderMetrics, TranslationStore, TranslationTable};
use crate::scheduler::{RenderReport, RenderScheduler};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

struct Inner {
    store: RwLock<TranslationStore>,
    scheduler: RenderScheduler,
    document: Arc<dyn DocumentAdapter>,
    clock: Arc<dyn FrameClock>,
    metrics: RenderMetrics,
    ready: AtomicBool,
}

/// Handle to a spawned render pass. Await it for the pass report.
#[derive(Debug)]
pub struct RenderTask {
    handle: JoinHandle<RenderReport>,
}

impl Future for RenderTask {
    type Output = std::result::Result<RenderReport, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx)
    }
}

#[derive(Clone)]
pub struct Translator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("store", &self.inner.store)
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

impl Translator {
    /// Build a translator.
    ///
    /// Validates chunk size, table, default language and language, in that
    /// order. Nothing is rendered until the language changes or
    /// [`Translator::on_document_ready`] is called.
    pub fn new(
        config: &TranslatorConfig,
        translations: TranslationTable,
        document: Arc<dyn DocumentAdapter>,
        clock: Arc<dyn FrameClock>,
    ) -> Result<Self> {
        let chunk_size = ChunkSize::new(config.chunk_size)?;
        let mut store = TranslationStore::new(translations, &config.default_language, chunk_size)?;
        store.set_language(config.language.as_deref())?;

        debug!(
            "Translator created (default '{}', chunk size {})",
            store.default_language(),
            chunk_size.get()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                store: RwLock::new(store),
                scheduler: RenderScheduler::new(config.marker_attribute.clone()),
                document,
                clock,
                metrics: RenderMetrics::new(),
                ready: AtomicBool::new(false),
            }),
        })
    }

    fn store(&self) -> RwLockReadGuard<'_, TranslationStore> {
        self.inner.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_mut(&self) -> RwLockWriteGuard<'_, TranslationStore> {
        self.inner.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the installed table.
    pub fn translations(&self) -> TranslationTable {
        self.store().translations().clone()
    }

    pub fn set_translations(&self, translations: TranslationTable) -> Result<()> {
        self.store_mut().set_translations(translations)
    }

    pub fn default_language(&self) -> String {
        self.store().default_language().to_string()
    }

    pub fn set_default_language(&self, code: &str) -> Result<()> {
        self.store_mut().set_default_language(code)
    }

    /// Effective language: selected, else default.
    pub fn language(&self) -> String {
        self.store().language().to_string()
    }

    pub fn selected_language(&self) -> Option<String> {
        self.store().selected_language().map(str::to_string)
    }

    /// Select a language (or clear the selection) and start a render pass.
    ///
    /// The pass starts even when the language did not change.
    pub fn set_language(&self, code: Option<&str>) -> Result<RenderTask> {
        let runtime = runtime_handle()?;
        self.store_mut().set_language(code)?;
        info!("Language set to '{}'", self.language());
        Ok(self.spawn_on(&runtime))
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.store().chunk_size()
    }

    pub fn set_chunk_size<T>(&self, size: T) -> Result<()>
    where
        T: TryInto<ChunkSize>,
        TranslatorError: From<T::Error>,
    {
        self.store_mut().set_chunk_size(size)
    }

    /// Resolve one key in `language` (or the effective language).
    pub fn resolve(&self, key: &str, language: Option<&str>) -> Result<Option<String>> {
        let value = self.store().lookup(key, language)?;
        Ok(value.map(|value| value.render()))
    }

    /// Rebuild the trigger list from the document. Returns the element count.
    pub fn rescan(&self) -> usize {
        self.inner.scheduler.rescan(self.inner.document.as_ref())
    }

    /// Run a render pass on the current task.
    pub async fn render(&self) -> RenderReport {
        let inner = &self.inner;
        inner
            .scheduler
            .render(
                &inner.store,
                inner.document.as_ref(),
                inner.clock.as_ref(),
                &inner.metrics,
            )
            .await
    }

    /// Run a render pass on its own Tokio task.
    ///
    /// The pass claims its generation before the task is spawned, so a later
    /// call always supersedes this one regardless of task scheduling order.
    pub fn spawn_render(&self) -> Result<RenderTask> {
        let runtime = runtime_handle()?;
        Ok(self.spawn_on(&runtime))
    }

    fn spawn_on(&self, runtime: &Handle) -> RenderTask {
        let generation = self.inner.scheduler.begin_pass();
        let translator = self.clone();
        let handle = runtime.spawn(async move {
            let inner = &translator.inner;
            inner
                .scheduler
                .render_pass(
                    generation,
                    &inner.store,
                    inner.document.as_ref(),
                    inner.clock.as_ref(),
                    &inner.metrics,
                )
                .await
        });
        RenderTask { handle }
    }

    /// Handle the environment's one-time "document ready" signal.
    ///
    /// Without a selected language, the language is inferred from the root
    /// element's `lang` attribute, falling back to the default language.
    /// Either way a render pass is started. Later calls return `Ok(None)`.
    pub fn on_document_ready(&self) -> Result<Option<RenderTask>> {
        if self.inner.ready.swap(true, Ordering::SeqCst) {
            debug!("Document ready already handled");
            return Ok(None);
        }

        let result = self.bootstrap();
        if result.is_err() {
            self.inner.ready.store(false, Ordering::SeqCst);
        }
        result.map(Some)
    }

    fn bootstrap(&self) -> Result<RenderTask> {
        if self.selected_language().is_some() {
            return self.spawn_render();
        }

        let root_language = self.inner.document.root_language().map_err(|e| match e {
            DocumentError::MissingRoot => {
                TranslatorError::InvalidTable("missing HTML root element".to_string())
            }
            other => TranslatorError::Document(other),
        })?;

        let language = root_language
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| self.default_language());
        info!("Inferred language '{}' from document", language);

        self.set_language(Some(&language))
    }

    pub fn metrics(&self) -> MetricsReport {
        self.inner.metrics.report()
    }

    /// Marker attribute used when scanning the document.
    pub fn marker_attribute(&self) -> &str {
        self.inner.scheduler.marker_attribute()
    }
}

fn runtime_handle() -> Result<Handle> {
    Handle::try_current().map_err(|e| TranslatorError::RuntimeUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::frame::{IntervalFrameClock, YieldFrameClock};
    use crate::i18n::LanguageBundle;
    use std::time::Duration;

    fn table() -> TranslationTable {
        TranslationTable::new()
            .with_language("en", LanguageBundle::new().with("A", "hi"))
            .with_language("de", LanguageBundle::new().with("A", "hallo"))
            .with_language("fr", LanguageBundle::new().with("A", "salut"))
    }

    fn translator(config: TranslatorConfig, document: Arc<MemoryDocument>) -> Translator {
        Translator::new(&config, table(), document, Arc::new(YieldFrameClock))
            .expect("Valid translator")
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_new_validates_in_order() {
        let document: Arc<dyn DocumentAdapter> = Arc::new(MemoryDocument::new());
        let clock: Arc<dyn FrameClock> = Arc::new(YieldFrameClock);

        let err = Translator::new(
            &TranslatorConfig::default().with_chunk_size(0).with_language("xx"),
            TranslationTable::new(),
            document.clone(),
            clock.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidChunkSize(_)));

        let err = Translator::new(
            &TranslatorConfig::default(),
            TranslationTable::new(),
            document.clone(),
            clock.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidTable(_)));

        let err = Translator::new(
            &TranslatorConfig::default().with_default_language("xx"),
            table(),
            document.clone(),
            clock.clone(),
        )
        .unwrap_err();
        assert_eq!(err, TranslatorError::UnknownLanguage("xx".to_string()));

        let err = Translator::new(
            &TranslatorConfig::default().with_language("xx"),
            table(),
            document,
            clock,
        )
        .unwrap_err();
        assert_eq!(err, TranslatorError::UnknownLanguage("xx".to_string()));
    }

    #[test]
    fn test_accessors() {
        let translator = translator(TranslatorConfig::default(), Arc::new(MemoryDocument::new()));

        assert_eq!(translator.language(), "en");
        assert_eq!(translator.selected_language(), None);
        assert_eq!(translator.default_language(), "en");
        assert_eq!(translator.chunk_size().get(), 1000);
        assert_eq!(translator.marker_attribute(), "translateId");
        assert_eq!(translator.translations().len(), 3);
    }

    // ==================== Language Tests ====================

    #[tokio::test]
    async fn test_set_language_renders() {
        let document = Arc::new(MemoryDocument::new());
        let id = document.push_marked("span", "A", "hi");
        let translator = translator(TranslatorConfig::default(), document.clone());

        let report = translator
            .set_language(Some("de"))
            .expect("de is known")
            .await
            .expect("Render task should finish");

        assert!(report.is_complete());
        assert_eq!(document.content(id).unwrap(), "hallo");
        assert_eq!(translator.resolve("A", None).unwrap().as_deref(), Some("hallo"));
    }

    #[tokio::test]
    async fn test_set_same_language_still_renders() {
        let document = Arc::new(MemoryDocument::new());
        document.push_marked("span", "A", "hi");
        let translator = translator(TranslatorConfig::default(), document.clone());

        translator.set_language(Some("en")).unwrap().await.unwrap();
        translator.set_language(Some("en")).unwrap().await.unwrap();

        assert_eq!(translator.metrics().passes_completed, 2);
        assert_eq!(document.write_count(), 2);
    }

    #[tokio::test]
    async fn test_set_unknown_language_does_not_render() {
        let document = Arc::new(MemoryDocument::new());
        document.push_marked("span", "A", "hi");
        let translator = translator(TranslatorConfig::default(), document.clone());
        translator.set_language(Some("de")).unwrap().await.unwrap();

        let err = translator.set_language(Some("es")).unwrap_err();

        assert_eq!(err, TranslatorError::UnknownLanguage("es".to_string()));
        assert_eq!(translator.language(), "de");
        assert_eq!(translator.metrics().passes_started, 1);
    }

    #[tokio::test]
    async fn test_render_on_current_task() {
        let document = Arc::new(MemoryDocument::new());
        let id = document.push_marked("span", "A", "hi");
        let translator = translator(
            TranslatorConfig::default().with_language("de"),
            document.clone(),
        );

        let report = translator.render().await;

        assert!(report.is_complete());
        assert_eq!(report.generation, 1);
        assert_eq!(document.content(id).unwrap(), "hallo");
    }

    #[tokio::test]
    async fn test_clearing_language_renders_default() {
        let document = Arc::new(MemoryDocument::new());
        let id = document.push_marked("span", "A", "hi");
        let translator = translator(
            TranslatorConfig::default().with_language("de"),
            document.clone(),
        );
        translator.set_default_language("fr").unwrap();

        translator.set_language(None).unwrap().await.unwrap();

        assert_eq!(translator.language(), "fr");
        assert_eq!(document.content(id).unwrap(), "salut");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_language_changes_only_finish_latest() {
        let document = Arc::new(MemoryDocument::new());
        for _ in 0..3 {
            document.push_marked("span", "A", "hi");
        }
        let translator = Translator::new(
            &TranslatorConfig::default().with_chunk_size(1),
            table(),
            document.clone(),
            Arc::new(IntervalFrameClock::new(Duration::from_millis(16))),
        )
        .unwrap();

        let first = translator.set_language(Some("de")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = translator.set_language(Some("fr")).unwrap();

        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert!(first.aborted);
        assert_eq!(first.batches, 1);
        assert!(second.is_complete());
        assert_eq!(second.batches, 3);
        assert!(document.contents().iter().all(|c| c == "salut"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_latest_request_wins_on_multi_thread_runtime() {
        for _ in 0..20 {
            let document = Arc::new(MemoryDocument::new());
            for _ in 0..3 {
                document.push_marked("span", "A", "hi");
            }
            let translator = translator(
                TranslatorConfig::default().with_chunk_size(1),
                document.clone(),
            );

            // Both passes are requested from inside a worker, where the most
            // recently spawned task tends to be polled first.
            let (first, second) = tokio::spawn(async move {
                let first = translator.set_language(Some("de")).unwrap();
                let second = translator.set_language(Some("fr")).unwrap();
                (first.await.unwrap(), second.await.unwrap())
            })
            .await
            .unwrap();

            assert!(first.aborted);
            assert_eq!(first.batches, 0);
            assert!(second.is_complete());
            assert_eq!(second.generation, first.generation + 1);
            assert!(document.contents().iter().all(|c| c == "salut"));
        }
    }

    #[test]
    fn test_render_requests_without_runtime_fail_cleanly() {
        let translator = translator(TranslatorConfig::default(), Arc::new(MemoryDocument::new()));

        let err = translator.set_language(Some("de")).unwrap_err();
        assert!(matches!(err, TranslatorError::RuntimeUnavailable(_)));
        assert_eq!(translator.selected_language(), None);

        assert!(matches!(
            translator.spawn_render(),
            Err(TranslatorError::RuntimeUnavailable(_))
        ));
        assert!(matches!(
            translator.on_document_ready(),
            Err(TranslatorError::RuntimeUnavailable(_))
        ));
        assert_eq!(translator.metrics().passes_started, 0);
    }

    // ==================== Bootstrap Tests ====================

    #[tokio::test]
    async fn test_ready_infers_root_language() {
        let document = Arc::new(MemoryDocument::new().with_root_language("de"));
        let id = document.push_marked("span", "A", "hi");
        let translator = translator(TranslatorConfig::default(), document.clone());

        let task = translator.on_document_ready().unwrap().expect("First ready renders");
        task.await.unwrap();

        assert_eq!(translator.selected_language().as_deref(), Some("de"));
        assert_eq!(document.content(id).unwrap(), "hallo");
    }

    #[tokio::test]
    async fn test_ready_without_lang_uses_default() {
        let document = Arc::new(MemoryDocument::new());
        document.push_marked("span", "A", "hi");
        let translator = translator(
            TranslatorConfig::default().with_default_language("fr"),
            document.clone(),
        );

        translator.on_document_ready().unwrap().unwrap().await.unwrap();

        assert_eq!(translator.selected_language().as_deref(), Some("fr"));
        assert_eq!(document.contents(), vec!["salut".to_string()]);
    }

    #[tokio::test]
    async fn test_ready_keeps_explicit_language() {
        let document = Arc::new(MemoryDocument::new().with_root_language("fr"));
        document.push_marked("span", "A", "hi");
        let translator = translator(
            TranslatorConfig::default().with_language("de"),
            document.clone(),
        );

        translator.on_document_ready().unwrap().unwrap().await.unwrap();

        assert_eq!(translator.language(), "de");
        assert_eq!(document.contents(), vec!["hallo".to_string()]);
    }

    #[tokio::test]
    async fn test_ready_is_one_time() {
        let document = Arc::new(MemoryDocument::new());
        let translator = translator(TranslatorConfig::default(), document);

        assert!(translator.on_document_ready().unwrap().is_some());
        assert!(translator.on_document_ready().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ready_without_root_is_invalid() {
        let document = Arc::new(MemoryDocument::without_root());
        let translator = translator(TranslatorConfig::default(), document);

        let err = translator.on_document_ready().unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidTable(_)));
    }

    #[tokio::test]
    async fn test_ready_with_unknown_root_language_fails() {
        let document = Arc::new(MemoryDocument::new().with_root_language("ja"));
        let translator = translator(TranslatorConfig::default(), document);

        let err = translator.on_document_ready().unwrap_err();
        assert_eq!(err, TranslatorError::UnknownLanguage("ja".to_string()));
        assert_eq!(translator.language(), "en");
    }
}
