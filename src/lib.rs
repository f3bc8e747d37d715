//! Incremental page localization.
//!
//! A [`Translator`] holds a table of per-language text and rewrites every
//! element marked with a translation-id attribute to match the selected
//! language. Rewrites happen in bounded batches, one per frame, so a large
//! page never blocks rendering for long.
//!
//! The rendering environment is injected: a [`DocumentAdapter`] gives access
//! to marked elements and a [`FrameClock`] supplies paint opportunities.

pub mod config;
pub mod document;
pub mod error;
pub mod frame;
pub mod i18n;
pub mod scheduler;
pub mod translator;

pub use config::TranslatorConfig;
pub use document::{DocumentAdapter, ElementId, MarkedElement, MemoryDocument};
pub use error::{DocumentError, Result, TranslatorError};
pub use frame::{FrameClock, IntervalFrameClock, YieldFrameClock};
pub use i18n::{ChunkSize, LanguageBundle, TranslationTable, TranslationValue};
pub use scheduler::{RenderReport, RenderScheduler, TranslationTrigger};
pub use translator::{RenderTask, Translator};
