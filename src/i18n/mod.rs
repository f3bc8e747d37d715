//! Translation data and state.
//!
//! # Architecture
//!
//! - `table`: per-language bundles of literal or produced text
//! - `store`: validated language selection, default language and chunk size
//! - `metrics`: render counters and reports
//!
//! # Example
//!
//! ```rust
//! use simple_translator::i18n::{ChunkSize, LanguageBundle, TranslationStore, TranslationTable};
//!
//! let table = TranslationTable::new()
//!     .with_language("en", LanguageBundle::new().with("A", "hi"))
//!     .with_language("de", LanguageBundle::new().with("A", "hallo"));
//!
//! let mut store = TranslationStore::new(table, "en", ChunkSize::default()).unwrap();
//! store.set_language(Some("de")).unwrap();
//! assert_eq!(store.resolve("A", None).unwrap().as_deref(), Some("hallo"));
//! ```

mod metrics;
mod store;
mod table;

pub use metrics::{MetricsReport, RenderMetrics};
pub use store::{ChunkSize, TranslationStore, DEFAULT_CHUNK_SIZE};
pub use table::{LanguageBundle, Producer, TranslationTable, TranslationValue};
