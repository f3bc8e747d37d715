//! Translation store: validated table, language selection, and chunk size.
//!
//! Every setter validates before it commits, so a rejected call leaves the
//! previous state untouched.

use crate::error::{Result, TranslatorError};
use crate::i18n::table::{TranslationTable, TranslationValue};
use std::num::NonZeroUsize;
use std::str::FromStr;
use tracing::debug;

/// Number of triggers processed per batch unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A positive batch size for render passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    pub fn new(size: usize) -> Result<Self> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or_else(|| TranslatorError::InvalidChunkSize(size.to_string()))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = TranslatorError;

    fn try_from(size: usize) -> Result<Self> {
        Self::new(size)
    }
}

impl TryFrom<i64> for ChunkSize {
    type Error = TranslatorError;

    fn try_from(size: i64) -> Result<Self> {
        usize::try_from(size)
            .map_err(|_| TranslatorError::InvalidChunkSize(size.to_string()))
            .and_then(Self::new)
    }
}

impl TryFrom<f64> for ChunkSize {
    type Error = TranslatorError;

    fn try_from(size: f64) -> Result<Self> {
        if !size.is_finite() || size.fract() != 0.0 || size < 1.0 || size > usize::MAX as f64 {
            return Err(TranslatorError::InvalidChunkSize(size.to_string()));
        }
        Self::new(size as usize)
    }
}

impl FromStr for ChunkSize {
    type Err = TranslatorError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<usize>()
            .map_err(|_| TranslatorError::InvalidChunkSize(s.to_string()))
            .and_then(Self::new)
    }
}

impl TryFrom<&str> for ChunkSize {
    type Error = TranslatorError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// Holds the translation table and the language/chunk-size state around it.
///
/// Invariants: the default language is always a key of the table, and the
/// selected language, when set, is too.
#[derive(Debug, Clone)]
pub struct TranslationStore {
    table: TranslationTable,
    selected_language: Option<String>,
    default_language: String,
    chunk_size: ChunkSize,
}

impl TranslationStore {
    /// Create a store with no selected language.
    pub fn new(
        table: TranslationTable,
        default_language: &str,
        chunk_size: ChunkSize,
    ) -> Result<Self> {
        table.validate()?;
        if !table.contains_language(default_language) {
            return Err(TranslatorError::UnknownLanguage(default_language.to_string()));
        }

        Ok(Self {
            table,
            selected_language: None,
            default_language: default_language.to_string(),
            chunk_size,
        })
    }

    pub fn translations(&self) -> &TranslationTable {
        &self.table
    }

    /// Replace the whole table.
    ///
    /// The new table must still contain the current default language and the
    /// selected language (if any).
    pub fn set_translations(&mut self, table: TranslationTable) -> Result<()> {
        table.validate()?;
        if !table.contains_language(&self.default_language) {
            return Err(TranslatorError::UnknownLanguage(self.default_language.clone()));
        }
        if let Some(selected) = &self.selected_language {
            if !table.contains_language(selected) {
                return Err(TranslatorError::UnknownLanguage(selected.clone()));
            }
        }

        debug!("Installed translations for {} languages", table.len());
        self.table = table;
        Ok(())
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn set_default_language(&mut self, code: &str) -> Result<()> {
        self.ensure_known(code)?;
        self.default_language = code.to_string();
        Ok(())
    }

    /// The explicitly selected language, if any.
    pub fn selected_language(&self) -> Option<&str> {
        self.selected_language.as_deref()
    }

    /// Select a language, or clear the selection with `None`.
    ///
    /// An empty code is treated the same as `None`.
    pub fn set_language(&mut self, code: Option<&str>) -> Result<()> {
        let code = code.filter(|code| !code.is_empty());
        if let Some(code) = code {
            self.ensure_known(code)?;
        }
        self.selected_language = code.map(str::to_string);
        Ok(())
    }

    /// Effective language: the selected one, else the default.
    pub fn language(&self) -> &str {
        self.selected_language
            .as_deref()
            .unwrap_or(&self.default_language)
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    pub fn set_chunk_size<T>(&mut self, size: T) -> Result<()>
    where
        T: TryInto<ChunkSize>,
        TranslatorError: From<T::Error>,
    {
        self.chunk_size = size.try_into()?;
        Ok(())
    }

    /// Clone the raw entry for `key` without evaluating it.
    ///
    /// Lets callers release any lock around the store before running a
    /// producer.
    pub fn lookup(&self, key: &str, language: Option<&str>) -> Result<Option<TranslationValue>> {
        let code = language.unwrap_or_else(|| self.language());
        let bundle = self
            .table
            .bundle(code)
            .ok_or_else(|| TranslatorError::UnknownLanguage(code.to_string()))?;
        Ok(bundle.get(key).cloned())
    }

    /// Resolve `key` in `language` (or the effective language) to text.
    ///
    /// Producers are invoked on every call. A missing key yields `Ok(None)`.
    pub fn resolve(&self, key: &str, language: Option<&str>) -> Result<Option<String>> {
        Ok(self.lookup(key, language)?.map(|value| value.render()))
    }

    fn ensure_known(&self, code: &str) -> Result<()> {
        if self.table.contains_language(code) {
            Ok(())
        } else {
            Err(TranslatorError::UnknownLanguage(code.to_string()))
        }
    }
}
