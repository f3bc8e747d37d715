//! Translation table: per-language bundles of literal or lazily produced text.
//!
//! A table maps a language code to a [`LanguageBundle`], and a bundle maps a
//! translation key to a [`TranslationValue`]. Values are either literal
//! strings or zero-argument producers evaluated on every read, which allows
//! dynamic content such as a live clock.

use crate::error::{Result, TranslatorError};
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A zero-argument string producer, shared between clones of a table.
#[derive(Clone)]
pub struct Producer(Arc<dyn Fn() -> String + Send + Sync>);

impl Producer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the producer. Never cached.
    pub fn produce(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Producer(..)")
    }
}

/// A single bundle entry.
#[derive(Debug, Clone)]
pub enum TranslationValue {
    /// Text returned as-is.
    Literal(String),
    /// Text computed each time the entry is read.
    Producer(Producer),
}

impl TranslationValue {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Producer(Producer::new(f))
    }

    /// Get the displayable text for this entry.
    pub fn render(&self) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Producer(producer) => producer.produce(),
        }
    }
}

impl From<&str> for TranslationValue {
    fn from(text: &str) -> Self {
        Self::Literal(text.to_string())
    }
}

impl From<String> for TranslationValue {
    fn from(text: String) -> Self {
        Self::Literal(text)
    }
}

/// All entries for one language.
#[derive(Debug, Clone, Default)]
pub struct LanguageBundle {
    entries: HashMap<String, TranslationValue>,
}

impl LanguageBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TranslationValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of a producer entry.
    pub fn with_producer<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.insert(key, TranslationValue::producer(f));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TranslationValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&TranslationValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LanguageBundle
where
    K: Into<String>,
    V: Into<TranslationValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// On-disk shape of a table: language code to key to literal text.
type RawTable = BTreeMap<String, HashMap<String, String>>;

fn json_error(e: serde_json::Error) -> TranslatorError {
    if e.is_data() {
        TranslatorError::InvalidTable(format!(
            "expected a map of languages to string entries: {}",
            e
        ))
    } else {
        TranslatorError::InvalidTable(format!("malformed JSON: {}", e))
    }
}

/// Mapping from language code to bundle.
///
/// A table is only accepted by the store once [`TranslationTable::validate`]
/// passes: it must be non-empty and every bundle must be non-empty.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    languages: BTreeMap<String, LanguageBundle>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a language bundle.
    pub fn with_language(mut self, code: impl Into<String>, bundle: LanguageBundle) -> Self {
        self.insert(code, bundle);
        self
    }

    pub fn insert(&mut self, code: impl Into<String>, bundle: LanguageBundle) {
        self.languages.insert(code.into(), bundle);
    }

    pub fn bundle(&self, code: &str) -> Option<&LanguageBundle> {
        self.languages.get(code)
    }

    pub fn contains_language(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    /// Language codes in sorted order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Check the table is non-empty and that no bundle is empty.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(TranslatorError::InvalidTable(
                "table has no languages".to_string(),
            ));
        }

        if let Some((code, _)) = self.languages.iter().find(|(_, bundle)| bundle.is_empty()) {
            return Err(TranslatorError::InvalidTable(format!(
                "language '{}' has no entries",
                code
            )));
        }

        Ok(())
    }

    /// Build a literal-only table from a JSON value shaped like
    /// `{"en": {"KEY": "text"}, "de": {...}}`.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let raw = RawTable::deserialize(value).map_err(json_error)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawTable = serde_json::from_str(json).map_err(json_error)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawTable) -> Result<Self> {
        let table = Self {
            languages: raw
                .into_iter()
                .map(|(code, entries)| (code, entries.into_iter().collect()))
                .collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Load a literal-only table from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read translations file {}", path.display()))?;
        let table = Self::from_json_str(&json)
            .with_context(|| format!("Failed to load translations from {}", path.display()))?;
        Ok(table)
    }
}
