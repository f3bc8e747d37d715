use crate::document::DEFAULT_MARKER_ATTRIBUTE;
use crate::frame::DEFAULT_FRAME_INTERVAL;
use crate::i18n::{ChunkSize, DEFAULT_CHUNK_SIZE};
use anyhow::{Context, Result};
use std::time::Duration;

/// Fallback language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Explicitly selected language; inferred from the document when unset
    pub language: Option<String>,

    /// Fallback language, must exist in the translation table
    pub default_language: String,

    /// Triggers processed per batch
    pub chunk_size: usize,

    /// Attribute that marks translatable elements
    pub marker_attribute: String,

    /// Wait between batches for the interval frame clock
    pub frame_interval: Duration,
}

impl TranslatorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            language: std::env::var("TRANSLATOR_LANGUAGE")
                .ok()
                .filter(|v| !v.is_empty()),
            default_language: std::env::var("TRANSLATOR_DEFAULT_LANGUAGE")
                .unwrap_or(defaults.default_language),

            chunk_size: match std::env::var("TRANSLATOR_CHUNK_SIZE") {
                Ok(v) => v
                    .parse::<ChunkSize>()
                    .context("TRANSLATOR_CHUNK_SIZE must be a positive integer")?
                    .get(),
                Err(_) => defaults.chunk_size,
            },

            marker_attribute: std::env::var("TRANSLATOR_MARKER_ATTRIBUTE")
                .unwrap_or(defaults.marker_attribute),

            frame_interval: match std::env::var("TRANSLATOR_FRAME_INTERVAL_MS") {
                Ok(v) => Duration::from_millis(
                    v.trim()
                        .parse()
                        .context("TRANSLATOR_FRAME_INTERVAL_MS must be a number of milliseconds")?,
                ),
                Err(_) => defaults.frame_interval,
            },
        })
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_marker_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.marker_attribute = attribute.into();
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            language: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}
