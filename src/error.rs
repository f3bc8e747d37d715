//! Error taxonomy for the translator.
//!
//! All validation errors are raised synchronously by the setter that received
//! the bad input, before anything is committed.

use crate::document::ElementId;
use std::convert::Infallible;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, TranslatorError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslatorError {
    /// The translation table is missing, not a mapping, or empty
    /// (or one of its bundles is empty).
    #[error("Invalid translations table: {0}")]
    InvalidTable(String),

    /// A language code is not a key of the current table.
    #[error("Invalid translation language '{0}'")]
    UnknownLanguage(String),

    /// Chunk size is not a positive integer.
    #[error("Provided chunk size is invalid: {0}")]
    InvalidChunkSize(String),

    /// A render pass was requested outside a Tokio runtime.
    #[error("Cannot start a render pass: {0}")]
    RuntimeUnavailable(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl From<Infallible> for TranslatorError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Failures reported by a [`DocumentAdapter`](crate::document::DocumentAdapter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Element {0} is no longer attached to the document")]
    DetachedElement(ElementId),

    #[error("Missing HTML root element")]
    MissingRoot,
}
