//! # Error Types
//!
//! Errors raised while parsing and classifying network documents.

use thiserror::Error;

use crate::document::DocumentKind;

/// Errors that can occur while turning raw input into a [`crate::Document`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input is not valid JSON.
    #[error("Document is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    /// The document was classified but does not have the expected shape.
    #[error("Malformed {kind} document: {reason}")]
    Malformed {
        /// Classification that matched.
        kind: DocumentKind,
        /// Deserializer message.
        reason: String,
    },

    /// An endpoint descriptor could not be parsed.
    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),
}
