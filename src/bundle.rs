//! Translation bundles and the flattener that turns them into plain key/string maps.
//!
//! Bundles come from the translation pipeline as JSON objects keyed by message
//! id. A literal `.` inside an id cannot be transported as-is, so it arrives as
//! [`DOT_PLACEHOLDER`]:
//!
//! ```json
//! { "orders_dot_title": { "context": "page header", "string": "Bestellungen" } }
//! ```
//!
//! flattens to `{ "orders.title": "Bestellungen" }`.

use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Token standing in for a literal dot inside an encoded message key.
pub const DOT_PLACEHOLDER: &str = "_dot_";

/// One translatable string plus optional disambiguation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub string: String,
}

impl StructuredMessage {
    pub fn new(string: impl Into<String>) -> Self {
        Self {
            context: None,
            string: string.into(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Encoded message key -> structured message, for one locale.
pub type TranslationBundle = HashMap<String, StructuredMessage>;

/// Decoded message key -> translation string.
pub type FlattenedMessages = HashMap<String, String>;

/// Errors produced while obtaining a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("No bundle loader registered for locale '{0}'")]
    NoLoader(Locale),

    #[error("Failed to read bundle {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bundle request for '{url}' failed with status {status}")]
    Http { url: String, status: u16 },

    #[error("Bundle request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid bundle JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BundleError {
    /// Whether retrying the fetch could succeed.
    ///
    /// Server errors, rate limiting and transport failures are retryable.
    /// Missing loaders, client errors, unreadable files and bad JSON are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BundleError::Http { status, .. } => *status >= 500 || *status == 429,
            BundleError::Request(_) => true,
            BundleError::NoLoader(_) | BundleError::Io { .. } | BundleError::Parse(_) => false,
        }
    }
}

/// Parse a bundle from its JSON payload.
pub fn parse_bundle(bytes: &[u8]) -> Result<TranslationBundle, BundleError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Replace every [`DOT_PLACEHOLDER`] in an encoded key with a literal dot.
pub fn decode_key(key: &str) -> String {
    key.replace(DOT_PLACEHOLDER, ".")
}

/// Flatten a bundle into decoded key -> string pairs.
///
/// An absent bundle means "base language, no overrides" and flattens to `None`.
/// The `context` of each message is dropped.
pub fn flatten(bundle: Option<&TranslationBundle>) -> Option<FlattenedMessages> {
    let bundle = bundle?;

    Some(
        bundle
            .iter()
            .map(|(key, message)| (decode_key(key), message.string.clone()))
            .collect(),
    )
}
