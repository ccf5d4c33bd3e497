//! Error types shared across the generator, chat and storage layers.

use thiserror::Error;

/// Bad user input, caught before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide a theme.")]
    EmptyTheme,

    #[error("Please provide a name.")]
    EmptyName,

    #[error("Page count must be between {min} and {max}, got {actual}.")]
    PageCountOutOfRange { actual: u32, min: u32, max: u32 },
}

/// An image provider call failed or came back without an image.
///
/// Carries the prompt that failed so the caller can report which step broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub prompt: String,
    pub message: String,
}

impl GenerationError {
    pub fn new(prompt: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            message: message.into(),
        }
    }
}

/// Everything that can stop a coloring book run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Chat provider failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Chat request failed: {0}")]
    Request(String),

    #[error("Chat API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Chat response contained no text")]
    EmptyResponse,

    #[error("A message is already being sent")]
    Busy,
}

/// Local storage failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
