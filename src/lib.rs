//! Coloring book generation and chat on top of Google's generative APIs.

pub mod book;
pub mod chat;
pub mod config;
pub mod error;
pub mod gemini;
pub mod history;
pub mod orchestrator;
pub mod pdf;
pub mod prompts;
pub mod provider;
pub mod storage;
pub mod studio;
pub mod theme;

#[cfg(test)]
mod test_support;

pub use book::{GenerationRequest, GenerationResult};
pub use chat::{ChatMessage, ChatPanel, Role};
pub use config::Config;
pub use error::{ChatError, GenerateError, GenerationError, PersistenceError, ValidationError};
pub use history::{Creation, HistoryStore};
pub use orchestrator::{Orchestrator, Pacer, TokioPacer};
pub use provider::{ChatProvider, ChatSession, ImageGenerator};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use studio::{SavedBook, Studio, StudioError};
pub use theme::ThemePreference;
