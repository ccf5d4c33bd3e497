//! Capability traits for the external generation services.
//!
//! The orchestrator and the chat panel only see these traits, so tests can
//! swap in fakes without touching the network.

use async_trait::async_trait;

use crate::chat::ChatMessage;
use crate::error::{ChatError, GenerationError};

/// Turns a text prompt into one base64-encoded image
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Conversation state handed back to the provider on every turn.
///
/// Only completed exchanges are recorded, so a failed send leaves the
/// session as it was.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    system_instruction: String,
    turns: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            turns: Vec::new(),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Record a finished exchange
    pub fn commit(&mut self, user_text: &str, model_text: &str) {
        self.turns.push(ChatMessage::user(user_text));
        self.turns.push(ChatMessage::model(model_text));
    }
}

/// A conversational model
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a fresh conversation
    fn start_session(&self) -> ChatSession;

    /// Send one utterance and return the model's reply
    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, ChatError>;
}
