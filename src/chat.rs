//! Chat transcript management
//!
//! The panel owns the visible transcript and a provider session. Provider
//! failures never reach the transcript as raw errors: the panel appends a
//! friendly placeholder reply instead and the conversation carries on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::ChatError;
use crate::provider::{ChatProvider, ChatSession};

/// Reply shown when the provider fails
pub const PLACEHOLDER_REPLY: &str =
    "Oops! I'm having a little trouble thinking right now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

struct ChatState {
    session: ChatSession,
    transcript: Vec<ChatMessage>,
}

/// One chat session plus its transcript. Sends are single-flight.
pub struct ChatPanel {
    provider: Arc<dyn ChatProvider>,
    state: Mutex<ChatState>,
}

impl ChatPanel {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        let session = provider.start_session();
        Self {
            provider,
            state: Mutex::new(ChatState {
                session,
                transcript: Vec::new(),
            }),
        }
    }

    /// Send a user message and append the reply.
    ///
    /// Returns `Ok(None)` for blank input, the appended model message
    /// otherwise, and [`ChatError::Busy`] while another send is outstanding.
    pub async fn send(&self, text: &str) -> Result<Option<ChatMessage>, ChatError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let mut state = self.state.try_lock().map_err(|_| ChatError::Busy)?;
        state.transcript.push(ChatMessage::user(text));

        let ChatState {
            session,
            transcript,
        } = &mut *state;

        let reply = match self.provider.send(session, text).await {
            Ok(reply) => ChatMessage::model(reply),
            Err(e) => {
                warn!("Error sending message: {}", e);
                ChatMessage::model(PLACEHOLDER_REPLY)
            }
        };

        transcript.push(reply.clone());
        Ok(Some(reply))
    }

    /// Start over with a new provider session and an empty transcript
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.session = self.provider.start_session();
        state.transcript.clear();
        info!("Chat session reinitialized");
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.state.lock().await.transcript.clone()
    }
}
