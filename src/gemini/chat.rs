//! Gemini conversational client.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{build_http_client, extract_error_message, truncate, GEMINI_ENDPOINT};
use crate::chat::{ChatMessage, Role};
use crate::error::ChatError;
use crate::provider::{ChatProvider, ChatSession};

pub const SYSTEM_INSTRUCTION: &str =
    "You are a friendly and helpful chat bot for a creative app. Keep your answers concise and cheerful.";

pub struct GeminiChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

// -- Request types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

// -- Response types --

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiChatClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(api_key, timeout)?,
            endpoint: GEMINI_ENDPOINT.to_string(),
            model: model.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Body for one turn: prior exchanges plus the new user message
    pub fn build_request_body(session: &ChatSession, text: &str) -> serde_json::Value {
        let mut contents: Vec<Content<'_>> = session
            .turns()
            .iter()
            .map(|m: &ChatMessage| Content {
                role: Some(m.role),
                parts: vec![TextPart { text: &m.text }],
            })
            .collect();
        contents.push(Content {
            role: Some(Role::User),
            parts: vec![TextPart { text }],
        });

        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![TextPart {
                    text: session.system_instruction(),
                }],
            },
            contents,
        };
        serde_json::to_value(&request).unwrap_or_default()
    }

    /// Concatenated text of the first candidate
    pub fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let parts = &response.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiChatClient {
    fn start_session(&self) -> ChatSession {
        debug!("Starting chat session with {}", self.model);
        ChatSession::new(SYSTEM_INSTRUCTION)
    }

    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, ChatError> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let body = Self::build_request_body(session, text);

        info!(
            "Chat: sending message ({} chars, {} prior turns)",
            text.len(),
            session.turns().len()
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Chat request failed: {}", e);
                ChatError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("Chat API error: {} - {}", status, truncate(&error_body));
            let body = extract_error_message(&error_body)
                .unwrap_or_else(|| truncate(&error_body).to_string());
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Request(format!("Failed to parse response: {}", e)))?;

        let reply = Self::extract_text(&parsed).ok_or(ChatError::EmptyResponse)?;
        session.commit(text, &reply);

        info!("Chat: received {} char response", reply.len());
        Ok(reply)
    }
}
