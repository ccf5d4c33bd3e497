//! Google Generative Language API clients
//!
//! Thin wrappers around the Imagen `:predict` endpoint (coloring pages) and
//! the Gemini `:generateContent` endpoint (chat).

pub mod chat;
pub mod imagen;

pub use chat::GeminiChatClient;
pub use imagen::ImagenClient;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Error bodies are truncated to this many bytes before logging
const MAX_ERROR_BODY: usize = 500;

/// Shared HTTP client with the API key attached to every request
fn build_http_client(api_key: &str, timeout: Duration) -> Result<reqwest::Client> {
    if api_key.trim().is_empty() {
        anyhow::bail!("Gemini API key is required");
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut key = HeaderValue::from_str(api_key.trim()).context("Invalid API key header")?;
    key.set_sensitive(true);
    headers.insert("x-goog-api-key", key);

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(30))
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Pull `error.message` out of a provider error text that embeds a JSON body,
/// e.g. `400 Bad Request {"error": {"message": "..."}}`.
pub fn extract_error_message(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let value: serde_json::Value = serde_json::from_str(&text[start..]).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn truncate(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
