//! Imagen client for coloring page generation.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{build_http_client, extract_error_message, truncate, GEMINI_ENDPOINT};
use crate::error::GenerationError;
use crate::provider::ImageGenerator;

const OUTPUT_MIME_TYPE: &str = "image/jpeg";

pub struct ImagenClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

// -- Response types --

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    #[allow(dead_code)]
    mime_type: Option<String>,
    rai_filtered_reason: Option<String>,
}

impl ImagenClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(api_key, timeout)?,
            endpoint: GEMINI_ENDPOINT.to_string(),
            model: model.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One image per call, JPEG output
    pub fn build_request_body(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "outputOptions": { "mimeType": OUTPUT_MIME_TYPE }
            }
        })
    }

    pub fn extract_image_base64(response: &PredictResponse) -> Option<String> {
        response
            .predictions
            .iter()
            .find_map(|p| p.bytes_base64_encoded.as_ref())
            .filter(|data| !data.is_empty())
            .cloned()
    }

    /// Map a raw provider failure to the user-facing error
    pub fn failure(prompt: &str, raw: &str) -> GenerationError {
        error!("Error generating image: {}", truncate(raw));
        let message = match extract_error_message(raw) {
            Some(detail) => format!("Failed to generate image: {}", detail),
            None => format!("Failed to generate image for prompt: \"{}\"", prompt),
        };
        GenerationError::new(prompt, message)
    }

    async fn request(&self, prompt: &str) -> Result<String, String> {
        let url = format!("{}/{}:predict", self.endpoint, self.model);
        let body = Self::build_request_body(prompt);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Imagen request failed: {}", e))?;

        let status = response.status();
        debug!("Imagen response status: {}", status);
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(format!("Imagen API error {}: {}", status, error_body));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Imagen response: {}", e))?;

        if let Some(reason) = parsed.predictions.iter().find_map(|p| p.rai_filtered_reason.as_ref()) {
            debug!("Imagen filtered the prompt: {}", reason);
        }

        Self::extract_image_base64(&parsed).ok_or_else(|| "No image was generated.".to_string())
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        info!("Imagen generation: model={} prompt={} chars", self.model, prompt.len());

        let image = self.request(prompt).await.map_err(|raw| Self::failure(prompt, &raw))?;

        info!("Imagen image generated: {} bytes base64", image.len());
        Ok(image)
    }
}
