use crate::error::{Result, ScompError};
use crate::llm::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro-latest";
const MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ScompError::MissingApiKey);
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sends one prompt and returns the model's text response. Asks for a
    /// JSON response at temperature 0, optionally constrained by a response
    /// schema. Transient API errors (429/5xx) are retried with backoff.
    pub async fn generate_content(
        &self,
        prompt: &str,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
                response_schema,
            },
        };

        let mut attempt = 0;
        let body: GenerateContentResponse = loop {
            attempt += 1;
            let res = self.client.post(&url).json(&payload).send().await?;
            let status = res.status();

            if status.is_success() {
                break res.json().await?;
            }

            let retryable = status.as_u16() == 429 || status.is_server_error();
            if retryable && attempt < MAX_ATTEMPTS {
                log::debug!(
                    "Gemini devolvió {}, reintento {}/{}",
                    status,
                    attempt,
                    MAX_ATTEMPTS
                );
                sleep(Duration::from_secs(2u64.pow(attempt))).await;
                continue;
            }

            let err_text = res.text().await?;
            return Err(ScompError::ExtractionFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        };

        let text = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|Part { text }| text)
            .ok_or_else(|| {
                ScompError::ExtractionFailed("La respuesta no contiene texto".to_string())
            })?;

        Ok(text)
    }
}
