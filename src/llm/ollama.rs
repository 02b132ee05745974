//! Client for a locally hosted Ollama-style model service.
//!
//! Speaks the non-streaming `/api/generate` endpoint: request
//! `{ model, prompt, stream: false }`, response `{ response: "..." }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;

use super::{LanguageModel, ModelError};

pub struct OllamaClient {
    http: reqwest::Client,
    config: ModelConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// Build a client for the configured service.
    ///
    /// The per-attempt timeout from [`ModelConfig::timeout`] is installed on
    /// the underlying HTTP client, so a stalled service surfaces as a failure
    /// rather than a hang.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Build(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        seconds: self.config.timeout.as_secs(),
                    }
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;
        if decoded.response.is_empty() {
            return Err(ModelError::Decode("empty response field".into()));
        }

        tracing::debug!(
            model = %self.config.model,
            chars = decoded.response.len(),
            "model completion received"
        );
        Ok(decoded.response)
    }
}
