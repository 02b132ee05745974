//! Language-model service client.
//!
//! The pipeline's only external side effect is the natural-language summary.
//! The contract is deliberately narrow — a prompt in, text out — so the model
//! identity, hosting, and transport stay external concerns:
//!
//! ```rust,no_run
//! use aerosense::llm::{LanguageModel, OllamaClient};
//! use aerosense::config::ModelConfig;
//!
//! # async fn example() -> Result<(), aerosense::llm::ModelError> {
//! let client = OllamaClient::new(ModelConfig::default())?;
//! let text = client.complete("Summarize: PM2.5 mean 18.2 µg/m³ ...").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Tests substitute a stub implementation; see `tests/common`.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

mod ollama;

pub use ollama::OllamaClient;

/// Narrow completion contract consumed by the `nl_summary` step.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt into free text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Failures of the model service or its transport.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    /// Transport-level failure (connect, DNS, TLS, ...).
    #[error("request to model service failed: {0}")]
    #[diagnostic(
        code(aerosense::llm::http),
        help("Is the model service running at the configured base URL?")
    )]
    Http(#[from] reqwest::Error),

    /// The per-attempt timeout elapsed.
    #[error("model call timed out after {seconds}s")]
    #[diagnostic(
        code(aerosense::llm::timeout),
        help("Raise AEROSENSE_MODEL_TIMEOUT_SECS or pick a smaller model.")
    )]
    Timeout { seconds: u64 },

    /// The service answered with a non-success status.
    #[error("model service returned {status}: {body}")]
    #[diagnostic(code(aerosense::llm::status))]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("could not decode model response: {0}")]
    #[diagnostic(code(aerosense::llm::decode))]
    Decode(String),

    /// Client construction failed (TLS backend, invalid config).
    #[error("could not build model client: {0}")]
    #[diagnostic(code(aerosense::llm::build))]
    Build(String),
}
