#![allow(dead_code)]

//! Shared fixtures for integration tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use aerosense::config::PipelineConfig;
use aerosense::llm::{LanguageModel, ModelError};
use aerosense::pipeline::Pipeline;
use aerosense::reading::RawReading;

/// Model that always answers with a canned summary.
pub struct StubModel {
    pub reply: String,
}

impl Default for StubModel {
    fn default() -> Self {
        Self {
            reply: "Air quality is within expected ranges.".to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Ok(self.reply.clone())
    }
}

/// Model that records the prompt it was given, then answers.
#[derive(Default)]
pub struct EchoModel {
    pub prompts: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("ok".to_string())
    }
}

/// Model that always fails with a service error.
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Status {
            status: 503,
            body: "model warming up".to_string(),
        })
    }
}

/// Model that fails the first `fail_first` calls, then succeeds.
pub struct FlakyModel {
    pub fail_first: u32,
    pub calls: AtomicU32,
}

impl FlakyModel {
    pub fn new(fail_first: u32) -> Self {
        Self {
            fail_first,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl LanguageModel for FlakyModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            Err(ModelError::Status {
                status: 500,
                body: "transient".to_string(),
            })
        } else {
            Ok("recovered".to_string())
        }
    }
}

/// A candidate with an hourly timestamp derived from `hour`.
pub fn raw_at(hour: u32, pm25: f64, pm10: f64) -> RawReading {
    RawReading::new(format!("2026-08-01T{hour:02}:00:00Z"), pm25, pm10)
}

/// Hourly series from `(pm25, pm10)` pairs.
pub fn series(values: &[(f64, f64)]) -> Vec<RawReading> {
    values
        .iter()
        .enumerate()
        .map(|(i, (pm25, pm10))| raw_at(i as u32, *pm25, *pm10))
        .collect()
}

/// Default-config pipeline over the given model.
pub fn pipeline_with(model: Arc<dyn LanguageModel>) -> Pipeline {
    Pipeline::new(PipelineConfig::default(), model)
}

/// Default-config pipeline over a [`StubModel`].
pub fn stub_pipeline() -> Pipeline {
    pipeline_with(Arc::new(StubModel::default()))
}
