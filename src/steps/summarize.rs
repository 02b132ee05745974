//! `nl_summary` — the one step with an external side effect.
//!
//! Builds a prompt from the trend report plus the branch outcome and the
//! health guidance for the classified band, forwards it to the configured
//! [`LanguageModel`], and stores the returned text. The call is bounded by
//! the client timeout and retried at most [`ModelConfig::max_attempts`] times
//! with a short backoff; exhaustion surfaces as
//! [`StepError::ModelUnavailable`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::LanguageModel;
use crate::state::{AirQualityClass, Approval, PipelineState};
use crate::types::StepKind;

use super::{Step, StepContext, StepError, StepUpdate};

/// Pause between model-call attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct NlSummary {
    model: Arc<dyn LanguageModel>,
    max_attempts: u32,
}

impl NlSummary {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, max_attempts: u32) -> Self {
        Self {
            model,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Health recommendation per air-quality class, folded into the prompt.
fn health_guidelines(class: AirQualityClass) -> &'static str {
    match class {
        AirQualityClass::Good => "Air quality is satisfactory. Enjoy outdoor activities.",
        AirQualityClass::Moderate => {
            "Sensitive individuals should consider reducing prolonged outdoor exertion."
        }
        AirQualityClass::Unhealthy => "Everyone should limit prolonged outdoor exertion.",
        AirQualityClass::Hazardous => {
            "Health warning of emergency conditions. The entire population is more likely to be affected."
        }
    }
}

fn build_prompt(state: &PipelineState) -> Result<String, StepError> {
    let trend = state.trend_summary.as_ref().ok_or(StepError::MissingInput {
        what: "trend summary",
    })?;

    let mut prompt = format!(
        "Analyze the following air quality report:\n\
         - Average PM2.5: {:.2} µg/m³\n\
         - Max PM2.5: {:.2} µg/m³\n\
         - Average PM10: {:.2} µg/m³\n\
         - Trend over the period: {}\n",
        trend.mean_pm25, trend.max_pm25, trend.mean_pm10, trend.direction,
    );

    match (&state.alert, &state.classification) {
        (Some(alert), None) => {
            let status = match alert.approved {
                Approval::Approved => "TRIGGERED (confirmed by operator)",
                Approval::Rejected => "raised but NOT confirmed by operator review",
                Approval::Pending => {
                    return Err(StepError::Invalid(
                        "nl summary reached with an undecided alert".into(),
                    ));
                }
            };
            prompt.push_str(&format!(
                "- Alert Status: {status}\n- Alert Reason: {}\n",
                alert.reason
            ));
            if alert.approved == Approval::Rejected {
                prompt.push_str(
                    "The alert was reviewed and rejected; make clear it was not confirmed.\n",
                );
            }
        }
        (None, Some(class)) => {
            prompt.push_str(&format!(
                "- Classification: {class}\n- Health Guidelines: {}\n",
                health_guidelines(*class)
            ));
        }
        _ => {
            return Err(StepError::MissingInput {
                what: "branch outcome (alert or classification)",
            });
        }
    }

    prompt.push_str(
        "\nProvide a short professional summary for a monitoring dashboard, \
         including health recommendations where relevant.",
    );
    Ok(prompt)
}

#[async_trait]
impl Step for NlSummary {
    fn kind(&self) -> StepKind {
        StepKind::Summarize
    }

    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError> {
        let prompt = build_prompt(state)?;

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            ctx.emit(self.kind(), format!("model call attempt {attempt}"));
            match self.model.complete(&prompt).await {
                Ok(text) => {
                    tracing::info!(attempt, chars = text.len(), "model summary produced");
                    return Ok(StepUpdate::new().with_nl_summary(text));
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "model call failed");
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
            }
        }

        Err(StepError::ModelUnavailable {
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Alert, TrendDirection, TrendReport};

    fn trended_state() -> PipelineState {
        let mut state = PipelineState::new(vec![], 3);
        state.trend_summary = Some(TrendReport {
            mean_pm25: 18.2,
            min_pm25: 5.0,
            max_pm25: 42.0,
            mean_pm10: 40.0,
            direction: TrendDirection::Rising,
            text: String::new(),
        });
        state
    }

    #[test]
    fn classification_prompt_carries_guidelines() {
        let mut state = trended_state();
        state.classification = Some(AirQualityClass::Moderate);
        let prompt = build_prompt(&state).unwrap();
        assert!(prompt.contains("Classification: Moderate"));
        assert!(prompt.contains("Sensitive individuals"));
    }

    #[test]
    fn rejected_alert_prompt_flags_unconfirmed() {
        let mut state = trended_state();
        state.alert = Some(Alert {
            triggered: true,
            reason: "5 readings above cutoffs".into(),
            approved: Approval::Rejected,
        });
        let prompt = build_prompt(&state).unwrap();
        assert!(prompt.contains("NOT confirmed"));
    }

    #[test]
    fn pending_alert_is_rejected() {
        let mut state = trended_state();
        state.alert = Some(Alert {
            triggered: true,
            reason: "pending".into(),
            approved: Approval::Pending,
        });
        assert!(build_prompt(&state).is_err());
    }

    #[test]
    fn missing_trend_is_missing_input() {
        let state = PipelineState::new(vec![], 3);
        assert!(matches!(
            build_prompt(&state),
            Err(StepError::MissingInput { what: "trend summary" })
        ));
    }
}
