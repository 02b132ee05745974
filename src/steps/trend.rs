//! `generate_trend_summary` — descriptive statistics after the branches
//! converge.
//!
//! Computes mean/min/max PM2.5 and mean PM10 over the full cleaned series,
//! derives the direction of change (second-half mean vs first-half mean of
//! PM2.5, ±5 % band collapsing to steady), and renders a textual description
//! that reflects whichever branch outcome is populated — including an alert
//! that was reviewed and rejected.

use async_trait::async_trait;

use crate::state::{Approval, PipelineState, TrendDirection, TrendReport};
use crate::types::StepKind;

use super::{Step, StepContext, StepError, StepUpdate};

/// Relative band within which the series counts as steady.
const STEADY_BAND: f64 = 0.05;

#[derive(Clone, Copy, Debug, Default)]
pub struct TrendSummary;

/// First-half vs second-half comparison of PM2.5 means.
pub(crate) fn direction_of(values: &[f64]) -> TrendDirection {
    if values.len() < 2 {
        return TrendDirection::Steady;
    }
    let mid = values.len() / 2;
    let first: f64 = values[..mid].iter().sum::<f64>() / mid as f64;
    let second: f64 = values[mid..].iter().sum::<f64>() / (values.len() - mid) as f64;
    // guard the relative band against a flat-zero first half
    let band = if first == 0.0 { STEADY_BAND } else { first.abs() * STEADY_BAND };
    if second > first + band {
        TrendDirection::Rising
    } else if second < first - band {
        TrendDirection::Falling
    } else {
        TrendDirection::Steady
    }
}

#[async_trait]
impl Step for TrendSummary {
    fn kind(&self) -> StepKind {
        StepKind::Trend
    }

    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError> {
        if state.readings.is_empty() {
            return Err(StepError::MissingInput {
                what: "validated readings",
            });
        }

        let pm25: Vec<f64> = state.readings.iter().map(|r| r.pm25).collect();
        let count = pm25.len() as f64;
        let mean_pm25 = pm25.iter().sum::<f64>() / count;
        let min_pm25 = pm25.iter().copied().fold(f64::INFINITY, f64::min);
        let max_pm25 = pm25.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean_pm10 = state.readings.iter().map(|r| r.pm10).sum::<f64>() / count;
        let direction = direction_of(&pm25);

        let outcome = match (&state.alert, &state.classification) {
            (Some(alert), None) => match alert.approved {
                Approval::Approved => "Alert: TRIGGERED (confirmed by operator).".to_string(),
                Approval::Rejected => {
                    "Alert raised but not confirmed by operator review.".to_string()
                }
                Approval::Pending => {
                    // the executor only reaches this step after a resume
                    return Err(StepError::Invalid(
                        "trend summary reached with an undecided alert".into(),
                    ));
                }
            },
            (None, Some(class)) => format!("Air quality classified as {class}."),
            _ => {
                return Err(StepError::MissingInput {
                    what: "branch outcome (alert or classification)",
                });
            }
        };

        let text = format!(
            "{} readings ({} dropped). PM2.5 mean {:.1}, min {:.1}, max {:.1} µg/m³; \
             PM10 mean {:.1} µg/m³. Levels are {} over the period. {}",
            state.readings.len(),
            state.dropped_readings,
            mean_pm25,
            min_pm25,
            max_pm25,
            mean_pm10,
            direction,
            outcome,
        );

        ctx.emit(self.kind(), text.clone());

        Ok(StepUpdate::new().with_trend(TrendReport {
            mean_pm25,
            min_pm25,
            max_pm25,
            mean_pm10,
            direction,
            text,
        }))
    }
}
