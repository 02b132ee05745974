//! `detect_anomalies` — static hazard cutoffs over the cleaned series.
//!
//! A reading is anomalous when PM2.5 exceeds [`HazardThresholds::pm25`]
//! (default 250.0 µg/m³) or PM10 exceeds [`HazardThresholds::pm10`]
//! (default 430.0 µg/m³). Comparisons are strict: a reading exactly at a
//! cutoff is not flagged. Deterministic, no randomness.

use async_trait::async_trait;

use crate::config::HazardThresholds;
use crate::reading::Anomaly;
use crate::state::PipelineState;
use crate::types::StepKind;

use super::{Step, StepContext, StepError, StepUpdate};

pub struct DetectAnomalies {
    thresholds: HazardThresholds,
}

impl DetectAnomalies {
    #[must_use]
    pub fn new(thresholds: HazardThresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait]
impl Step for DetectAnomalies {
    fn kind(&self) -> StepKind {
        StepKind::Detect
    }

    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError> {
        if state.readings.is_empty() {
            return Err(StepError::MissingInput {
                what: "validated readings",
            });
        }

        let anomalies: Vec<Anomaly> = state
            .readings
            .iter()
            .enumerate()
            .filter(|(_, r)| r.exceeds(self.thresholds.pm25, self.thresholds.pm10))
            .map(|(index, r)| Anomaly {
                index,
                timestamp: r.timestamp,
                pm25: r.pm25,
                pm10: r.pm10,
            })
            .collect();

        tracing::debug!(
            flagged = anomalies.len(),
            total = state.readings.len(),
            pm25_cutoff = self.thresholds.pm25,
            pm10_cutoff = self.thresholds.pm10,
            "anomaly detection finished"
        );
        ctx.emit(
            self.kind(),
            format!(
                "{} of {} readings above hazard cutoffs",
                anomalies.len(),
                state.readings.len()
            ),
        );

        Ok(StepUpdate::new().with_anomalies(anomalies))
    }
}
