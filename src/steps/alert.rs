//! `alert_decision` — build the unapproved alert record.
//!
//! Runs only on the anomaly branch. Pure construction: summarizes which
//! readings tripped the gate and why, with `approved` starting as
//! [`Approval::Pending`]. The executor suspends the run immediately after
//! this step.

use async_trait::async_trait;

use crate::state::{Alert, Approval, PipelineState};
use crate::types::StepKind;

use super::{Step, StepContext, StepError, StepUpdate};

#[derive(Clone, Copy, Debug, Default)]
pub struct AlertDecision;

#[async_trait]
impl Step for AlertDecision {
    fn kind(&self) -> StepKind {
        StepKind::AlertDecision
    }

    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError> {
        if state.anomalies.is_empty() {
            return Err(StepError::MissingInput {
                what: "detected anomalies",
            });
        }

        let worst = state
            .anomalies
            .iter()
            .max_by(|a, b| a.pm25.total_cmp(&b.pm25))
            .expect("anomalies checked non-empty above");

        let reason = format!(
            "{} of {} readings exceeded hazard cutoffs (threshold {}); worst PM2.5 {:.1} µg/m³ at {}",
            state.anomaly_count,
            state.readings.len(),
            state.threshold,
            worst.pm25,
            worst.timestamp.to_rfc3339(),
        );

        tracing::warn!(
            anomaly_count = state.anomaly_count,
            threshold = state.threshold,
            "alert raised, awaiting approval"
        );
        ctx.emit(self.kind(), reason.clone());

        Ok(StepUpdate::new().with_alert(Alert {
            triggered: true,
            reason,
            approved: Approval::Pending,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventEmitter;
    use crate::reading::Anomaly;
    use chrono::{TimeZone, Utc};

    fn ctx() -> StepContext {
        StepContext {
            run_id: "test".into(),
            step_number: 3,
            events: EventEmitter::disabled(),
        }
    }

    #[tokio::test]
    async fn builds_pending_alert_naming_worst_reading() {
        let mut state = PipelineState::new(vec![], 3);
        state.anomaly_count = 2;
        state.anomalies = vec![
            Anomaly {
                index: 0,
                timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
                pm25: 280.0,
                pm10: 100.0,
            },
            Anomaly {
                index: 3,
                timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 3, 0, 0).unwrap(),
                pm25: 312.5,
                pm10: 120.0,
            },
        ];

        let update = AlertDecision.run(&state, ctx()).await.unwrap();
        let alert = update.alert.unwrap();
        assert!(alert.triggered);
        assert_eq!(alert.approved, Approval::Pending);
        assert!(alert.reason.contains("312.5"));
    }

    #[tokio::test]
    async fn refuses_to_run_without_anomalies() {
        let state = PipelineState::new(vec![], 3);
        let err = AlertDecision.run(&state, ctx()).await.unwrap_err();
        assert!(matches!(err, StepError::MissingInput { .. }));
    }
}
