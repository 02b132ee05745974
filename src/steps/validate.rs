//! `validate_readings` — drop anything the pipeline cannot trust.
//!
//! Rejection rules, applied per candidate in order:
//! - missing or non-RFC-3339 timestamp
//! - timestamp already seen earlier in the sequence (duplicate)
//! - missing, non-finite, or negative PM2.5 or PM10
//!
//! Relative order of survivors is preserved. If nothing survives the run
//! fails with [`StepError::NoValidData`] rather than proceeding on an empty
//! series.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::reading::{Reading, parse_timestamp};
use crate::state::PipelineState;
use crate::types::StepKind;

use super::{Step, StepContext, StepError, StepUpdate};

/// Pure validation step; deterministic for a given input sequence.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidateReadings;

#[async_trait]
impl Step for ValidateReadings {
    fn kind(&self) -> StepKind {
        StepKind::Validate
    }

    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError> {
        let total = state.raw.len();
        let mut seen = HashSet::with_capacity(total);
        let mut cleaned = Vec::with_capacity(total);

        for candidate in &state.raw {
            let Some(timestamp) = candidate.timestamp.as_deref().and_then(parse_timestamp)
            else {
                continue;
            };
            let (Some(pm25), Some(pm10)) = (candidate.pm25, candidate.pm10) else {
                continue;
            };
            if !pm25.is_finite() || !pm10.is_finite() || pm25 < 0.0 || pm10 < 0.0 {
                continue;
            }
            // only surviving entries reserve a timestamp
            if !seen.insert(timestamp) {
                continue;
            }
            cleaned.push(Reading { timestamp, pm25, pm10 });
        }

        let dropped = total - cleaned.len();
        tracing::debug!(total, kept = cleaned.len(), dropped, "readings validated");
        ctx.emit(
            self.kind(),
            format!("kept {} of {} readings", cleaned.len(), total),
        );

        if cleaned.is_empty() {
            return Err(StepError::NoValidData { dropped });
        }
        Ok(StepUpdate::new().with_readings(cleaned, dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventEmitter;
    use crate::reading::RawReading;

    fn ctx() -> StepContext {
        StepContext {
            run_id: "test".into(),
            step_number: 1,
            events: EventEmitter::disabled(),
        }
    }

    fn state_of(raw: Vec<RawReading>) -> PipelineState {
        PipelineState::new(raw, 3)
    }

    #[tokio::test]
    async fn keeps_valid_drops_invalid_preserving_order() {
        let raw = vec![
            RawReading::new("2026-08-01T00:00:00Z", 10.0, 20.0),
            RawReading {
                timestamp: None,
                pm25: Some(11.0),
                pm10: Some(21.0),
            },
            RawReading::new("2026-08-01T01:00:00Z", -1.0, 20.0),
            RawReading::new("2026-08-01T02:00:00Z", 12.0, 22.0),
            RawReading {
                timestamp: Some("2026-08-01T03:00:00Z".into()),
                pm25: Some(f64::NAN),
                pm10: Some(20.0),
            },
        ];
        let update = ValidateReadings
            .run(&state_of(raw), ctx())
            .await
            .unwrap();
        let readings = update.readings.unwrap();
        assert_eq!(update.dropped_readings, Some(3));
        assert_eq!(readings.len(), 2);
        assert!(readings[0].timestamp < readings[1].timestamp);
    }

    #[tokio::test]
    async fn duplicate_timestamps_keep_first() {
        let raw = vec![
            RawReading::new("2026-08-01T00:00:00Z", 10.0, 20.0),
            RawReading::new("2026-08-01T00:00:00Z", 99.0, 99.0),
        ];
        let update = ValidateReadings
            .run(&state_of(raw), ctx())
            .await
            .unwrap();
        let readings = update.readings.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].pm25, 10.0);
    }

    #[tokio::test]
    async fn all_invalid_is_no_valid_data() {
        let raw = vec![
            RawReading::new("2026-08-01T00:00:00Z", -5.0, 20.0),
            RawReading::new("not a timestamp", 10.0, 20.0),
        ];
        let err = ValidateReadings
            .run(&state_of(raw), ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::NoValidData { dropped: 2 }));
    }
}
