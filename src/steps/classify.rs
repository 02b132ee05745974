//! `classify_air_quality` — fixed-band lookup over the cleaned series.
//!
//! The series maximum PM2.5 is mapped through [`ClassificationBands`]
//! (strict upper bounds, defaults 12.0 / 55.0 / 150.0 µg/m³):
//!
//! | max PM2.5 | class |
//! |-----------|-------|
//! | `< 12.0`  | Good |
//! | `< 55.0`  | Moderate |
//! | `< 150.0` | Unhealthy |
//! | otherwise | Hazardous |
//!
//! Runs only on the non-anomaly branch. Deterministic lookup, no external
//! calls.

use async_trait::async_trait;

use crate::config::ClassificationBands;
use crate::state::{AirQualityClass, PipelineState};
use crate::types::StepKind;

use super::{Step, StepContext, StepError, StepUpdate};

pub struct ClassifyAirQuality {
    bands: ClassificationBands,
}

impl ClassifyAirQuality {
    #[must_use]
    pub fn new(bands: ClassificationBands) -> Self {
        Self { bands }
    }

    /// Band lookup for a single concentration value.
    #[must_use]
    pub fn classify(&self, max_pm25: f64) -> AirQualityClass {
        if max_pm25 < self.bands.good_below {
            AirQualityClass::Good
        } else if max_pm25 < self.bands.moderate_below {
            AirQualityClass::Moderate
        } else if max_pm25 < self.bands.unhealthy_below {
            AirQualityClass::Unhealthy
        } else {
            AirQualityClass::Hazardous
        }
    }
}

#[async_trait]
impl Step for ClassifyAirQuality {
    fn kind(&self) -> StepKind {
        StepKind::Classify
    }

    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError> {
        let max_pm25 = state
            .readings
            .iter()
            .map(|r| r.pm25)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_pm25.is_finite() {
            return Err(StepError::MissingInput {
                what: "validated readings",
            });
        }

        let class = self.classify(max_pm25);
        tracing::debug!(max_pm25, class = %class, "air quality classified");
        ctx.emit(self.kind(), format!("{class} (max PM2.5 {max_pm25:.1} µg/m³)"));

        Ok(StepUpdate::new().with_classification(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ClassifyAirQuality {
        ClassifyAirQuality::new(ClassificationBands::default())
    }

    #[test]
    fn band_boundaries_are_strict_upper_bounds() {
        let c = classifier();
        assert_eq!(c.classify(11.9), AirQualityClass::Good);
        assert_eq!(c.classify(12.0), AirQualityClass::Moderate);
        assert_eq!(c.classify(54.9), AirQualityClass::Moderate);
        assert_eq!(c.classify(55.0), AirQualityClass::Unhealthy);
        assert_eq!(c.classify(149.9), AirQualityClass::Unhealthy);
        assert_eq!(c.classify(150.0), AirQualityClass::Hazardous);
    }

    #[test]
    fn zero_is_good() {
        assert_eq!(classifier().classify(0.0), AirQualityClass::Good);
    }
}
