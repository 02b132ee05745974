//! Sensor sample types.
//!
//! [`RawReading`] is the shape handed over by the external data loader: every
//! field optional, nothing trusted. [`Reading`] is the validated form the rest
//! of the pipeline operates on. The conversion lives in
//! [`crate::steps::validate`]; this module only provides the types and the
//! timestamp parsing rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One candidate sample as supplied by the caller.
///
/// Field semantics mirror the upstream dataset columns: a timestamp string
/// plus PM2.5 and PM10 concentrations in µg/m³. Any field may be absent or
/// garbage; validation decides what survives.
///
/// # Examples
///
/// ```rust
/// use aerosense::reading::RawReading;
///
/// let raw = RawReading::new("2026-08-01T10:00:00Z", 18.2, 40.0);
/// assert!(raw.pm25.is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    /// RFC 3339 timestamp, if present.
    pub timestamp: Option<String>,
    /// PM2.5 concentration in µg/m³, if present.
    pub pm25: Option<f64>,
    /// PM10 concentration in µg/m³, if present.
    pub pm10: Option<f64>,
}

impl RawReading {
    /// Construct a fully-populated candidate.
    pub fn new(timestamp: impl Into<String>, pm25: f64, pm10: f64) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            pm25: Some(pm25),
            pm10: Some(pm10),
        }
    }
}

/// One validated sample: parseable timestamp, finite non-negative values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub pm25: f64,
    pub pm10: f64,
}

impl Reading {
    /// Returns `true` when either pollutant exceeds its hazard cutoff
    /// (strict comparison — a reading exactly at the cutoff is not flagged).
    #[must_use]
    pub fn exceeds(&self, pm25_cutoff: f64, pm10_cutoff: f64) -> bool {
        self.pm25 > pm25_cutoff || self.pm10 > pm10_cutoff
    }
}

/// A reading flagged by anomaly detection, identified by its position in the
/// cleaned series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Index into [`crate::state::PipelineState::readings`].
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub pm25: f64,
    pub pm10: f64,
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// This is the single timestamp rule for the whole crate; the loader's
/// formatting concerns stay outside.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_timestamp("2026-08-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-08-01T10:00:00+00:00");
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday-ish").is_none());
    }

    #[test]
    fn exceeds_is_strict() {
        let reading = Reading {
            timestamp: Utc::now(),
            pm25: 250.0,
            pm10: 430.0,
        };
        assert!(!reading.exceeds(250.0, 430.0));
        assert!(Reading { pm25: 250.1, ..reading.clone() }.exceeds(250.0, 430.0));
        assert!(Reading { pm10: 430.1, ..reading }.exceeds(250.0, 430.0));
    }
}
