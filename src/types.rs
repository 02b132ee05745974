//! Core identifiers for the aerosense pipeline.
//!
//! This module defines [`StepKind`], the identifier for the six steps of the
//! fixed pipeline topology. Runtime execution types (run state, checkpoints)
//! live in [`crate::runner`] and [`crate::checkpoint`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one step of the pipeline.
///
/// The topology is fixed — there is no user-extensible node registry — so the
/// variants enumerate exactly the steps the executor knows how to route:
///
/// `Validate` → `Detect` → branch → (`AlertDecision` | `Classify`) →
/// `Trend` → `Summarize`.
///
/// # Persistence
///
/// `StepKind` supports serde for checkpointing, plus the
/// [`encode`](Self::encode)/[`decode`](Self::decode) string form used in
/// durable backends and log fields.
///
/// # Examples
///
/// ```rust
/// use aerosense::types::StepKind;
///
/// let step = StepKind::Detect;
/// assert_eq!(step.encode(), "detect_anomalies");
/// assert_eq!(StepKind::decode("detect_anomalies"), Some(StepKind::Detect));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Drop invalid readings, record the dropped count.
    Validate,
    /// Flag readings exceeding the hazard cutoffs.
    Detect,
    /// Build the unapproved alert record (alert path only).
    AlertDecision,
    /// Map the series to an air-quality class (classification path only).
    Classify,
    /// Descriptive statistics after the branches converge.
    Trend,
    /// Natural-language summary via the language-model service.
    Summarize,
}

impl StepKind {
    /// All steps in canonical pipeline order (branch steps adjacent).
    pub const ALL: [StepKind; 6] = [
        StepKind::Validate,
        StepKind::Detect,
        StepKind::AlertDecision,
        StepKind::Classify,
        StepKind::Trend,
        StepKind::Summarize,
    ];

    /// Encode into the persisted string form.
    ///
    /// The names match the operations the pipeline exposes, so checkpoint
    /// rows and log lines read naturally.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            StepKind::Validate => "validate_readings",
            StepKind::Detect => "detect_anomalies",
            StepKind::AlertDecision => "alert_decision",
            StepKind::Classify => "classify_air_quality",
            StepKind::Trend => "generate_trend_summary",
            StepKind::Summarize => "nl_summary",
        }
    }

    /// Decode a persisted string form. Returns `None` for unknown names so
    /// callers can surface corrupt checkpoints instead of guessing.
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "validate_readings" => Some(StepKind::Validate),
            "detect_anomalies" => Some(StepKind::Detect),
            "alert_decision" => Some(StepKind::AlertDecision),
            "classify_air_quality" => Some(StepKind::Classify),
            "generate_trend_summary" => Some(StepKind::Trend),
            "nl_summary" => Some(StepKind::Summarize),
            _ => None,
        }
    }

    /// Returns `true` for the two branch steps (exactly one runs per run).
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, StepKind::AlertDecision | StepKind::Classify)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for kind in StepKind::ALL {
            assert_eq!(StepKind::decode(kind.encode()), Some(kind));
        }
    }

    #[test]
    fn decode_rejects_unknown() {
        assert_eq!(StepKind::decode("critique_summary"), None);
    }
}
