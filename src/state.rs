//! Run state for the aerosense pipeline.
//!
//! A single [`PipelineState`] is threaded through every step of one run. Steps
//! never mutate it directly — they return a [`crate::steps::StepUpdate`] that
//! the executor merges, so each field is written exactly once by the step that
//! owns it:
//!
//! - `readings` / `dropped_readings` — validation
//! - `anomalies` / `anomaly_count` — detection
//! - `alert` **or** `classification` — the branch (never both)
//! - `trend_summary` — after the branches converge
//! - `nl_summary` — last, by the model-call step
//!
//! The whole record serializes as one document so a suspended run survives
//! process boundaries via a [`crate::checkpoint::Checkpointer`].

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::reading::{Anomaly, Reading};

/// Lifecycle of one run. Transitions are forward-only; see
/// [`RunStatus::transition`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Steps are executing (or a resume has been accepted).
    #[default]
    Running,
    /// Paused at the approval gate; an external decision is required.
    AwaitingApproval,
    /// All steps finished; `nl_summary` is set.
    Completed,
    /// A step failed; the state is inspectable but not resumable.
    Failed,
}

impl RunStatus {
    /// Returns `true` once no further steps can run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Validate and apply a forward transition.
    ///
    /// Legal moves: `Running → AwaitingApproval`, `AwaitingApproval → Running`
    /// (resume), `Running → Completed`, and `Running | AwaitingApproval →
    /// Failed`. Everything else — in particular any move out of a terminal
    /// status — is rejected, which is how the "no re-entry into earlier
    /// stages" invariant is enforced.
    pub fn transition(&mut self, next: RunStatus) -> Result<(), InvalidTransition> {
        let ok = matches!(
            (*self, next),
            (RunStatus::Running, RunStatus::AwaitingApproval)
                | (RunStatus::AwaitingApproval, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
                | (RunStatus::AwaitingApproval, RunStatus::Failed)
        );
        if !ok {
            return Err(InvalidTransition { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::AwaitingApproval => write!(f, "awaiting_approval"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Rejected status move.
#[derive(Debug, Error, Diagnostic)]
#[error("invalid status transition: {from} -> {to}")]
#[diagnostic(
    code(aerosense::state::invalid_transition),
    help("Run statuses only move forward; a finished run cannot be re-driven.")
)]
pub struct InvalidTransition {
    pub from: RunStatus,
    pub to: RunStatus,
}

/// Outcome of the human approval gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    /// Produced by `alert_decision`; the run suspends in this state.
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Decision supplied by the external approver when resuming a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl From<ApprovalDecision> for Approval {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approve => Approval::Approved,
            ApprovalDecision::Reject => Approval::Rejected,
        }
    }
}

/// Alert record produced on the anomaly branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub triggered: bool,
    /// Human-readable account of which readings tripped the gate and why.
    pub reason: String,
    pub approved: Approval,
}

/// Air-quality class produced on the classification branch.
///
/// Bands are strict upper bounds on the series maximum PM2.5 (µg/m³):
/// Good `< 12.0` ≤ Moderate `< 55.0` ≤ Unhealthy `< 150.0` ≤ Hazardous.
/// The cutoffs themselves live in [`crate::config::ClassificationBands`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityClass {
    Good,
    Moderate,
    Unhealthy,
    Hazardous,
}

impl fmt::Display for AirQualityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirQualityClass::Good => write!(f, "Good"),
            AirQualityClass::Moderate => write!(f, "Moderate"),
            AirQualityClass::Unhealthy => write!(f, "Unhealthy"),
            AirQualityClass::Hazardous => write!(f, "Hazardous"),
        }
    }
}

/// Direction of change over the series: second-half mean vs first-half mean
/// of PM2.5, with a ±5 % band collapsing to `Steady`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Steady,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Falling => write!(f, "falling"),
            TrendDirection::Steady => write!(f, "steady"),
        }
    }
}

/// Descriptive statistics plus the rendered trend text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub mean_pm25: f64,
    pub min_pm25: f64,
    pub max_pm25: f64,
    pub mean_pm10: f64,
    pub direction: TrendDirection,
    /// Assembled description, including the branch outcome (alert status or
    /// classification).
    pub text: String,
}

/// The shared record threaded through all steps of one run.
///
/// Created by [`PipelineState::new`] at run start, merged into by the executor
/// after each step, and exposed read-only to the presentation layer.
///
/// # Examples
///
/// ```rust
/// use aerosense::state::{PipelineState, RunStatus};
/// use aerosense::reading::RawReading;
///
/// let state = PipelineState::new(vec![RawReading::new("2026-08-01T00:00:00Z", 10.0, 20.0)], 3);
/// assert_eq!(state.status, RunStatus::Running);
/// assert_eq!(state.threshold, 3);
/// assert!(state.readings.is_empty()); // populated by validation
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Raw candidates as supplied at run start. Consumed by validation;
    /// retained so a failed run stays diagnosable.
    pub raw: Vec<crate::reading::RawReading>,
    /// Cleaned readings. Written once by validation, immutable after.
    pub readings: Vec<Reading>,
    /// Candidates rejected by validation.
    pub dropped_readings: usize,
    /// Readings flagged by detection, ordered by index.
    pub anomalies: Vec<Anomaly>,
    pub anomaly_count: usize,
    /// Branch threshold, copied from config at run start so a checkpointed
    /// state is self-contained.
    pub threshold: usize,
    /// Present only when the alert path was taken.
    pub alert: Option<Alert>,
    /// Present only when the classification path was taken.
    pub classification: Option<AirQualityClass>,
    pub trend_summary: Option<TrendReport>,
    pub nl_summary: Option<String>,
    pub status: RunStatus,
    /// When the run was created (diagnostics only).
    pub started_at: DateTime<Utc>,
}

impl PipelineState {
    /// Fresh state for a new run.
    #[must_use]
    pub fn new(raw: Vec<crate::reading::RawReading>, threshold: usize) -> Self {
        Self {
            raw,
            readings: Vec::new(),
            dropped_readings: 0,
            anomalies: Vec::new(),
            anomaly_count: 0,
            threshold,
            alert: None,
            classification: None,
            trend_summary: None,
            nl_summary: None,
            status: RunStatus::Running,
            started_at: Utc::now(),
        }
    }

    /// Which branch, if any, has been taken so far.
    ///
    /// At most one of `alert`/`classification` is ever set; the merge step
    /// refuses updates that would violate that.
    #[must_use]
    pub fn branch_taken(&self) -> Option<StepBranch> {
        match (&self.alert, &self.classification) {
            (Some(_), None) => Some(StepBranch::Alert),
            (None, Some(_)) => Some(StepBranch::Classification),
            _ => None,
        }
    }
}

/// The two mutually exclusive branch outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepBranch {
    Alert,
    Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_accepted() {
        let mut status = RunStatus::Running;
        status.transition(RunStatus::AwaitingApproval).unwrap();
        status.transition(RunStatus::Running).unwrap();
        status.transition(RunStatus::Completed).unwrap();
    }

    #[test]
    fn terminal_statuses_are_sticky() {
        let mut done = RunStatus::Completed;
        assert!(done.transition(RunStatus::Running).is_err());
        let mut failed = RunStatus::Failed;
        assert!(failed.transition(RunStatus::AwaitingApproval).is_err());
    }

    #[test]
    fn cannot_complete_from_suspension_without_resume() {
        let mut status = RunStatus::AwaitingApproval;
        assert!(status.transition(RunStatus::Completed).is_err());
        // but failing out of suspension is allowed (e.g. abandoned run cleanup)
        status.transition(RunStatus::Failed).unwrap();
    }

    #[test]
    fn state_serde_round_trip() {
        let mut state = PipelineState::new(vec![], 3);
        state.alert = Some(Alert {
            triggered: true,
            reason: "5 of 5 readings above hazard cutoffs".into(),
            approved: Approval::Pending,
        });
        state.status = RunStatus::AwaitingApproval;

        let json = serde_json::to_string(&state).unwrap();
        let back: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.branch_taken(), Some(StepBranch::Alert));
    }
}
