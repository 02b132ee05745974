//! Step execution framework.
//!
//! A [`Step`] is one named transformation applied to the run state. Steps
//! receive a read-only [`PipelineState`] snapshot plus a [`StepContext`] and
//! return a [`StepUpdate`] — the executor owns the merge, so a step can only
//! write the fields it is responsible for and the branch-exclusivity and
//! write-once invariants are enforced in one place
//! ([`crate::pipeline::Pipeline::apply_update`]).
//!
//! # Error Handling
//!
//! Step failures are fatal to the run: the executor stops, marks the run
//! `Failed`, and surfaces the originating step name with the [`StepError`].
//! There is no per-step retry; the model-call step manages its own bounded
//! retry internally before reporting [`StepError::ModelUnavailable`].

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::events::{EventEmitter, RunEvent};
use crate::reading::{Anomaly, Reading};
use crate::state::{AirQualityClass, Alert, PipelineState, TrendReport};
use crate::types::StepKind;

pub mod alert;
pub mod classify;
pub mod detect;
pub mod summarize;
pub mod trend;
pub mod validate;

pub use alert::AlertDecision;
pub use classify::ClassifyAirQuality;
pub use detect::DetectAnomalies;
pub use summarize::NlSummary;
pub use trend::TrendSummary;
pub use validate::ValidateReadings;

/// One named transformation over the run state.
///
/// Implementations must be pure functions of the snapshot wherever the
/// operation allows it — only the model-call step performs I/O — so repeated
/// execution on identical input yields identical output.
#[async_trait]
pub trait Step: Send + Sync {
    /// The identifier this step registers under.
    fn kind(&self) -> StepKind;

    /// Execute against the current state snapshot.
    async fn run(&self, state: &PipelineState, ctx: StepContext) -> Result<StepUpdate, StepError>;
}

/// Execution context passed to a step.
///
/// Carries the run identity and the event emitter so steps can publish
/// progress without touching the runner.
#[derive(Clone, Debug)]
pub struct StepContext {
    pub run_id: String,
    /// Superstep counter within the run (1-based).
    pub step_number: u64,
    pub events: EventEmitter,
}

impl StepContext {
    /// Publish a step-scoped progress event enriched with this context's
    /// metadata.
    pub fn emit(&self, kind: StepKind, message: impl Into<String>) {
        self.events.emit(RunEvent::new(
            self.run_id.clone(),
            self.step_number,
            Some(kind),
            message,
        ));
    }
}

/// Partial state update returned by a step.
///
/// All fields optional; the executor merges only what is present. The fluent
/// constructors keep step bodies declarative:
///
/// ```rust
/// use aerosense::steps::StepUpdate;
///
/// let update = StepUpdate::new().with_nl_summary("All clear.");
/// assert!(update.nl_summary.is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct StepUpdate {
    pub readings: Option<Vec<Reading>>,
    pub dropped_readings: Option<usize>,
    pub anomalies: Option<Vec<Anomaly>>,
    pub alert: Option<Alert>,
    pub classification: Option<AirQualityClass>,
    pub trend_summary: Option<TrendReport>,
    pub nl_summary: Option<String>,
}

impl StepUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_readings(mut self, readings: Vec<Reading>, dropped: usize) -> Self {
        self.readings = Some(readings);
        self.dropped_readings = Some(dropped);
        self
    }

    #[must_use]
    pub fn with_anomalies(mut self, anomalies: Vec<Anomaly>) -> Self {
        self.anomalies = Some(anomalies);
        self
    }

    #[must_use]
    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alert = Some(alert);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, class: AirQualityClass) -> Self {
        self.classification = Some(class);
        self
    }

    #[must_use]
    pub fn with_trend(mut self, report: TrendReport) -> Self {
        self.trend_summary = Some(report);
        self
    }

    #[must_use]
    pub fn with_nl_summary(mut self, text: impl Into<String>) -> Self {
        self.nl_summary = Some(text.into());
        self
    }
}

/// Fatal step-level failures.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// Validation rejected every candidate reading.
    #[error("no valid readings survived validation ({dropped} dropped)")]
    #[diagnostic(
        code(aerosense::steps::no_valid_data),
        help("Check the upstream dataset: timestamps must be RFC 3339 and concentrations non-negative.")
    )]
    NoValidData { dropped: usize },

    /// The language-model service failed or timed out.
    #[error("language model unavailable: {reason}")]
    #[diagnostic(
        code(aerosense::steps::model_unavailable),
        help("Verify the model service is reachable and the configured timeout is realistic.")
    )]
    ModelUnavailable { reason: String },

    /// Expected input was not produced by an earlier step.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(aerosense::steps::missing_input),
        help("Check that the preceding step ran and produced the required field.")
    )]
    MissingInput { what: &'static str },

    /// Anything else a step considers fatal.
    #[error("step failed: {0}")]
    #[diagnostic(code(aerosense::steps::invalid))]
    Invalid(String),
}
