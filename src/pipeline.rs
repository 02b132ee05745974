//! Fixed step-graph topology and state merging.
//!
//! [`Pipeline`] owns the step registry and the routing rule; it knows nothing
//! about runs, suspension bookkeeping, or persistence — that is
//! [`crate::runner::PipelineRunner`]'s job. The split mirrors the usual
//! structure/runtime separation: one `Pipeline` can back any number of runner
//! instances.
//!
//! # Topology
//!
//! ```text
//! validate_readings → detect_anomalies ─┬─ anomaly_count > threshold ──→ alert_decision ─(suspend)─┐
//!                                       └─ otherwise ──→ classify_air_quality ────────────────────┤
//!                                                                                                 ↓
//!                                                            generate_trend_summary → nl_summary → done
//! ```
//!
//! The branch is evaluated immediately after detection with a strict
//! comparison: `anomaly_count > threshold`. Exactly one of the two branch
//! steps executes per run — never both, never neither.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::llm::LanguageModel;
use crate::reading::RawReading;
use crate::runner::{PipelineRunner, PipelineError};
use crate::state::{Approval, PipelineState, RunStatus};
use crate::steps::{
    AlertDecision, ClassifyAirQuality, DetectAnomalies, NlSummary, Step, StepError, StepUpdate,
    TrendSummary, ValidateReadings,
};
use crate::types::StepKind;

/// Routing decision after a completed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Execute the given step next.
    Next(StepKind),
    /// Pause for the external approval signal.
    Suspend,
    /// The run is complete.
    Done,
}

/// The compiled pipeline: step registry + topology + merge rules.
#[derive(Clone)]
pub struct Pipeline {
    steps: FxHashMap<StepKind, Arc<dyn Step>>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Assemble the fixed pipeline against a language model.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use aerosense::config::PipelineConfig;
    /// use aerosense::llm::OllamaClient;
    /// use aerosense::pipeline::Pipeline;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = PipelineConfig::from_env();
    /// let model = Arc::new(OllamaClient::new(config.model.clone())?);
    /// let pipeline = Pipeline::new(config, model);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn new(config: PipelineConfig, model: Arc<dyn LanguageModel>) -> Self {
        let mut steps: FxHashMap<StepKind, Arc<dyn Step>> = FxHashMap::default();
        steps.insert(StepKind::Validate, Arc::new(ValidateReadings));
        steps.insert(
            StepKind::Detect,
            Arc::new(DetectAnomalies::new(config.hazard)),
        );
        steps.insert(StepKind::AlertDecision, Arc::new(AlertDecision));
        steps.insert(
            StepKind::Classify,
            Arc::new(ClassifyAirQuality::new(config.bands)),
        );
        steps.insert(StepKind::Trend, Arc::new(TrendSummary));
        steps.insert(
            StepKind::Summarize,
            Arc::new(NlSummary::new(model, config.model.max_attempts)),
        );
        Self { steps, config }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Look up a step implementation.
    #[must_use]
    pub(crate) fn step(&self, kind: StepKind) -> Arc<dyn Step> {
        Arc::clone(
            self.steps
                .get(&kind)
                .expect("fixed topology registers every step kind"),
        )
    }

    /// Decide what follows the given completed step.
    ///
    /// `cursor` is the last completed step (`None` at run start). The
    /// decision depends only on the cursor and the current state, so a
    /// restored checkpoint resumes at exactly the point it suspended.
    #[must_use]
    pub fn route_after(&self, cursor: Option<StepKind>, state: &PipelineState) -> Route {
        match cursor {
            None => Route::Next(StepKind::Validate),
            Some(StepKind::Validate) => Route::Next(StepKind::Detect),
            Some(StepKind::Detect) => {
                if state.anomaly_count > state.threshold {
                    Route::Next(StepKind::AlertDecision)
                } else {
                    Route::Next(StepKind::Classify)
                }
            }
            Some(StepKind::AlertDecision) => match state.alert.as_ref().map(|a| a.approved) {
                Some(Approval::Pending) => Route::Suspend,
                // resume has recorded a decision; a missing alert is caught
                // downstream as missing input
                _ => Route::Next(StepKind::Trend),
            },
            Some(StepKind::Classify) => Route::Next(StepKind::Trend),
            Some(StepKind::Trend) => Route::Next(StepKind::Summarize),
            Some(StepKind::Summarize) => Route::Done,
        }
    }

    /// Merge a step's partial update into the run state.
    ///
    /// This is the single place the write-once and branch-exclusivity
    /// invariants are enforced: a step that tries to overwrite an
    /// already-populated field, or to populate the second branch outcome,
    /// fails the run.
    pub fn apply_update(
        &self,
        state: &mut PipelineState,
        kind: StepKind,
        update: StepUpdate,
    ) -> Result<(), StepError> {
        if let Some(readings) = update.readings {
            if !state.readings.is_empty() {
                return Err(StepError::Invalid(
                    "readings were already written by an earlier step".into(),
                ));
            }
            tracing::debug!(step = %kind, count = readings.len(), "readings updated");
            state.readings = readings;
        }
        if let Some(dropped) = update.dropped_readings {
            state.dropped_readings = dropped;
        }
        if let Some(anomalies) = update.anomalies {
            tracing::debug!(step = %kind, count = anomalies.len(), "anomalies updated");
            state.anomaly_count = anomalies.len();
            state.anomalies = anomalies;
        }
        if let Some(alert) = update.alert {
            if state.classification.is_some() || state.alert.is_some() {
                return Err(StepError::Invalid(
                    "branch exclusivity violated: alert and classification cannot coexist".into(),
                ));
            }
            state.alert = Some(alert);
        }
        if let Some(class) = update.classification {
            if state.alert.is_some() || state.classification.is_some() {
                return Err(StepError::Invalid(
                    "branch exclusivity violated: alert and classification cannot coexist".into(),
                ));
            }
            state.classification = Some(class);
        }
        if let Some(report) = update.trend_summary {
            state.trend_summary = Some(report);
        }
        if let Some(text) = update.nl_summary {
            if state.trend_summary.is_none() {
                return Err(StepError::MissingInput {
                    what: "trend summary",
                });
            }
            state.nl_summary = Some(text);
        }
        Ok(())
    }

    /// One-shot convenience: run a fresh pipeline over the given candidates
    /// with a generated run id and an in-memory checkpointer.
    ///
    /// The returned state is either `Completed` (classification path) or
    /// `AwaitingApproval` (alert path). For approval-gated flows that need to
    /// resume later, hold a [`PipelineRunner`] instead — the runner created
    /// here is dropped on return.
    pub async fn run(&self, raw: Vec<RawReading>) -> Result<PipelineState, PipelineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut runner = PipelineRunner::new(self.clone());
        runner.create_run(run_id.clone(), raw).await?;
        let state = runner.run_until_blocked(&run_id).await?;
        if state.status == RunStatus::AwaitingApproval {
            tracing::info!(
                run_id = %run_id,
                "one-shot run suspended at the approval gate; use PipelineRunner to resume"
            );
        }
        Ok(state)
    }
}
