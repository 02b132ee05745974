//! Run lifecycle management.
//!
//! [`PipelineRunner`] wraps a [`Pipeline`] and manages the runtime
//! environment: named runs, suspension at the approval gate, resume with an
//! external decision, checkpoint persistence, and progress events. One
//! pipeline can back many runner instances; each run owns its own
//! [`PipelineState`] and runs are fully independent of each other.
//!
//! # Suspension model
//!
//! The approval gate never blocks a thread. When the alert path is taken the
//! runner records `AwaitingApproval`, checkpoints the run, and returns. The
//! run stays suspended indefinitely — across process restarts, if the
//! checkpointer is durable — until [`resume`](PipelineRunner::resume) supplies
//! the decision. Abandoning a suspended run needs no cleanup beyond dropping
//! it.
//!
//! ```rust,no_run
//! use aerosense::runner::PipelineRunner;
//! use aerosense::state::{ApprovalDecision, RunStatus};
//! # use aerosense::pipeline::Pipeline;
//! # async fn example(pipeline: Pipeline, readings: Vec<aerosense::reading::RawReading>)
//! #     -> Result<(), aerosense::runner::PipelineError> {
//! let mut runner = PipelineRunner::new(pipeline);
//! runner.create_run("run-1".to_string(), readings).await?;
//!
//! let state = runner.run_until_blocked("run-1").await?;
//! if state.status == RunStatus::AwaitingApproval {
//!     // ... operator reviews the alert ...
//!     let finished = runner.resume("run-1", ApprovalDecision::Approve).await?;
//!     assert_eq!(finished.status, RunStatus::Completed);
//! }
//! # Ok(())
//! # }
//! ```

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::checkpoint::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer};
use crate::events::{EventEmitter, RunEvent};
use crate::pipeline::{Pipeline, Route};
use crate::reading::RawReading;
use crate::state::{
    ApprovalDecision, InvalidTransition, PipelineState, RunStatus,
};
use crate::steps::{StepContext, StepError};
use crate::types::StepKind;

/// In-memory bookkeeping for one run.
#[derive(Clone, Debug)]
pub struct RunState {
    pub state: PipelineState,
    /// Superstep counter (number of steps executed so far).
    pub step: u64,
    /// Last completed step; routing input for the next one.
    pub cursor: Option<StepKind>,
}

/// How [`PipelineRunner::create_run`] initialized a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunInit {
    /// A brand new run was created.
    Fresh,
    /// An existing run was restored from a checkpoint.
    Resumed {
        /// Superstep count at the restored checkpoint.
        checkpoint_step: u64,
    },
}

/// Runner-level failures.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("run not found: {run_id}")]
    #[diagnostic(code(aerosense::runner::run_not_found))]
    RunNotFound { run_id: String },

    #[error("cannot start a run with no readings")]
    #[diagnostic(
        code(aerosense::runner::empty_input),
        help("Supply at least one candidate reading; validation handles invalid entries.")
    )]
    EmptyInput,

    #[error("run {run_id} is awaiting approval; supply a decision via resume()")]
    #[diagnostic(
        code(aerosense::runner::awaiting_approval),
        help("Re-driving a suspended run without a pending resume is a usage error.")
    )]
    AwaitingApproval { run_id: String },

    #[error("invalid resume: run {run_id} is {status}, not awaiting approval")]
    #[diagnostic(code(aerosense::runner::invalid_resume))]
    InvalidResume { run_id: String, status: RunStatus },

    #[error("step {step} failed: {source}")]
    #[diagnostic(code(aerosense::runner::step))]
    Step {
        step: StepKind,
        #[source]
        #[diagnostic_source]
        source: StepError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpointer(#[from] CheckpointerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Status(#[from] InvalidTransition),
}

/// Runtime execution engine for pipeline runs.
pub struct PipelineRunner {
    pipeline: Arc<Pipeline>,
    runs: FxHashMap<String, RunState>,
    checkpointer: Arc<dyn Checkpointer>,
    autosave: bool,
    events: EventEmitter,
}

impl PipelineRunner {
    /// Runner with a volatile in-memory checkpointer and autosave enabled.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self::with_checkpointer(pipeline, Arc::new(InMemoryCheckpointer::new()))
    }

    /// Runner over an explicit (possibly shared or durable) checkpointer.
    ///
    /// Sharing one checkpointer between runner instances is how a suspended
    /// run survives a process boundary: the second runner restores it in
    /// [`create_run`](Self::create_run).
    #[must_use]
    pub fn with_checkpointer(pipeline: Pipeline, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            runs: FxHashMap::default(),
            checkpointer,
            autosave: true,
            events: EventEmitter::disabled(),
        }
    }

    /// Toggle per-step checkpointing (suspension and terminal checkpoints are
    /// always written).
    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Attach an event channel; the receiver sees every step start/finish,
    /// suspension, resume, and terminal transition.
    #[must_use]
    pub fn with_event_channel(mut self) -> (Self, flume::Receiver<RunEvent>) {
        let (emitter, receiver) = EventEmitter::channel();
        self.events = emitter;
        (self, receiver)
    }

    /// Initialize a run, restoring from a checkpoint when one exists.
    ///
    /// A restored run picks up exactly where it left off — most usefully an
    /// `AwaitingApproval` run waiting for [`resume`](Self::resume).
    #[instrument(skip(self, raw), err)]
    pub async fn create_run(
        &mut self,
        run_id: String,
        raw: Vec<RawReading>,
    ) -> Result<RunInit, PipelineError> {
        if let Some(stored) = self.checkpointer.load_latest(&run_id).await? {
            let cursor = stored.decode_cursor()?;
            let restored = RunState {
                state: stored.state,
                step: stored.step,
                cursor,
            };
            tracing::info!(
                run_id = %run_id,
                checkpoint_step = stored.step,
                status = %restored.state.status,
                "run restored from checkpoint"
            );
            self.runs.insert(run_id, restored);
            return Ok(RunInit::Resumed {
                checkpoint_step: stored.step,
            });
        }

        if raw.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let run = RunState {
            state: PipelineState::new(raw, self.pipeline.config().anomaly_threshold),
            step: 0,
            cursor: None,
        };
        self.checkpoint(&run_id, &run).await;
        self.runs.insert(run_id, run);
        Ok(RunInit::Fresh)
    }

    /// Drive a run until it completes, suspends, or fails.
    ///
    /// Returns the (cloned) state at the blocking point. Calling this on a
    /// run that is already `AwaitingApproval` is a usage error; on a terminal
    /// run it is a no-op returning the final state.
    #[instrument(skip(self), err)]
    pub async fn run_until_blocked(
        &mut self,
        run_id: &str,
    ) -> Result<PipelineState, PipelineError> {
        let mut run = self
            .runs
            .remove(run_id)
            .ok_or_else(|| PipelineError::RunNotFound {
                run_id: run_id.to_string(),
            })?;

        match run.state.status {
            RunStatus::AwaitingApproval => {
                let err = PipelineError::AwaitingApproval {
                    run_id: run_id.to_string(),
                };
                self.runs.insert(run_id.to_string(), run);
                return Err(err);
            }
            RunStatus::Completed | RunStatus::Failed => {
                tracing::debug!(run_id, status = %run.state.status, "terminal run, nothing to drive");
                let state = run.state.clone();
                self.runs.insert(run_id.to_string(), run);
                return Ok(state);
            }
            RunStatus::Running => {}
        }

        let outcome = self.drive(run_id, &mut run).await;
        let state = run.state.clone();
        self.runs.insert(run_id.to_string(), run);
        outcome.map(|_| state)
    }

    /// Supply the human decision for a suspended run and drive it onward.
    ///
    /// Rejection still completes the run; the alert simply stays unconfirmed
    /// and the downstream summaries say so.
    #[instrument(skip(self), err)]
    pub async fn resume(
        &mut self,
        run_id: &str,
        decision: ApprovalDecision,
    ) -> Result<PipelineState, PipelineError> {
        let run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| PipelineError::RunNotFound {
                run_id: run_id.to_string(),
            })?;

        if run.state.status != RunStatus::AwaitingApproval {
            return Err(PipelineError::InvalidResume {
                run_id: run_id.to_string(),
                status: run.state.status,
            });
        }
        let Some(alert) = run.state.alert.as_mut() else {
            return Err(PipelineError::Step {
                step: StepKind::AlertDecision,
                source: StepError::MissingInput {
                    what: "alert record on a suspended run",
                },
            });
        };

        alert.approved = decision.into();
        run.state.status.transition(RunStatus::Running)?;
        tracing::info!(run_id, ?decision, "approval decision received");
        self.events.emit(RunEvent::new(
            run_id,
            run.step,
            None,
            format!("approval decision: {decision:?}"),
        ));

        self.run_until_blocked(run_id).await
    }

    /// Read-only view of a run's state for the presentation layer.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&PipelineState> {
        self.runs.get(run_id).map(|run| &run.state)
    }

    /// All run ids known to this runner instance.
    #[must_use]
    pub fn run_ids(&self) -> Vec<&String> {
        self.runs.keys().collect()
    }

    /// Step loop: route, execute, merge, checkpoint — until a blocking point.
    async fn drive(&mut self, run_id: &str, run: &mut RunState) -> Result<(), PipelineError> {
        loop {
            match self.pipeline.route_after(run.cursor, &run.state) {
                Route::Done => {
                    run.state.status.transition(RunStatus::Completed)?;
                    self.checkpoint(run_id, run).await;
                    self.events.emit(RunEvent::new(run_id, run.step, None, "run completed"));
                    tracing::info!(run_id, steps = run.step, "run completed");
                    return Ok(());
                }
                Route::Suspend => {
                    run.state.status.transition(RunStatus::AwaitingApproval)?;
                    self.checkpoint(run_id, run).await;
                    self.events.emit(RunEvent::new(
                        run_id,
                        run.step,
                        None,
                        "suspended awaiting approval",
                    ));
                    tracing::info!(run_id, "run suspended at the approval gate");
                    return Ok(());
                }
                Route::Next(kind) => {
                    let step_number = run.step + 1;
                    let ctx = StepContext {
                        run_id: run_id.to_string(),
                        step_number,
                        events: self.events.clone(),
                    };
                    tracing::debug!(run_id, step = %kind, step_number, "executing step");

                    let result = self.pipeline.step(kind).run(&run.state, ctx).await;
                    let merged = result.and_then(|update| {
                        self.pipeline.apply_update(&mut run.state, kind, update)
                    });

                    if let Err(source) = merged {
                        run.state.status.transition(RunStatus::Failed)?;
                        self.checkpoint(run_id, run).await;
                        self.events.emit(RunEvent::new(
                            run_id,
                            step_number,
                            Some(kind),
                            format!("failed: {source}"),
                        ));
                        tracing::error!(run_id, step = %kind, error = %source, "run failed");
                        return Err(PipelineError::Step { step: kind, source });
                    }

                    run.cursor = Some(kind);
                    run.step = step_number;
                    if self.autosave {
                        self.checkpoint(run_id, run).await;
                    }
                }
            }
        }
    }

    /// Best-effort checkpoint write; persistence failures are logged, not
    /// fatal to the run.
    async fn checkpoint(&self, run_id: &str, run: &RunState) {
        let checkpoint = Checkpoint::new(run_id, run.step, run.cursor, run.state.clone());
        if let Err(e) = self.checkpointer.save(checkpoint).await {
            tracing::warn!(run_id, error = %e, "checkpoint save failed");
        }
    }
}
