//! # aerosense: stateful air-quality pipeline
//!
//! aerosense runs a fixed, small step graph over a PM2.5/PM10 time series:
//! validate → detect anomalies → branch → (alert + human approval |
//! classification) → trend summary → natural-language summary via a locally
//! hosted language model.
//!
//! ## Core Concepts
//!
//! - **Steps**: Async units of work over a shared [`state::PipelineState`]
//! - **Pipeline**: The fixed topology, branch rule, and state merging
//! - **Runner**: Run lifecycle — suspension at the approval gate, resume,
//!   checkpointing, progress events
//! - **Checkpointer**: Pluggable persistence so a suspended run survives
//!   process boundaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aerosense::config::PipelineConfig;
//! use aerosense::llm::OllamaClient;
//! use aerosense::pipeline::Pipeline;
//! use aerosense::reading::RawReading;
//! use aerosense::runner::PipelineRunner;
//! use aerosense::state::{ApprovalDecision, RunStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::from_env();
//! let model = Arc::new(OllamaClient::new(config.model.clone())?);
//! let pipeline = Pipeline::new(config, model);
//!
//! let readings = vec![
//!     RawReading::new("2026-08-01T10:00:00Z", 18.2, 40.0),
//!     RawReading::new("2026-08-01T11:00:00Z", 21.7, 44.1),
//! ];
//!
//! let mut runner = PipelineRunner::new(pipeline);
//! runner.create_run("morning".to_string(), readings).await?;
//! let state = runner.run_until_blocked("morning").await?;
//!
//! match state.status {
//!     RunStatus::Completed => println!("{}", state.nl_summary.unwrap()),
//!     RunStatus::AwaitingApproval => {
//!         // operator reviews state.alert, then:
//!         runner.resume("morning", ApprovalDecision::Approve).await?;
//!     }
//!     _ => {}
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## The branch and the approval gate
//!
//! The branch is evaluated immediately after detection: the alert path is
//! taken iff `anomaly_count > threshold` (strict; default threshold 3).
//! Exactly one of alert/classification is populated per run. On the alert
//! path the run suspends with [`state::RunStatus::AwaitingApproval`] until
//! [`runner::PipelineRunner::resume`] supplies the operator decision; a
//! rejected alert still completes the run, marked unconfirmed.
//!
//! ## Module Guide
//!
//! - [`reading`] - Sample types and parsing rules
//! - [`state`] - The run state record and its invariants
//! - [`steps`] - The step trait and the six step implementations
//! - [`pipeline`] - Topology, routing, and state merging
//! - [`runner`] - Run lifecycle, suspension, resume
//! - [`checkpoint`] - Persistence of suspended/finished runs
//! - [`llm`] - Language-model service client
//! - [`events`] - Step progress events for dashboards
//! - [`config`] - Documented constants and env overrides

pub mod checkpoint;
#[cfg(feature = "sqlite")]
pub mod checkpoint_sqlite;
pub mod config;
pub mod events;
pub mod llm;
pub mod pipeline;
pub mod reading;
pub mod runner;
pub mod state;
pub mod steps;
pub mod telemetry;
pub mod types;

pub use config::PipelineConfig;
pub use pipeline::Pipeline;
pub use runner::{PipelineError, PipelineRunner, RunInit};
pub use state::{ApprovalDecision, PipelineState, RunStatus};
