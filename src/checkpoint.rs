//! Checkpoint persistence for suspended and finished runs.
//!
//! The approval gate is a durable state transition, not a blocked thread: the
//! runner saves a [`Checkpoint`] whenever a run suspends (and after every step
//! when autosave is on), and a later runner instance — possibly in another
//! process — restores it through [`Checkpointer::load_latest`] and resumes.
//!
//! [`InMemoryCheckpointer`] is the volatile default; a SQLite-backed
//! `SqliteCheckpointer` is available behind the `sqlite` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::state::PipelineState;
use crate::types::StepKind;

/// Serde-friendly snapshot of one run.
///
/// `cursor` is the encoded [`StepKind`] of the last completed step (`None`
/// before the first step), which together with the state's status fully
/// determines where execution picks up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    /// Superstep counter at save time.
    pub step: u64,
    /// Encoded last-completed step, if any.
    pub cursor: Option<String>,
    pub state: PipelineState,
    /// RFC 3339 creation time.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        step: u64,
        cursor: Option<StepKind>,
        state: PipelineState,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step,
            cursor: cursor.map(|k| k.encode().to_string()),
            state,
            created_at: Utc::now(),
        }
    }

    /// Decode the cursor back into a [`StepKind`].
    ///
    /// Errors on an unknown encoding so corrupt checkpoints are surfaced
    /// instead of silently restarting the run.
    pub fn decode_cursor(&self) -> Result<Option<StepKind>, CheckpointerError> {
        match &self.cursor {
            None => Ok(None),
            Some(encoded) => StepKind::decode(encoded).map(Some).ok_or_else(|| {
                CheckpointerError::Corrupt {
                    message: format!("unknown step cursor: {encoded}"),
                }
            }),
        }
    }
}

/// Pluggable persistence backend.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist a checkpoint, replacing any previous one for the same run.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Load the latest checkpoint for a run, if any.
    async fn load_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// Run ids with a stored checkpoint.
    async fn list_runs(&self) -> Result<Vec<String>, CheckpointerError>;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(aerosense::checkpoint::backend))]
    Backend { message: String },

    #[error("checkpoint serialization failed: {source}")]
    #[diagnostic(code(aerosense::checkpoint::serde))]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    #[error("stored checkpoint is corrupt: {message}")]
    #[diagnostic(
        code(aerosense::checkpoint::corrupt),
        help("The run cannot be restored; discard it and start a fresh run.")
    )]
    Corrupt { message: String },
}

/// Volatile checkpointer for development and tests.
///
/// Keeps the latest checkpoint per run id behind an async `RwLock`; sharing
/// the instance (it is typically held in an `Arc`) across runner instances is
/// what the restore tests exercise.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    store: RwLock<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.store
            .write()
            .await
            .insert(checkpoint.run_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        Ok(self.store.read().await.get(run_id).cloned())
    }

    async fn list_runs(&self) -> Result<Vec<String>, CheckpointerError> {
        let mut runs: Vec<String> = self.store.read().await.keys().cloned().collect();
        runs.sort();
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_replaces_previous() {
        let cp = InMemoryCheckpointer::new();
        let state = PipelineState::new(vec![], 3);
        cp.save(Checkpoint::new("run", 1, Some(StepKind::Validate), state.clone()))
            .await
            .unwrap();
        cp.save(Checkpoint::new("run", 2, Some(StepKind::Detect), state))
            .await
            .unwrap();

        let latest = cp.load_latest("run").await.unwrap().unwrap();
        assert_eq!(latest.step, 2);
        assert_eq!(latest.decode_cursor().unwrap(), Some(StepKind::Detect));
        assert_eq!(cp.list_runs().await.unwrap(), vec!["run".to_string()]);
    }

    #[tokio::test]
    async fn unknown_run_is_none() {
        let cp = InMemoryCheckpointer::new();
        assert!(cp.load_latest("missing").await.unwrap().is_none());
    }

    #[test]
    fn corrupt_cursor_is_surfaced() {
        let checkpoint = Checkpoint {
            run_id: "run".into(),
            step: 1,
            cursor: Some("mystery_step".into()),
            state: PipelineState::new(vec![], 3),
            created_at: Utc::now(),
        };
        assert!(matches!(
            checkpoint.decode_cursor(),
            Err(CheckpointerError::Corrupt { .. })
        ));
    }
}
