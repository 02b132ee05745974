//! SQLite-backed checkpointer (feature `sqlite`).
//!
//! Keeps the latest checkpoint per run id in a single `runs` table; the
//! schema is created on connect, so callers only supply a database URL
//! (e.g. `sqlite://aerosense.db?mode=rwc` or `sqlite::memory:`).
//!
//! Storage stays bounded: one row per run, overwritten on every save. The
//! serialized [`PipelineState`] travels as a JSON document, so schema churn
//! in the state maps to serde defaults rather than migrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::checkpoint::{Checkpoint, Checkpointer, CheckpointerError};
use crate::state::PipelineState;

pub struct SqliteCheckpointer {
    pool: SqlitePool,
}

impl SqliteCheckpointer {
    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, CheckpointerError> {
        let pool = SqlitePool::connect(url).await.map_err(backend)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS runs (
                run_id     TEXT PRIMARY KEY,
                step       INTEGER NOT NULL,
                cursor     TEXT,
                state_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(backend)?;
        Ok(Self { pool })
    }
}

fn backend(e: sqlx::Error) -> CheckpointerError {
    CheckpointerError::Backend {
        message: e.to_string(),
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let state_json = serde_json::to_string(&checkpoint.state)?;
        sqlx::query(
            "INSERT INTO runs (run_id, step, cursor, state_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(run_id) DO UPDATE SET
                 step = excluded.step,
                 cursor = excluded.cursor,
                 state_json = excluded.state_json,
                 created_at = excluded.created_at",
        )
        .bind(&checkpoint.run_id)
        .bind(checkpoint.step as i64)
        .bind(&checkpoint.cursor)
        .bind(state_json)
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn load_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        let row = sqlx::query(
            "SELECT run_id, step, cursor, state_json, created_at FROM runs WHERE run_id = ?1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state: PipelineState = serde_json::from_str(row.get::<&str, _>("state_json"))?;
        let created_at = DateTime::parse_from_rfc3339(row.get::<&str, _>("created_at"))
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CheckpointerError::Corrupt {
                message: format!("bad created_at: {e}"),
            })?;

        Ok(Some(Checkpoint {
            run_id: row.get::<String, _>("run_id"),
            step: row.get::<i64, _>("step") as u64,
            cursor: row.get::<Option<String>, _>("cursor"),
            state,
            created_at,
        }))
    }

    async fn list_runs(&self) -> Result<Vec<String>, CheckpointerError> {
        let rows = sqlx::query("SELECT run_id FROM runs ORDER BY run_id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("run_id"))
            .collect())
    }
}
