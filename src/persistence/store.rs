//! SQLite-based persistence store

use crate::core::{ExecutionStatus, TriggerKind};
use crate::persistence::{ExecutionSummary, JobSummary, PersistenceBackend};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT id, pipeline_name, trigger, status, started_at, completed_at, \
     total_jobs, succeeded_jobs, failed_jobs, jobs FROM executions";

/// SQLite execution store
pub struct SqliteExecutionStore {
    pool: SqlitePool,
}

impl SqliteExecutionStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn new(db_path: &Path) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
            .await
            .with_context(|| format!("Failed to open history database {}", db_path.display()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("cirun");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        Self::new(&db_dir.join("runs.db")).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                pipeline_name TEXT NOT NULL,
                trigger TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                total_jobs INTEGER NOT NULL DEFAULT 0,
                succeeded_jobs INTEGER NOT NULL DEFAULT 0,
                failed_jobs INTEGER NOT NULL DEFAULT 0,
                jobs TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_pipeline_name ON executions(pipeline_name);
            CREATE INDEX IF NOT EXISTS idx_started_at ON executions(started_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize history schema")?;

        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn from_row(row: &SqliteRow) -> Result<ExecutionSummary> {
        let status: String = row.get("status");
        let trigger: String = row.get("trigger");
        let jobs: String = row.get("jobs");

        Ok(ExecutionSummary {
            execution_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            pipeline_name: row.get("pipeline_name"),
            trigger: trigger.parse::<TriggerKind>()?,
            status: status
                .parse::<ExecutionStatus>()
                .map_err(|e| anyhow!("{}", e))?,
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: row
                .get::<Option<NaiveDateTime>, _>("completed_at")
                .map(Self::from_naive),
            total_jobs: row.get::<i64, _>("total_jobs") as usize,
            succeeded_jobs: row.get::<i64, _>("succeeded_jobs") as usize,
            failed_jobs: row.get::<i64, _>("failed_jobs") as usize,
            jobs: serde_json::from_str::<Vec<JobSummary>>(&jobs)
                .context("Corrupt job summary column")?,
        })
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteExecutionStore {
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO executions
            (id, pipeline_name, trigger, status, started_at, completed_at,
             total_jobs, succeeded_jobs, failed_jobs, jobs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(execution.execution_id.to_string())
        .bind(&execution.pipeline_name)
        .bind(execution.trigger.as_str())
        .bind(execution.status.as_str())
        .bind(Self::to_naive(execution.started_at))
        .bind(execution.completed_at.map(Self::to_naive))
        .bind(execution.total_jobs as i64)
        .bind(execution.succeeded_jobs as i64)
        .bind(execution.failed_jobs as i64)
        .bind(serde_json::to_string(&execution.jobs)?)
        .execute(&self.pool)
        .await
        .context("Failed to save execution")?;

        Ok(())
    }

    async fn load_execution(&self, execution_id: Uuid) -> Result<Option<ExecutionSummary>> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(execution_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load execution")?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>> {
        let rows = sqlx::query(&format!(
            "{} WHERE pipeline_name = ?1 ORDER BY started_at DESC",
            SELECT_COLUMNS
        ))
        .bind(pipeline_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list executions")?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionSummary>> {
        let rows = sqlx::query(&format!("{} ORDER BY started_at DESC LIMIT ?1", SELECT_COLUMNS))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list recent executions")?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT pipeline_name
            FROM executions
            ORDER BY pipeline_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pipelines")?;

        Ok(rows.iter().map(|row| row.get("pipeline_name")).collect())
    }
}
