use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{
    Pool, Row, Sqlite,
    sqlite::{SqlitePoolOptions, SqliteRow},
};
use tokio::runtime::{Builder, Runtime};

use crate::BatchError;

use super::{TaskExecution, TaskRepository};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS task_execution (
    execution_id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_execution_id INTEGER,
    external_execution_id TEXT,
    start_time TEXT NOT NULL,
    end_time TEXT,
    exit_code INTEGER,
    exit_message TEXT,
    arguments TEXT NOT NULL
)"#;

/// Task repository persisted in a SQLite database.
///
/// Operations run on an internal Tokio runtime so callers stay synchronous.
/// The pool is capped at a single connection, which keeps in-memory
/// databases alive for the lifetime of the repository.
pub struct SqliteTaskRepository {
    pool: Pool<Sqlite>,
    runtime: Runtime,
}

impl SqliteTaskRepository {
    /// Connects to the database at `url` and bootstraps the
    /// `task_execution` table.
    pub fn connect(url: &str) -> Result<Self, BatchError> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|error| BatchError::TaskRepository(error.to_string()))?;

        let pool = runtime.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await
                .map_err(map_sqlx_error)?;
            sqlx::query(CREATE_TABLE)
                .execute(&pool)
                .await
                .map_err(map_sqlx_error)?;
            Ok::<_, BatchError>(pool)
        })?;

        debug!("Connected task repository to {}", url);

        Ok(Self { pool, runtime })
    }

    fn fetch_execution(
        &self,
        execution_id: i64,
    ) -> Result<Option<TaskExecution>, BatchError> {
        self.runtime.block_on(async {
            let row = sqlx::query(
                "SELECT execution_id, parent_execution_id, external_execution_id, \
                 start_time, end_time, exit_code, exit_message, arguments \
                 FROM task_execution WHERE execution_id = ?",
            )
            .bind(execution_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            row.map(row_to_execution).transpose()
        })
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn create_task_execution(
        &self,
        arguments: &[String],
    ) -> Result<TaskExecution, BatchError> {
        let start_time = Utc::now();
        let encoded_arguments = serde_json::to_string(arguments)
            .map_err(|error| BatchError::TaskRepository(error.to_string()))?;

        let execution_id = self.runtime.block_on(async {
            let result = sqlx::query(
                "INSERT INTO task_execution (start_time, arguments) VALUES (?, ?)",
            )
            .bind(start_time.to_rfc3339())
            .bind(&encoded_arguments)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            Ok::<_, BatchError>(result.last_insert_rowid())
        })?;

        debug!("Created task execution {}", execution_id);

        Ok(TaskExecution {
            execution_id,
            parent_execution_id: None,
            external_execution_id: None,
            start_time,
            end_time: None,
            exit_code: None,
            exit_message: None,
            arguments: arguments.to_vec(),
        })
    }

    fn complete_task_execution(
        &self,
        execution_id: i64,
        exit_code: i32,
        exit_message: Option<&str>,
    ) -> Result<TaskExecution, BatchError> {
        let execution = self.fetch_execution(execution_id)?.ok_or_else(|| {
            BatchError::IllegalState(format!(
                "Task execution {execution_id} does not exist"
            ))
        })?;

        let end_time = Utc::now();

        // Completion must be atomic: the end_time guard lives in the UPDATE
        // itself so concurrent completers cannot both pass a prior check and
        // overwrite the terminal state.
        let rows_affected = self.runtime.block_on(async {
            let result = sqlx::query(
                "UPDATE task_execution SET end_time = ?, exit_code = ?, \
                 exit_message = ? WHERE execution_id = ? AND end_time IS NULL",
            )
            .bind(end_time.to_rfc3339())
            .bind(exit_code)
            .bind(exit_message)
            .bind(execution_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            Ok::<_, BatchError>(result.rows_affected())
        })?;

        if rows_affected == 0 {
            return Err(BatchError::IllegalState(format!(
                "Task execution {execution_id} has already completed"
            )));
        }

        debug!(
            "Completed task execution {} with exit code {}",
            execution_id, exit_code
        );

        Ok(TaskExecution {
            end_time: Some(end_time),
            exit_code: Some(exit_code),
            exit_message: exit_message.map(str::to_string),
            ..execution
        })
    }

    fn find_task_execution(
        &self,
        execution_id: i64,
    ) -> Result<Option<TaskExecution>, BatchError> {
        self.fetch_execution(execution_id)
    }

    fn find_running_executions(&self) -> Result<Vec<TaskExecution>, BatchError> {
        self.runtime.block_on(async {
            let rows = sqlx::query(
                "SELECT execution_id, parent_execution_id, external_execution_id, \
                 start_time, end_time, exit_code, exit_message, arguments \
                 FROM task_execution WHERE end_time IS NULL ORDER BY execution_id",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            rows.into_iter().map(row_to_execution).collect()
        })
    }
}

fn map_sqlx_error(error: sqlx::Error) -> BatchError {
    BatchError::TaskRepository(error.to_string())
}

fn row_to_execution(row: SqliteRow) -> Result<TaskExecution, BatchError> {
    let start_time: String = row.get("start_time");
    let end_time: Option<String> = row.get("end_time");
    let arguments: String = row.get("arguments");

    Ok(TaskExecution {
        execution_id: row.get("execution_id"),
        parent_execution_id: row.get("parent_execution_id"),
        external_execution_id: row.get("external_execution_id"),
        start_time: parse_timestamp(&start_time)?,
        end_time: end_time.as_deref().map(parse_timestamp).transpose()?,
        exit_code: row.get("exit_code"),
        exit_message: row.get("exit_message"),
        arguments: serde_json::from_str(&arguments)
            .map_err(|error| BatchError::TaskRepository(error.to_string()))?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, BatchError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| BatchError::TaskRepository(error.to_string()))
}
