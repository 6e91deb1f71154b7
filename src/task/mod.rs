//! Task execution tracking.
//!
//! A task execution records the lifecycle of one tracked run: it is created
//! when the task starts (start time set, end time empty) and completed
//! exactly once with an exit code and message. Repositories own the
//! canonical state; callers only ever see snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod launcher;

#[cfg(feature = "rdbc-sqlite")]
pub mod rdbc;

pub mod repository;

pub use launcher::TaskJobLauncher;
#[cfg(feature = "rdbc-sqlite")]
pub use rdbc::SqliteTaskRepository;
pub use repository::{MapTaskRepository, TaskRepository};

/// Snapshot of one tracked task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecution {
    /// Identifier assigned by the repository at creation
    pub execution_id: i64,
    /// Identifier of the execution that spawned this one, if any
    pub parent_execution_id: Option<i64>,
    /// Identifier assigned by an external platform, if any
    pub external_execution_id: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Empty until the execution completes
    pub end_time: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub exit_message: Option<String>,
    /// Arguments the task was started with
    pub arguments: Vec<String>,
}

impl TaskExecution {
    /// True while the execution has not reached its terminal state.
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }
}
