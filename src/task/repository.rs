use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
};

use chrono::Utc;
use log::debug;

use crate::BatchError;

use super::TaskExecution;

/// Storage contract for task executions.
///
/// A repository creates executions in the running state, completes them
/// exactly once and answers point lookups. Implementations must be safe for
/// concurrent callers.
pub trait TaskRepository: Send + Sync {
    /// Records the start of a task and returns the created execution.
    fn create_task_execution(
        &self,
        arguments: &[String],
    ) -> Result<TaskExecution, BatchError>;

    /// Records the completion of a running task.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::IllegalState` when the execution does not exist
    /// or has already completed.
    fn complete_task_execution(
        &self,
        execution_id: i64,
        exit_code: i32,
        exit_message: Option<&str>,
    ) -> Result<TaskExecution, BatchError>;

    /// Returns a snapshot of the execution with the given id, if any.
    fn find_task_execution(
        &self,
        execution_id: i64,
    ) -> Result<Option<TaskExecution>, BatchError>;

    /// Returns snapshots of all executions that have not completed.
    fn find_running_executions(&self) -> Result<Vec<TaskExecution>, BatchError>;
}

/// In-memory repository backed by a process-lifetime map.
///
/// Intended for tests and deployments without a datastore. Creates and
/// completions are serialized behind a mutex, so concurrent callers always
/// observe consistent snapshots and read their own writes.
pub struct MapTaskRepository {
    executions: Mutex<HashMap<i64, TaskExecution>>,
    next_execution_id: AtomicI64,
}

impl MapTaskRepository {
    pub fn new() -> Self {
        Self {
            executions: Mutex::new(HashMap::new()),
            next_execution_id: AtomicI64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, TaskExecution>> {
        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MapTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRepository for MapTaskRepository {
    fn create_task_execution(
        &self,
        arguments: &[String],
    ) -> Result<TaskExecution, BatchError> {
        let execution_id = self.next_execution_id.fetch_add(1, Ordering::SeqCst);

        let execution = TaskExecution {
            execution_id,
            parent_execution_id: None,
            external_execution_id: None,
            start_time: Utc::now(),
            end_time: None,
            exit_code: None,
            exit_message: None,
            arguments: arguments.to_vec(),
        };

        debug!("Created task execution {}", execution_id);

        self.lock().insert(execution_id, execution.clone());
        Ok(execution)
    }

    fn complete_task_execution(
        &self,
        execution_id: i64,
        exit_code: i32,
        exit_message: Option<&str>,
    ) -> Result<TaskExecution, BatchError> {
        let mut executions = self.lock();

        let execution = executions.get_mut(&execution_id).ok_or_else(|| {
            BatchError::IllegalState(format!(
                "Task execution {execution_id} does not exist"
            ))
        })?;

        if execution.end_time.is_some() {
            return Err(BatchError::IllegalState(format!(
                "Task execution {execution_id} has already completed"
            )));
        }

        execution.end_time = Some(Utc::now());
        execution.exit_code = Some(exit_code);
        execution.exit_message = exit_message.map(str::to_string);

        debug!(
            "Completed task execution {} with exit code {}",
            execution_id, exit_code
        );

        Ok(execution.clone())
    }

    fn find_task_execution(
        &self,
        execution_id: i64,
    ) -> Result<Option<TaskExecution>, BatchError> {
        Ok(self.lock().get(&execution_id).cloned())
    }

    fn find_running_executions(&self) -> Result<Vec<TaskExecution>, BatchError> {
        Ok(self
            .lock()
            .values()
            .filter(|execution| execution.is_running())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn execution_lifecycle_is_create_then_complete_once() {
        let repository = MapTaskRepository::new();

        let created = repository
            .create_task_execution(&["--input=data.csv".to_string()])
            .unwrap();
        assert!(created.is_running());
        assert!(created.end_time.is_none());

        let found = repository
            .find_task_execution(created.execution_id)
            .unwrap()
            .expect("execution should be findable");
        assert_eq!(found, created);

        let completed = repository
            .complete_task_execution(created.execution_id, 0, Some("COMPLETED"))
            .unwrap();
        assert!(completed.end_time.is_some());
        assert_eq!(completed.exit_code, Some(0));
        assert_eq!(completed.exit_message.as_deref(), Some("COMPLETED"));

        // A completed execution is terminal.
        let second = repository.complete_task_execution(created.execution_id, 0, None);
        assert!(matches!(second, Err(BatchError::IllegalState(_))));
    }

    #[test]
    fn completing_an_unknown_execution_fails() {
        let repository = MapTaskRepository::new();
        let result = repository.complete_task_execution(42, 0, None);
        assert!(matches!(result, Err(BatchError::IllegalState(_))));
    }

    #[test]
    fn find_running_reports_only_open_executions() {
        let repository = MapTaskRepository::new();

        let first = repository.create_task_execution(&[]).unwrap();
        let second = repository.create_task_execution(&[]).unwrap();
        assert_eq!(repository.find_running_executions().unwrap().len(), 2);

        repository
            .complete_task_execution(first.execution_id, 0, None)
            .unwrap();

        let running = repository.find_running_executions().unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].execution_id, second.execution_id);
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let repository = Arc::new(MapTaskRepository::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repository = Arc::clone(&repository);
                std::thread::spawn(move || {
                    repository.create_task_execution(&[]).unwrap().execution_id
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
