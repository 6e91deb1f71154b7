use log::{error, info};

use crate::{BatchError, core::job::Job};

use super::{TaskExecution, TaskRepository};

/// Runs a job while tracking it as a task execution.
///
/// The launcher records the start in the repository, runs the job to
/// completion on the calling thread and records the terminal state before
/// returning. A successful job completes with exit code 0; a failed job
/// completes with exit code 1 and the error message, and the job error is
/// returned to the caller.
pub struct TaskJobLauncher<'a> {
    repository: &'a dyn TaskRepository,
}

impl<'a> TaskJobLauncher<'a> {
    pub fn new(repository: &'a dyn TaskRepository) -> Self {
        Self { repository }
    }

    /// Runs the job and returns the terminal task execution.
    ///
    /// # Errors
    ///
    /// Returns the job error when the job fails, or a repository error when
    /// the execution cannot be recorded.
    pub fn launch(
        &self,
        job: &dyn Job,
        arguments: &[String],
    ) -> Result<TaskExecution, BatchError> {
        let execution = self.repository.create_task_execution(arguments)?;

        info!("Launching task execution {}", execution.execution_id);

        match job.run() {
            Ok(_) => {
                let completed = self.repository.complete_task_execution(
                    execution.execution_id,
                    0,
                    Some("COMPLETED"),
                )?;
                info!("Task execution {} completed", completed.execution_id);
                Ok(completed)
            }
            Err(job_error) => {
                // The job error takes precedence over a recording failure.
                if let Err(repository_error) = self.repository.complete_task_execution(
                    execution.execution_id,
                    1,
                    Some(&job_error.to_string()),
                ) {
                    error!(
                        "Failed to record failure of task execution {}: {}",
                        execution.execution_id, repository_error
                    );
                }
                error!(
                    "Task execution {} failed: {}",
                    execution.execution_id, job_error
                );
                Err(job_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{
        config::SingleStepJobProperties,
        core::single_step::SingleStepJobBuilder,
        item::support::{FailingItemReader, ListItemReader, ListItemWriter},
        task::MapTaskRepository,
    };

    use super::*;

    fn properties() -> SingleStepJobProperties {
        SingleStepJobProperties {
            job_name: Some("job".to_string()),
            step_name: Some("step".to_string()),
            chunk_size: Some(2),
        }
    }

    #[test]
    fn successful_launch_completes_with_exit_code_zero() {
        let items: Vec<HashMap<String, String>> = (0..3)
            .map(|i| HashMap::from([("id".to_string(), i.to_string())]))
            .collect();
        let reader = ListItemReader::new(items);
        let writer = ListItemWriter::new();

        let job = SingleStepJobBuilder::new(&properties())
            .unwrap()
            .reader(&reader)
            .writer(&writer)
            .build()
            .unwrap();

        let repository = MapTaskRepository::new();
        let launcher = TaskJobLauncher::new(&repository);

        let execution = launcher.launch(&job, &["--run".to_string()]).unwrap();

        assert!(!execution.is_running());
        assert_eq!(execution.exit_code, Some(0));
        assert_eq!(execution.exit_message.as_deref(), Some("COMPLETED"));
        assert_eq!(execution.arguments, vec!["--run".to_string()]);
        assert_eq!(writer.len(), 3);
    }

    #[test]
    fn failed_launch_records_exit_code_one_and_returns_the_error() {
        let reader = FailingItemReader::new("input unavailable");
        let writer: ListItemWriter<HashMap<String, String>> = ListItemWriter::new();

        let job = SingleStepJobBuilder::new(&properties())
            .unwrap()
            .reader(&reader)
            .writer(&writer)
            .build()
            .unwrap();

        let repository = MapTaskRepository::new();
        let launcher = TaskJobLauncher::new(&repository);

        let result = launcher.launch(&job, &[]);
        assert!(result.is_err());

        let executions = repository.find_running_executions().unwrap();
        assert!(executions.is_empty());

        let execution = repository.find_task_execution(1).unwrap().unwrap();
        assert_eq!(execution.exit_code, Some(1));
        assert!(execution.exit_message.is_some());
    }
}
