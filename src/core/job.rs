use std::{
    cell::RefCell,
    time::{Duration, Instant},
};

use log::info;
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    step::{Step, StepExecution},
};

/// Type alias for job execution results.
pub type JobResult<T> = Result<T, BatchError>;

/// A named unit of work composed of exactly one step.
///
/// Running a job executes its step and records the step execution details,
/// which remain queryable by step name after the run.
pub trait Job {
    /// Runs the job and returns the result of the job execution.
    fn run(&self) -> JobResult<JobExecution>;

    /// Returns a snapshot of the last execution of the named step, if the
    /// step ran.
    fn step_execution(&self, step_name: &str) -> Option<StepExecution>;
}

/// Timing details of one job run.
#[derive(Debug)]
pub struct JobExecution {
    /// Identifier of the job that produced this execution
    pub job_id: Uuid,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
}

/// A runnable job holding exactly one step.
///
/// Nested or multi-step jobs are unsupported: the builder accepts a single
/// step and the job runs it to completion or error.
pub struct JobInstance<'a> {
    id: Uuid,
    name: String,
    step: Box<dyn Step + 'a>,
    last_step_execution: RefCell<Option<StepExecution>>,
}

impl Job for JobInstance<'_> {
    fn run(&self) -> JobResult<JobExecution> {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut step_execution = StepExecution::new(self.step.name());
        let result = self.step.execute(&mut step_execution);

        self.last_step_execution.replace(Some(step_execution));

        // A failed step aborts the job; the recorded step execution stays
        // available for inspection.
        result?;

        info!("End of job: {}, id: {}", self.name, self.id);

        Ok(JobExecution {
            job_id: self.id,
            start,
            end: Instant::now(),
            duration: start.elapsed(),
        })
    }

    fn step_execution(&self, step_name: &str) -> Option<StepExecution> {
        self.last_step_execution
            .borrow()
            .as_ref()
            .filter(|execution| execution.name == step_name)
            .cloned()
    }
}

impl JobInstance<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Builder for creating a [`JobInstance`].
#[derive(Default)]
pub struct JobBuilder<'a> {
    name: Option<String>,
    step: Option<Box<dyn Step + 'a>>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            step: None,
        }
    }

    /// Sets the name of the job. A random name is generated when absent.
    pub fn name(mut self, name: &str) -> JobBuilder<'a> {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the single step of the job, replacing any previously set step.
    pub fn start(mut self, step: impl Step + 'a) -> JobBuilder<'a> {
        self.step = Some(Box::new(step));
        self
    }

    pub fn build(self) -> Result<JobInstance<'a>, BatchError> {
        let step = self
            .step
            .ok_or_else(|| BatchError::Configuration("A step is required".to_string()))?;

        Ok(JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            step,
            last_step_execution: RefCell::new(None),
        })
    }
}
