use log::debug;

use crate::{
    BatchError,
    config::SingleStepJobProperties,
    core::{
        item::{ItemProcessor, ItemReader, ItemWriter, PassThroughProcessor},
        job::{JobBuilder, JobInstance},
        step::StepBuilder,
    },
};

/// Builds a job made of exactly one chunk-oriented step from a set of
/// [`SingleStepJobProperties`].
///
/// The properties are validated when the builder is constructed, before any
/// component is wired: a builder is never obtained from an invalid
/// configuration. Validation is fail-fast and the first violation wins, in
/// this order: job name, step name, chunk size presence, chunk size
/// positivity.
///
/// # Examples
///
/// ```
/// use single_step_batch::config::SingleStepJobProperties;
/// use single_step_batch::core::single_step::SingleStepJobBuilder;
/// use single_step_batch::core::job::Job;
/// use single_step_batch::item::support::{ListItemReader, ListItemWriter};
///
/// let properties = SingleStepJobProperties {
///     job_name: Some("import".to_string()),
///     step_name: Some("step1".to_string()),
///     chunk_size: Some(5),
/// };
///
/// let reader = ListItemReader::new(vec!["foo".to_string(), "bar".to_string()]);
/// let writer: ListItemWriter<String> = ListItemWriter::new();
///
/// let job = SingleStepJobBuilder::new(&properties)
///     .unwrap()
///     .reader(&reader)
///     .writer(&writer)
///     .build()
///     .unwrap();
///
/// assert!(job.run().is_ok());
/// assert_eq!(writer.written_items().len(), 2);
/// ```
pub struct SingleStepJobBuilder<'a, I, O> {
    job_name: String,
    step_name: String,
    chunk_size: usize,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
}

impl<'a, I, O> SingleStepJobBuilder<'a, I, O> {
    /// Validates `properties` and returns a builder for them.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Configuration` with the exact violation message
    /// when the job name, step name or chunk size is missing, or when the
    /// chunk size is not greater than zero.
    pub fn new(properties: &SingleStepJobProperties) -> Result<Self, BatchError> {
        let job_name = properties
            .job_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BatchError::Configuration("A job name is required".to_string()))?;

        let step_name = properties
            .step_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BatchError::Configuration("A step name is required".to_string()))?;

        let chunk_size = properties
            .chunk_size
            .ok_or_else(|| BatchError::Configuration("A chunk size is required".to_string()))?;

        if chunk_size <= 0 {
            return Err(BatchError::Configuration(
                "A chunk size greater than zero is required".to_string(),
            ));
        }

        debug!(
            "Configuring single-step job {} with step {} and chunk size {}",
            job_name, step_name, chunk_size
        );

        Ok(Self {
            job_name: job_name.to_string(),
            step_name: step_name.to_string(),
            chunk_size: chunk_size as usize,
            reader: None,
            processor: None,
            writer: None,
        })
    }

    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a dyn ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Builds the job: one chunk-oriented step, named per the step name,
    /// wrapped into a job named per the job name.
    pub fn build(self) -> Result<JobInstance<'a>, BatchError>
    where
        PassThroughProcessor: ItemProcessor<I, O>,
        I: 'a,
        O: 'a,
    {
        let reader = self
            .reader
            .ok_or_else(|| BatchError::Configuration("A reader is required".to_string()))?;
        let writer = self
            .writer
            .ok_or_else(|| BatchError::Configuration("A writer is required".to_string()))?;

        let mut step_builder = StepBuilder::new(&self.step_name)
            .chunk::<I, O>(self.chunk_size)
            .reader(reader)
            .writer(writer);

        if let Some(processor) = self.processor {
            step_builder = step_builder.processor(processor);
        }

        let step = step_builder.build()?;

        JobBuilder::new().name(&self.job_name).start(step).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_properties() -> SingleStepJobProperties {
        SingleStepJobProperties {
            job_name: Some("job".to_string()),
            step_name: Some("step1".to_string()),
            chunk_size: Some(5),
        }
    }

    fn message(result: Result<SingleStepJobBuilder<String, String>, BatchError>) -> String {
        match result {
            Err(error) => error.to_string(),
            Ok(_) => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn missing_job_name_is_rejected_first() {
        let properties = SingleStepJobProperties::default();
        assert_eq!(
            message(SingleStepJobBuilder::new(&properties)),
            "A job name is required"
        );
    }

    #[test]
    fn missing_step_name_is_rejected() {
        let properties = SingleStepJobProperties {
            step_name: None,
            ..valid_properties()
        };
        assert_eq!(
            message(SingleStepJobBuilder::new(&properties)),
            "A step name is required"
        );
    }

    #[test]
    fn missing_chunk_size_is_rejected() {
        let properties = SingleStepJobProperties {
            chunk_size: None,
            ..valid_properties()
        };
        assert_eq!(
            message(SingleStepJobBuilder::new(&properties)),
            "A chunk size is required"
        );
    }

    #[test]
    fn non_positive_chunk_size_is_rejected() {
        let properties = SingleStepJobProperties {
            chunk_size: Some(-5),
            ..valid_properties()
        };
        assert_eq!(
            message(SingleStepJobBuilder::new(&properties)),
            "A chunk size greater than zero is required"
        );
    }

    #[test]
    fn empty_job_name_counts_as_missing() {
        let properties = SingleStepJobProperties {
            job_name: Some(String::new()),
            ..valid_properties()
        };
        assert_eq!(
            message(SingleStepJobBuilder::new(&properties)),
            "A job name is required"
        );
    }
}
