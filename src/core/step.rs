use std::time::{Duration, Instant};

use log::{debug, error, info};
use uuid::Uuid;

use crate::BatchError;

use super::item::{ItemProcessor, ItemReader, ItemWriter};

/// Status of a chunk read from the item reader.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkStatus {
    /// The chunk holds `chunk_size` items; more input may follow.
    Full,
    /// The reader is exhausted; this chunk holds the remaining items, if any.
    Finished,
}

/// Terminal or in-flight status of a step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Starting,
    Success,
    ReadError,
    ProcessorError,
    WriteError,
}

/// Execution details of a single step run.
#[derive(Debug, Clone)]
pub struct StepExecution {
    /// Unique identifier for this execution
    pub id: Uuid,
    /// Name of the executed step
    pub name: String,
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items successfully processed
    pub process_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            read_count: 0,
            process_count: 0,
            write_count: 0,
        }
    }
}

/// An independent phase of a batch job.
pub trait Step {
    fn name(&self) -> &str;

    /// Executes the step, recording counts and status into `step_execution`.
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// A step that reads, processes and writes items in fixed-size chunks.
///
/// The chunk size is fixed for the lifetime of the step and each chunk is
/// forwarded to the writer as one write operation. There is no skip or retry
/// machinery: the first read, process or write error aborts the step and
/// propagates to the caller.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    reader: &'a dyn ItemReader<I>,
    processor: &'a dyn ItemProcessor<I, O>,
    writer: &'a dyn ItemWriter<O>,
    chunk_size: usize,
}

impl<'a, I, O> Step for ChunkOrientedStep<'a, I, O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        self.writer.open()?;

        let result = self.execute_chunks(step_execution);

        // The writer is released on every exit path, including failed chunks.
        if let Err(close_error) = self.writer.close() {
            error!("Error closing writer: {}", close_error);
        }

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        info!(
            "End of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        match result {
            Ok(()) => {
                step_execution.status = StepStatus::Success;
                Ok(())
            }
            Err(error) => {
                error!("Step {} failed: {}", step_execution.name, error);
                Err(error)
            }
        }
    }
}

impl<'a, I, O> ChunkOrientedStep<'a, I, O> {
    fn execute_chunks(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        loop {
            let (items, chunk_status) = self.read_chunk(step_execution)?;

            let processed_items = self.process_chunk(step_execution, &items)?;

            self.write_chunk(step_execution, &processed_items)?;

            if chunk_status == ChunkStatus::Finished {
                return Ok(());
            }
        }
    }

    /// Reads up to `chunk_size` items, stopping early when the reader is
    /// exhausted.
    fn read_chunk(
        &self,
        step_execution: &mut StepExecution,
    ) -> Result<(Vec<I>, ChunkStatus), BatchError> {
        debug!("Start reading chunk");

        let mut items = Vec::with_capacity(self.chunk_size);

        loop {
            match self.reader.read().inspect_err(|_| {
                step_execution.status = StepStatus::ReadError;
            })? {
                Some(item) => {
                    items.push(item);
                    step_execution.read_count += 1;

                    if items.len() == self.chunk_size {
                        debug!("End reading chunk: full");
                        return Ok((items, ChunkStatus::Full));
                    }
                }
                None => {
                    debug!("End reading chunk: finished");
                    return Ok((items, ChunkStatus::Finished));
                }
            }
        }
    }

    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        items: &[I],
    ) -> Result<Vec<O>, BatchError> {
        debug!("Processing chunk of {} items", items.len());

        let mut processed_items = Vec::with_capacity(items.len());

        for item in items {
            let processed = self.processor.process(item).inspect_err(|_| {
                step_execution.status = StepStatus::ProcessorError;
            })?;
            processed_items.push(processed);
            step_execution.process_count += 1;
        }

        Ok(processed_items)
    }

    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        items: &[O],
    ) -> Result<(), BatchError> {
        if items.is_empty() {
            debug!("No items to write, skipping write call");
            return Ok(());
        }

        debug!("Writing chunk of {} items", items.len());

        self.writer.write(items).inspect_err(|_| {
            step_execution.status = StepStatus::WriteError;
        })?;
        self.writer.flush().inspect_err(|_| {
            step_execution.status = StepStatus::WriteError;
        })?;

        step_execution.write_count += items.len();

        Ok(())
    }
}

/// Builder for a [`ChunkOrientedStep`].
pub struct ChunkOrientedStepBuilder<'a, I, O> {
    name: String,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: usize,
}

impl<'a, I, O> ChunkOrientedStepBuilder<'a, I, O> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 10,
        }
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

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError>
    where
        super::item::PassThroughProcessor: ItemProcessor<I, O>,
    {
        let reader = self
            .reader
            .ok_or_else(|| BatchError::Configuration("A reader is required".to_string()))?;
        let writer = self
            .writer
            .ok_or_else(|| BatchError::Configuration("A writer is required".to_string()))?;

        Ok(ChunkOrientedStep {
            name: self.name,
            reader,
            processor: self
                .processor
                .unwrap_or(&super::item::PassThroughProcessor),
            writer,
            chunk_size: self.chunk_size,
        })
    }
}

/// Entry point for building steps, mirroring the `StepBuilder::new(name)`
/// naming convention.
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn chunk<'a, I, O>(self, chunk_size: usize) -> ChunkOrientedStepBuilder<'a, I, O> {
        ChunkOrientedStepBuilder::new(&self.name).chunk_size(chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::core::item::{ItemReaderResult, ItemWriterResult};

    struct CountingReader {
        remaining: RefCell<Vec<i32>>,
    }

    impl ItemReader<i32> for CountingReader {
        fn read(&self) -> ItemReaderResult<i32> {
            Ok(self.remaining.borrow_mut().pop())
        }
    }

    struct CollectingWriter {
        chunks: RefCell<Vec<usize>>,
    }

    impl ItemWriter<i32> for CollectingWriter {
        fn write(&self, items: &[i32]) -> ItemWriterResult {
            self.chunks.borrow_mut().push(items.len());
            Ok(())
        }
    }

    struct FailingWriter;

    impl ItemWriter<i32> for FailingWriter {
        fn write(&self, _items: &[i32]) -> ItemWriterResult {
            Err(BatchError::ItemWriter("sink unavailable".to_string()))
        }
    }

    #[test]
    fn step_writes_items_in_fixed_size_chunks() {
        let reader = CountingReader {
            remaining: RefCell::new((1..=7).rev().collect()),
        };
        let writer = CollectingWriter {
            chunks: RefCell::new(Vec::new()),
        };

        let step = StepBuilder::new("chunked")
            .chunk::<i32, i32>(3)
            .reader(&reader)
            .writer(&writer)
            .build()
            .unwrap();

        let mut execution = StepExecution::new("chunked");
        step.execute(&mut execution).unwrap();

        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.read_count, 7);
        assert_eq!(execution.write_count, 7);
        assert_eq!(*writer.chunks.borrow(), vec![3, 3, 1]);
    }

    #[test]
    fn step_fails_fast_on_write_error() {
        let reader = CountingReader {
            remaining: RefCell::new(vec![3, 2, 1]),
        };
        let writer = FailingWriter;

        let step = StepBuilder::new("failing")
            .chunk::<i32, i32>(2)
            .reader(&reader)
            .writer(&writer)
            .build()
            .unwrap();

        let mut execution = StepExecution::new("failing");
        let result = step.execute(&mut execution);

        assert!(result.is_err());
        assert_eq!(execution.status, StepStatus::WriteError);
        assert_eq!(execution.write_count, 0);
    }

    #[test]
    fn builder_without_reader_is_rejected() {
        let writer = CollectingWriter {
            chunks: RefCell::new(Vec::new()),
        };

        let result = StepBuilder::new("incomplete")
            .chunk::<i32, i32>(2)
            .writer(&writer)
            .build();

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }
}
