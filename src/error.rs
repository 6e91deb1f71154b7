use thiserror::Error;

/// Errors produced by batch components.
///
/// Configuration problems are reported before any I/O happens; the remaining
/// variants surface while a job is running and abort the current step.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Invalid or missing configuration, detected at construction time.
    #[error("{0}")]
    Configuration(String),

    /// The input resource does not exist and the reader is strict.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Decoded field count does not match the configured field names.
    #[error("Format error: {0}")]
    Format(String),

    /// A line could not be decoded into a record.
    #[error("Parsing error at line {line} of {resource}: {message}")]
    Parse {
        resource: String,
        line: usize,
        message: String,
    },

    /// An operation was attempted on an object in a terminal state.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Error raised by an item reader.
    #[error("ItemReader error: {0}")]
    ItemReader(String),

    /// Error raised by an item writer.
    #[error("ItemWriter error: {0}")]
    ItemWriter(String),

    /// A step failed during execution.
    #[error("Step failed: {0}")]
    Step(String),

    /// Error raised by a task repository backend.
    #[error("TaskRepository error: {0}")]
    TaskRepository(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
