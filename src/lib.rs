#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Single-Step Batch

 A toolkit for building single-step batch jobs: declare a job through
 configuration properties, wire an item reader and writer, and run the whole
 thing as a tracked task execution.

 ## Core Concepts

 Understanding these core components will help you get started:

 - **Job:** Represents the entire batch process. Here a `Job` is composed of
   exactly one `Step`, built from a set of properties.
 - **Step:** Encapsulates the chunk-oriented read/process/write loop of the
   job. Items are read one at a time and written in chunks.
 - **ItemReader:** An abstraction that represents the retrieval of input for
   a `Step`, one item at a time. The flat-file reader decodes delimited and
   fixed-width text files into records.
 - **ItemProcessor:** An abstraction that represents the business logic of
   processing an item. When none is configured, items pass through unchanged.
 - **ItemWriter:** An abstraction that represents the output of a `Step`,
   one chunk of items at a time.
 - **TaskExecution:** The tracked lifecycle of one job run, recorded in a
   `TaskRepository` with start time, end time and exit status.

 ## Features

 The crate is modular, allowing you to enable only the features you need:

 | **Feature** | **Description**                                           |
 |-------------|-----------------------------------------------------------|
 | rdbc-sqlite | Enables a `TaskRepository` persisted in a SQLite database |
 | logger      | Enables a logger `ItemWriter`, useful for debugging       |
 | full        | Enables all available features                            |

 ## Getting Started

```rust
use std::collections::HashMap;

use single_step_batch::{
    config::SingleStepJobProperties,
    core::single_step::SingleStepJobBuilder,
    error::BatchError,
    item::support::{ListItemReader, ListItemWriter},
    task::{MapTaskRepository, TaskJobLauncher, TaskRepository},
};

fn main() -> Result<(), BatchError> {
    let properties = SingleStepJobProperties {
        job_name: Some("import".to_string()),
        step_name: Some("step1".to_string()),
        chunk_size: Some(2),
    };

    let items: Vec<HashMap<String, String>> = (1..=3)
        .map(|i| HashMap::from([("id".to_string(), i.to_string())]))
        .collect();
    let reader = ListItemReader::new(items);
    let writer = ListItemWriter::new();

    let job = SingleStepJobBuilder::new(&properties)?
        .reader(&reader)
        .writer(&writer)
        .build()?;

    let repository = MapTaskRepository::new();
    let launcher = TaskJobLauncher::new(&repository);

    let execution = launcher.launch(&job, &[])?;

    assert_eq!(execution.exit_code, Some(0));
    assert_eq!(writer.len(), 3);

    Ok(())
}
```
 */

/// Configuration properties deserialized from the environment
pub mod config;

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of item readers / writers (for example: the flat-file reader)
pub mod item;

/// Task execution tracking: repositories and the job launcher
pub mod task;
