use std::cell::RefCell;
use std::collections::VecDeque;

use crate::{
    BatchError,
    core::item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult},
};

/// An item reader backed by an in-memory list.
///
/// Items are handed out in insertion order until the list is exhausted.
/// Useful for tests and for jobs whose input is assembled up front.
pub struct ListItemReader<T> {
    items: RefCell<VecDeque<T>>,
}

impl<T> ListItemReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items.into()),
        }
    }
}

impl<T> ItemReader<T> for ListItemReader<T> {
    fn read(&self) -> ItemReaderResult<T> {
        Ok(self.items.borrow_mut().pop_front())
    }
}

/// An item writer that captures everything written to it.
///
/// The captured items are available through [`ListItemWriter::written_items`]
/// after the job completes.
pub struct ListItemWriter<T> {
    written: RefCell<Vec<T>>,
}

impl<T> ListItemWriter<T> {
    pub fn new() -> Self {
        Self {
            written: RefCell::new(Vec::new()),
        }
    }

    /// Number of items written so far.
    pub fn len(&self) -> usize {
        self.written.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.borrow().is_empty()
    }
}

impl<T> Default for ListItemWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ListItemWriter<T> {
    /// Snapshot of the items written so far, in write order.
    pub fn written_items(&self) -> Vec<T> {
        self.written.borrow().clone()
    }
}

impl<T: Clone> ItemWriter<T> for ListItemWriter<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.written.borrow_mut().extend_from_slice(items);
        Ok(())
    }
}

/// An item reader that always fails; useful for error-path tests.
pub struct FailingItemReader {
    message: String,
}

impl FailingItemReader {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl<T> ItemReader<T> for FailingItemReader {
    fn read(&self) -> ItemReaderResult<T> {
        Err(BatchError::ItemReader(self.message.clone()))
    }
}
