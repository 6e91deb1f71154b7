use crate::error::BatchError;

/// Result of a single read attempt.
///
/// - `Ok(Some(item))` — an item was read
/// - `Ok(None)` — the input is exhausted
/// - `Err(error)` — the item could not be read
pub type ItemReaderResult<T> = Result<Option<T>, BatchError>;

/// Result of processing a single item.
pub type ItemProcessorResult<T> = Result<T, BatchError>;

/// Result of writing a chunk of items.
pub type ItemWriterResult = Result<(), BatchError>;

/// Retrieval of input for a step, one item at a time.
///
/// Implementations are forward-only: once `read` returns `Ok(None)` the
/// source is exhausted and subsequent calls keep returning `Ok(None)`.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// Business logic applied to each item between reading and writing.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// Output of a step, one chunk of items at a time.
///
/// `open`, `flush` and `close` have no-op defaults; writers backed by
/// buffered resources override them.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Identity processor used when a step is built without an explicit one.
#[derive(Default)]
pub struct PassThroughProcessor;

impl<I: Clone> ItemProcessor<I, I> for PassThroughProcessor {
    fn process(&self, item: &I) -> ItemProcessorResult<I> {
        Ok(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_processor_returns_item_unchanged() {
        let processor = PassThroughProcessor;
        let item = "foo".to_string();
        assert_eq!(processor.process(&item).unwrap(), "foo");
    }
}
