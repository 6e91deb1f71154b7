/// Flat-file item reader: tokenizers, line mappers and the restartable
/// file reader.
pub mod flat_file;

#[cfg(feature = "logger")]
/// Logger item writer, useful for debugging purposes.
pub mod logger;

/// In-memory item readers and writers.
pub mod support;
