//! Flat-file item reading: line decoding, field binding and the
//! restartable file reader.
//!
//! The pieces compose bottom-up: a [`tokenizer::LineTokenizer`] turns one
//! logical line into a [`field_set::FieldSet`], a
//! [`line_mapper::LineMapper`] turns lines into items (by default through a
//! tokenizer), and the [`reader::FlatFileItemReader`] drives skip, comment
//! and record-separator handling over the file.

pub mod field_set;

pub mod line_mapper;

pub mod reader;

pub mod separator;

pub mod tokenizer;

pub use field_set::FieldSet;
pub use line_mapper::{DefaultLineMapper, FieldSetMapper, LineMapper, PassThroughFieldSetMapper};
pub use reader::{FlatFileItemReader, FlatFileItemReaderBuilder, LineCallbackHandler};
pub use separator::{RecordSeparatorPolicy, SimpleRecordSeparatorPolicy};
pub use tokenizer::{DelimitedLineTokenizer, FixedLengthTokenizer, LineTokenizer, Range};
