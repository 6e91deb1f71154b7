//! Property surface for single-step batch jobs.
//!
//! Properties bind from any `serde` source (JSON documents in practice) and
//! can equally be filled in programmatically. Every field is optional at the
//! binding level; validation happens when the components are built from the
//! properties, not when they are parsed.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration of the job itself: its name, the name of its single step
/// and the chunk size of that step.
///
/// All three values are required to build a job; see
/// [`SingleStepJobBuilder`](crate::core::single_step::SingleStepJobBuilder)
/// for the validation rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SingleStepJobProperties {
    pub job_name: Option<String>,
    pub step_name: Option<String>,
    /// Number of items per chunk. Bound as a signed integer so that
    /// non-positive values reach validation instead of failing to parse.
    pub chunk_size: Option<i64>,
}

/// Configuration of a flat-file item reader.
///
/// `delimited` and `fixed_length` are mutually exclusive format variants;
/// a custom line mapper set on the reader builder bypasses both.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlatFileReaderProperties {
    /// Enables the resumable cursor. When set, `name` is required.
    pub save_state: bool,
    /// Name under which the reader state is saved.
    pub name: Option<String>,
    /// Hard stop after this many items (counting any resumed offset).
    pub max_item_count: Option<usize>,
    /// Number of already-processed items to skip when resuming.
    pub current_item_count: usize,
    /// Prefixes of lines to treat as comments.
    pub comments: Vec<String>,
    /// Path of the input file.
    pub resource: Option<PathBuf>,
    /// When true, a missing resource fails the open; when false the reader
    /// yields an empty sequence.
    pub strict: bool,
    /// Character encoding of the input file.
    pub encoding: Option<String>,
    /// Number of physical lines to skip before any record processing.
    pub lines_to_skip: usize,
    /// Selects the delimited format variant.
    pub delimited: bool,
    pub delimiter: Option<char>,
    pub quote_character: Option<char>,
    /// Zero-based field positions to retain, in order, before name binding.
    pub included_fields: Vec<usize>,
    /// Field names bound positionally to decoded values.
    pub names: Vec<String>,
    /// When true, a decoded-field / name count mismatch is an error.
    pub parsing_strict: bool,
    /// Selects the fixed-width format variant.
    pub fixed_length: bool,
    /// Column ranges for the fixed-width variant, e.g. `"3-4,7-8,11"`.
    pub ranges: Option<String>,
}

impl Default for FlatFileReaderProperties {
    fn default() -> Self {
        Self {
            save_state: true,
            name: None,
            max_item_count: None,
            current_item_count: 0,
            comments: Vec::new(),
            resource: None,
            strict: true,
            encoding: None,
            lines_to_skip: 0,
            delimited: false,
            delimiter: None,
            quote_character: None,
            included_fields: Vec::new(),
            names: Vec::new(),
            parsing_strict: true,
            fixed_length: false,
            ranges: None,
        }
    }
}

/// Top-level binding for a whole job configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatchProperties {
    pub job: SingleStepJobProperties,
    pub reader: FlatFileReaderProperties,
}
