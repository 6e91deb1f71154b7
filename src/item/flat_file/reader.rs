use std::{
    cell::RefCell,
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    BatchError,
    config::FlatFileReaderProperties,
    core::item::{ItemReader, ItemReaderResult},
};

use super::{
    field_set::FieldSet,
    line_mapper::{DefaultLineMapper, FieldSetMapper, LineMapper, PassThroughFieldSetMapper},
    separator::RecordSeparatorPolicy,
    tokenizer::{DelimitedLineTokenizer, FixedLengthTokenizer, LineTokenizer, Range},
};

/// Observer invoked with every line the reader passes over without mapping:
/// skipped header lines and comment lines.
pub trait LineCallbackHandler {
    fn handle_line(&self, line: &str);
}

struct OpenState {
    lines: Lines<BufReader<File>>,
    /// 1-based number of the last physical line read
    line_number: usize,
    /// Logical records emitted so far, including any resumed offset
    item_count: usize,
}

enum ReaderState {
    Unopened,
    Open(OpenState),
    /// Exhausted, failed or bounded out; the file handle is released.
    Done,
}

/// A restartable reader for line-oriented files.
///
/// Produces a lazy, forward-only sequence of items: physical lines are
/// skipped (`lines_to_skip`), optionally accumulated into multi-line records
/// by a [`RecordSeparatorPolicy`], filtered against comment prefixes and
/// finally decoded by a [`LineMapper`]. The file handle is opened lazily at
/// the first read and released on every exit path: exhaustion, a reached
/// `max_item_count` bound, or a propagated error.
pub struct FlatFileItemReader<'a, T> {
    name: String,
    resource: PathBuf,
    strict: bool,
    comments: Vec<String>,
    lines_to_skip: usize,
    max_item_count: Option<usize>,
    current_item_count: usize,
    line_mapper: Box<dyn LineMapper<T> + 'a>,
    record_separator_policy: Option<Box<dyn RecordSeparatorPolicy + 'a>>,
    line_callback: Option<&'a dyn LineCallbackHandler>,
    state: RefCell<ReaderState>,
}

impl<'a, T> FlatFileItemReader<'a, T> {
    /// Name under which the reader's cursor state is tracked.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<ReaderState, BatchError> {
        let file = match File::open(&self.resource) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                if self.strict {
                    return Err(BatchError::ResourceNotFound(
                        self.resource.display().to_string(),
                    ));
                }
                warn!(
                    "Input resource {} does not exist; reader {} yields no items",
                    self.resource.display(),
                    self.name
                );
                return Ok(ReaderState::Done);
            }
            Err(error) => return Err(error.into()),
        };

        debug!("Opened {} for reader {}", self.resource.display(), self.name);

        let mut open = OpenState {
            lines: BufReader::new(file).lines(),
            line_number: 0,
            item_count: 0,
        };

        // Physical-line skip happens before any comment or record handling.
        for _ in 0..self.lines_to_skip {
            let Some(line) = self.next_line(&mut open)? else {
                break;
            };
            if let Some(callback) = self.line_callback {
                callback.handle_line(&line);
            }
        }

        // Resume: already-processed records are consumed without mapping.
        for _ in 0..self.current_item_count {
            if self.next_record(&mut open)?.is_none() {
                break;
            }
        }
        open.item_count = self.current_item_count;

        Ok(ReaderState::Open(open))
    }

    fn next_line(&self, open: &mut OpenState) -> Result<Option<String>, BatchError> {
        match open.lines.next().transpose()? {
            Some(line) => {
                open.line_number += 1;
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    /// Produces the next logical record and the physical line number of its
    /// last line. Comment filtering applies to record-leading lines only.
    fn next_record(
        &self,
        open: &mut OpenState,
    ) -> Result<Option<(String, usize)>, BatchError> {
        loop {
            let Some(line) = self.next_line(open)? else {
                return Ok(None);
            };

            if self.is_comment(&line) {
                if let Some(callback) = self.line_callback {
                    callback.handle_line(&line);
                }
                continue;
            }

            let record = match &self.record_separator_policy {
                None => line,
                Some(policy) => {
                    let mut record = line;
                    while !policy.is_end_of_record(&record) {
                        match self.next_line(open)? {
                            Some(next) => {
                                record = policy.pre_process(&record) + &next;
                            }
                            None => break,
                        }
                    }
                    policy.post_process(&record)
                }
            };

            return Ok(Some((record, open.line_number)));
        }
    }

    fn is_comment(&self, line: &str) -> bool {
        self.comments.iter().any(|prefix| line.starts_with(prefix))
    }

    fn map_record(&self, record: &str, line_number: usize) -> Result<T, BatchError> {
        self.line_mapper
            .map_line(record, line_number)
            .map_err(|error| match error {
                // Field-count mismatches keep their identity; anything else
                // becomes a parse error carrying the line position.
                format_error @ BatchError::Format(_) => format_error,
                parse @ BatchError::Parse { .. } => parse,
                other => BatchError::Parse {
                    resource: self.resource.display().to_string(),
                    line: line_number,
                    message: other.to_string(),
                },
            })
    }
}

impl<'a, T> ItemReader<T> for FlatFileItemReader<'a, T> {
    fn read(&self) -> ItemReaderResult<T> {
        let mut state = self.state.borrow_mut();

        if let ReaderState::Unopened = *state {
            *state = match self.open() {
                Ok(opened) => opened,
                Err(error) => {
                    *state = ReaderState::Done;
                    return Err(error);
                }
            };
        }

        let ReaderState::Open(open) = &mut *state else {
            return Ok(None);
        };

        if let Some(max) = self.max_item_count
            && open.item_count >= max
        {
            debug!("Reader {} reached max item count {}", self.name, max);
            *state = ReaderState::Done;
            return Ok(None);
        }

        match self.next_record(open) {
            Ok(Some((record, line_number))) => match self.map_record(&record, line_number) {
                Ok(item) => {
                    open.item_count += 1;
                    Ok(Some(item))
                }
                Err(error) => {
                    *state = ReaderState::Done;
                    Err(error)
                }
            },
            Ok(None) => {
                *state = ReaderState::Done;
                Ok(None)
            }
            Err(error) => {
                *state = ReaderState::Done;
                Err(error)
            }
        }
    }
}

/// Builder for a [`FlatFileItemReader`].
///
/// The format variant is chosen once, at build time: `delimited()` and
/// `fixed_length()` are mutually exclusive, and a custom [`LineMapper`]
/// overrides both.
pub struct FlatFileItemReaderBuilder<'a, T> {
    name: Option<String>,
    resource: Option<PathBuf>,
    encoding: Option<String>,
    save_state: bool,
    strict: bool,
    parsing_strict: bool,
    comments: Vec<String>,
    lines_to_skip: usize,
    max_item_count: Option<usize>,
    current_item_count: usize,
    delimited: bool,
    delimiter: Option<char>,
    quote_character: Option<char>,
    included_fields: Option<Vec<usize>>,
    names: Vec<String>,
    fixed_length: bool,
    ranges: Option<String>,
    line_mapper: Option<Box<dyn LineMapper<T> + 'a>>,
    field_set_mapper: Option<Box<dyn FieldSetMapper<T> + 'a>>,
    record_separator_policy: Option<Box<dyn RecordSeparatorPolicy + 'a>>,
    line_callback: Option<&'a dyn LineCallbackHandler>,
}

impl<'a, T: 'a> Default for FlatFileItemReaderBuilder<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> FlatFileItemReaderBuilder<'a, FieldSet> {
    /// Preconfigures a builder from bound properties, producing field sets
    /// as items. Callbacks, separator policies or a custom line mapper can
    /// still be attached before `build`.
    pub fn from_properties(properties: &FlatFileReaderProperties) -> Self {
        Self::new()
            .apply_properties(properties)
            .field_set_mapper(Box::new(PassThroughFieldSetMapper))
    }
}

impl<'a, T: 'a> FlatFileItemReaderBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            name: None,
            resource: None,
            encoding: None,
            save_state: true,
            strict: true,
            parsing_strict: true,
            comments: Vec::new(),
            lines_to_skip: 0,
            max_item_count: None,
            current_item_count: 0,
            delimited: false,
            delimiter: None,
            quote_character: None,
            included_fields: None,
            names: Vec::new(),
            fixed_length: false,
            ranges: None,
            line_mapper: None,
            field_set_mapper: None,
            record_separator_policy: None,
            line_callback: None,
        }
    }

    /// Copies every reader setting from bound properties.
    pub fn apply_properties(mut self, properties: &FlatFileReaderProperties) -> Self {
        self.name = properties.name.clone();
        self.resource = properties.resource.clone();
        self.encoding = properties.encoding.clone();
        self.save_state = properties.save_state;
        self.strict = properties.strict;
        self.parsing_strict = properties.parsing_strict;
        self.comments = properties.comments.clone();
        self.lines_to_skip = properties.lines_to_skip;
        self.max_item_count = properties.max_item_count;
        self.current_item_count = properties.current_item_count;
        self.delimited = properties.delimited;
        self.delimiter = properties.delimiter;
        self.quote_character = properties.quote_character;
        if !properties.included_fields.is_empty() {
            self.included_fields = Some(properties.included_fields.clone());
        }
        self.names = properties.names.clone();
        self.fixed_length = properties.fixed_length;
        self.ranges = properties.ranges.clone();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn resource(mut self, resource: impl AsRef<Path>) -> Self {
        self.resource = Some(resource.as_ref().to_path_buf());
        self
    }

    pub fn encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    pub fn save_state(mut self, save_state: bool) -> Self {
        self.save_state = save_state;
        self
    }

    /// When true, a missing resource fails the first read; when false the
    /// reader yields an empty sequence.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn parsing_strict(mut self, parsing_strict: bool) -> Self {
        self.parsing_strict = parsing_strict;
        self
    }

    pub fn comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    pub fn lines_to_skip(mut self, lines_to_skip: usize) -> Self {
        self.lines_to_skip = lines_to_skip;
        self
    }

    pub fn max_item_count(mut self, max_item_count: usize) -> Self {
        self.max_item_count = Some(max_item_count);
        self
    }

    pub fn current_item_count(mut self, current_item_count: usize) -> Self {
        self.current_item_count = current_item_count;
        self
    }

    /// Selects the delimited format variant.
    pub fn delimited(mut self) -> Self {
        self.delimited = true;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn quote_character(mut self, quote_character: char) -> Self {
        self.quote_character = Some(quote_character);
        self
    }

    pub fn included_fields(mut self, included_fields: Vec<usize>) -> Self {
        self.included_fields = Some(included_fields);
        self
    }

    pub fn names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Selects the fixed-width format variant with the given column ranges,
    /// e.g. `"3-4,7-8,11"`.
    pub fn fixed_length(mut self, ranges: &str) -> Self {
        self.fixed_length = true;
        self.ranges = Some(ranges.to_string());
        self
    }

    /// Fully overrides format-based decoding with a custom mapping.
    pub fn line_mapper(mut self, line_mapper: Box<dyn LineMapper<T> + 'a>) -> Self {
        self.line_mapper = Some(line_mapper);
        self
    }

    pub fn field_set_mapper(
        mut self,
        field_set_mapper: Box<dyn FieldSetMapper<T> + 'a>,
    ) -> Self {
        self.field_set_mapper = Some(field_set_mapper);
        self
    }

    pub fn record_separator_policy(
        mut self,
        policy: Box<dyn RecordSeparatorPolicy + 'a>,
    ) -> Self {
        self.record_separator_policy = Some(policy);
        self
    }

    pub fn line_callback(mut self, line_callback: &'a dyn LineCallbackHandler) -> Self {
        self.line_callback = Some(line_callback);
        self
    }

    fn build_tokenizer(&mut self) -> Result<Box<dyn LineTokenizer + 'a>, BatchError> {
        if self.delimited && self.fixed_length {
            return Err(BatchError::Configuration(
                "delimited and fixed_length are mutually exclusive".to_string(),
            ));
        }

        if self.delimited {
            let mut tokenizer = DelimitedLineTokenizer::new(self.delimiter.unwrap_or(','))
                .names(std::mem::take(&mut self.names))
                .strict(self.parsing_strict);
            if let Some(quote) = self.quote_character {
                tokenizer = tokenizer.quote_character(quote);
            }
            if let Some(included) = self.included_fields.take() {
                tokenizer = tokenizer.included_fields(included);
            }
            Ok(Box::new(tokenizer))
        } else if self.fixed_length {
            let ranges = self.ranges.as_deref().ok_or_else(|| {
                BatchError::Configuration(
                    "Column ranges are required for a fixed length reader".to_string(),
                )
            })?;
            let tokenizer = FixedLengthTokenizer::new(Range::parse_ranges(ranges)?)
                .names(std::mem::take(&mut self.names))
                .strict(self.parsing_strict);
            Ok(Box::new(tokenizer))
        } else {
            Err(BatchError::Configuration(
                "A format (delimited or fixed_length) or a line mapper is required"
                    .to_string(),
            ))
        }
    }

    /// Validates the configuration and builds the reader.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Configuration` before any I/O when the resource
    /// is missing, the encoding is unsupported, the name is absent while
    /// `save_state` is set, or no format variant applies.
    pub fn build(mut self) -> Result<FlatFileItemReader<'a, T>, BatchError> {
        if let Some(encoding) = &self.encoding {
            // Input is decoded as UTF-8; no charset crate exists in this
            // stack, so anything else is rejected up front.
            if !matches!(
                encoding.to_ascii_uppercase().as_str(),
                "UTF-8" | "UTF8"
            ) {
                return Err(BatchError::Configuration(format!(
                    "Unsupported encoding: {encoding}"
                )));
            }
        }

        if self.save_state && self.name.is_none() {
            return Err(BatchError::Configuration(
                "A name is required when saveState is set".to_string(),
            ));
        }

        let resource = self.resource.take().ok_or_else(|| {
            BatchError::Configuration("A resource is required".to_string())
        })?;

        let line_mapper = match self.line_mapper.take() {
            Some(mapper) => mapper,
            None => {
                let tokenizer = self.build_tokenizer()?;
                let field_set_mapper = self.field_set_mapper.take().ok_or_else(|| {
                    BatchError::Configuration(
                        "A field set mapper is required".to_string(),
                    )
                })?;
                Box::new(DefaultLineMapper::new(tokenizer, field_set_mapper))
            }
        };

        Ok(FlatFileItemReader {
            name: self.name.unwrap_or_else(|| "flatFileItemReader".to_string()),
            resource,
            strict: self.strict,
            comments: self.comments,
            lines_to_skip: self.lines_to_skip,
            max_item_count: self.max_item_count,
            current_item_count: self.current_item_count,
            line_mapper,
            record_separator_policy: self.record_separator_policy,
            line_callback: self.line_callback,
            state: RefCell::new(ReaderState::Unopened),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Unable to create fixture file");
        file.write_all(content.as_bytes())
            .expect("Unable to write fixture file");
        file
    }

    fn delimited_reader<'a>(
        path: &Path,
    ) -> FlatFileItemReaderBuilder<'a, FieldSet> {
        FlatFileItemReaderBuilder::new()
            .name("test-reader")
            .resource(path)
            .delimited()
            .delimiter('@')
            .names(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .field_set_mapper(Box::new(PassThroughFieldSetMapper))
    }

    fn read_all(reader: &FlatFileItemReader<FieldSet>) -> Vec<FieldSet> {
        let mut items = Vec::new();
        while let Some(item) = reader.read().unwrap() {
            items.push(item);
        }
        items
    }

    #[test]
    fn reads_one_record_per_line() {
        let file = fixture("1@2@3\n4@5@6\n");
        let reader = delimited_reader(file.path()).build().unwrap();

        let items = read_all(&reader);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].get("a"), Some("4"));

        // Exhausted readers keep returning None.
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn missing_resource_is_fatal_only_in_strict_mode() {
        let reader = delimited_reader(Path::new("/nonexistent/input.txt"))
            .build()
            .unwrap();
        assert!(matches!(
            reader.read(),
            Err(BatchError::ResourceNotFound(_))
        ));

        let reader = delimited_reader(Path::new("/nonexistent/input.txt"))
            .strict(false)
            .build()
            .unwrap();
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn lines_to_skip_applies_before_comment_filtering() {
        let file = fixture("# looks like a comment\n1@2@3\n4@5@6\n");
        let reader = delimited_reader(file.path())
            .lines_to_skip(2)
            .comments(vec!["#".to_string()])
            .build()
            .unwrap();

        let items = read_all(&reader);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("a"), Some("4"));
    }

    #[test]
    fn parse_errors_carry_resource_and_line_number() {
        let file = fixture("1@2@3\n1@2\n");
        let reader = delimited_reader(file.path()).build().unwrap();

        assert!(reader.read().unwrap().is_some());
        // Field-count mismatch under strict parsing keeps its identity.
        assert!(matches!(reader.read(), Err(BatchError::Format(_))));
        // The reader is done after a propagated error.
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn max_and_current_item_count_bound_the_stream() {
        let file = fixture("1@1@1\n2@2@2\n3@3@3\n4@4@4\n5@5@5\n");
        let reader = delimited_reader(file.path())
            .current_item_count(1)
            .max_item_count(3)
            .build()
            .unwrap();

        let items = read_all(&reader);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("a"), Some("2"));
        assert_eq!(items[1].get("a"), Some("3"));
    }

    #[test]
    fn unsupported_encoding_is_rejected_at_build_time() {
        let result = delimited_reader(Path::new("input.txt"))
            .encoding("UTF-16")
            .build();
        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }

    #[test]
    fn save_state_requires_a_name() {
        let result = FlatFileItemReaderBuilder::<FieldSet>::new()
            .resource("input.txt")
            .delimited()
            .field_set_mapper(Box::new(PassThroughFieldSetMapper))
            .build();

        match result {
            Err(BatchError::Configuration(message)) => {
                assert_eq!(message, "A name is required when saveState is set");
            }
            _ => panic!("expected a configuration error"),
        }
    }
}
