use std::str::FromStr;

use crate::BatchError;

use super::field_set::FieldSet;

/// Turns one logical line into an ordered [`FieldSet`].
pub trait LineTokenizer {
    fn tokenize(&self, line: &str) -> Result<FieldSet, BatchError>;
}

/// A 1-based, inclusive column range of a fixed-width record.
///
/// Parsed from the `"3-4"` syntax; a bare lower bound (`"11"`) is open-ended
/// and extends to the end of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    min: usize,
    max: Option<usize>,
}

impl Range {
    /// # Panics
    ///
    /// Panics when `min` is zero or `max` precedes `min`; ranges are 1-based.
    pub fn new(min: usize, max: usize) -> Self {
        assert!(min >= 1, "Column ranges are 1-based");
        assert!(max >= min, "Column range ends before it starts");
        Self {
            min,
            max: Some(max),
        }
    }

    /// # Panics
    ///
    /// Panics when `min` is zero; ranges are 1-based.
    pub fn open_ended(min: usize) -> Self {
        assert!(min >= 1, "Column ranges are 1-based");
        Self { min, max: None }
    }

    /// Parses a comma-separated range list, e.g. `"3-4,7-8,11"`.
    pub fn parse_ranges(ranges: &str) -> Result<Vec<Range>, BatchError> {
        ranges
            .split(',')
            .map(|range| range.trim().parse())
            .collect()
    }
}

impl FromStr for Range {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || BatchError::Configuration(format!("Invalid column range: '{s}'"));

        let (min, max) = match s.split_once('-') {
            Some((min, max)) => (
                min.trim().parse::<usize>().map_err(|_| invalid())?,
                Some(max.trim().parse::<usize>().map_err(|_| invalid())?),
            ),
            None => (s.trim().parse::<usize>().map_err(|_| invalid())?, None),
        };

        if min == 0 {
            return Err(BatchError::Configuration(format!(
                "Column ranges are 1-based: '{s}'"
            )));
        }
        if let Some(max) = max
            && max < min
        {
            return Err(invalid());
        }

        Ok(Range { min, max })
    }
}

/// Binds decoded values positionally to the configured names.
///
/// With `strict` set, a count mismatch is a `Format` error; otherwise excess
/// values are dropped and missing ones become empty strings.
fn bind_names(
    mut values: Vec<String>,
    names: &[String],
    strict: bool,
) -> Result<FieldSet, BatchError> {
    if names.is_empty() {
        return Ok(FieldSet::with_values(values));
    }

    if values.len() != names.len() {
        if strict {
            return Err(BatchError::Format(format!(
                "Expected {} fields but found {}",
                names.len(),
                values.len()
            )));
        }
        values.resize(names.len(), String::new());
    }

    Ok(FieldSet::new(names.to_vec(), values))
}

/// Splits a line on a delimiter character, honoring an optional quote
/// character: a quoted field keeps embedded delimiters and loses its
/// surrounding quotes.
pub struct DelimitedLineTokenizer {
    delimiter: char,
    quote_character: Option<char>,
    included_fields: Option<Vec<usize>>,
    names: Vec<String>,
    strict: bool,
}

impl DelimitedLineTokenizer {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            quote_character: None,
            included_fields: None,
            names: Vec::new(),
            strict: true,
        }
    }

    pub fn quote_character(mut self, quote_character: char) -> Self {
        self.quote_character = Some(quote_character);
        self
    }

    /// Zero-based positions to retain, in the given order, before names are
    /// bound.
    pub fn included_fields(mut self, included_fields: Vec<usize>) -> Self {
        self.included_fields = Some(included_fields);
        self
    }

    pub fn names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn split(&self, line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        for c in line.chars() {
            if self.quote_character == Some(c) {
                in_quotes = !in_quotes;
                current.push(c);
            } else if c == self.delimiter && !in_quotes {
                fields.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        fields.push(current);

        fields
            .into_iter()
            .map(|field| self.clean(&field))
            .collect()
    }

    /// Strips the surrounding quotes (and any whitespace around them) from a
    /// quoted field. Unquoted fields are kept verbatim, whitespace included.
    fn clean(&self, field: &str) -> String {
        if let Some(quote) = self.quote_character {
            let trimmed = field.trim();
            if trimmed.chars().count() >= 2
                && trimmed.starts_with(quote)
                && trimmed.ends_with(quote)
            {
                let mut chars = trimmed.chars();
                chars.next();
                chars.next_back();
                return chars.as_str().to_string();
            }
        }
        field.to_string()
    }
}

impl LineTokenizer for DelimitedLineTokenizer {
    fn tokenize(&self, line: &str) -> Result<FieldSet, BatchError> {
        let values = self.split(line);

        let values = match &self.included_fields {
            Some(included) => included
                .iter()
                .map(|&index| {
                    values.get(index).cloned().ok_or_else(|| {
                        BatchError::Format(format!(
                            "Included field index {} out of bounds for {} fields",
                            index,
                            values.len()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => values,
        };

        bind_names(values, &self.names, self.strict)
    }
}

/// Extracts whitespace-trimmed substrings at fixed column ranges.
pub struct FixedLengthTokenizer {
    ranges: Vec<Range>,
    names: Vec<String>,
    strict: bool,
}

impl FixedLengthTokenizer {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self {
            ranges,
            names: Vec::new(),
            strict: true,
        }
    }

    pub fn names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl LineTokenizer for FixedLengthTokenizer {
    fn tokenize(&self, line: &str) -> Result<FieldSet, BatchError> {
        let chars: Vec<char> = line.chars().collect();
        let mut values = Vec::with_capacity(self.ranges.len());

        for range in &self.ranges {
            if self.strict
                && let Some(max) = range.max
                && chars.len() < max
            {
                return Err(BatchError::Format(format!(
                    "Line of length {} is shorter than column range {}-{}",
                    chars.len(),
                    range.min,
                    max
                )));
            }

            let start = (range.min - 1).min(chars.len());
            let end = range.max.unwrap_or(chars.len()).min(chars.len());
            let value: String = chars[start..end.max(start)].iter().collect();
            values.push(value.trim().to_string());
        }

        bind_names(values, &self.names, self.strict)
    }
}
