use std::collections::HashMap;

use crate::BatchError;

use super::{field_set::FieldSet, tokenizer::LineTokenizer};

/// Maps one logical line (and its 1-based physical line number) to an item.
///
/// Supplying a custom `LineMapper` to the reader bypasses tokenizing
/// entirely, regardless of any delimited or fixed-width settings.
pub trait LineMapper<T> {
    fn map_line(&self, line: &str, line_number: usize) -> Result<T, BatchError>;
}

/// Maps a decoded [`FieldSet`] to a domain item.
pub trait FieldSetMapper<T> {
    fn map_field_set(&self, field_set: FieldSet) -> Result<T, BatchError>;
}

/// Yields the field set itself as the item, or collapses it into a
/// name-to-value map, depending on the requested item type.
pub struct PassThroughFieldSetMapper;

impl FieldSetMapper<FieldSet> for PassThroughFieldSetMapper {
    fn map_field_set(&self, field_set: FieldSet) -> Result<FieldSet, BatchError> {
        Ok(field_set)
    }
}

impl FieldSetMapper<HashMap<String, String>> for PassThroughFieldSetMapper {
    fn map_field_set(
        &self,
        field_set: FieldSet,
    ) -> Result<HashMap<String, String>, BatchError> {
        Ok(field_set
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

/// Standard two-phase mapping: tokenize the line, then map the field set.
pub struct DefaultLineMapper<'a, T> {
    tokenizer: Box<dyn LineTokenizer + 'a>,
    field_set_mapper: Box<dyn FieldSetMapper<T> + 'a>,
}

impl<'a, T> DefaultLineMapper<'a, T> {
    pub fn new(
        tokenizer: Box<dyn LineTokenizer + 'a>,
        field_set_mapper: Box<dyn FieldSetMapper<T> + 'a>,
    ) -> Self {
        Self {
            tokenizer,
            field_set_mapper,
        }
    }
}

impl<'a, T> LineMapper<T> for DefaultLineMapper<'a, T> {
    fn map_line(&self, line: &str, _line_number: usize) -> Result<T, BatchError> {
        let field_set = self.tokenizer.tokenize(line)?;
        self.field_set_mapper.map_field_set(field_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::flat_file::tokenizer::DelimitedLineTokenizer;

    #[test]
    fn default_line_mapper_chains_tokenizer_and_field_set_mapper() {
        let tokenizer = DelimitedLineTokenizer::new(',')
            .names(vec!["foo".to_string(), "bar".to_string()]);
        let mapper = DefaultLineMapper::new(
            Box::new(tokenizer),
            Box::new(PassThroughFieldSetMapper),
        );

        let field_set: FieldSet = mapper.map_line("1,2", 1).unwrap();
        assert_eq!(field_set.get("foo"), Some("1"));
        assert_eq!(field_set.get("bar"), Some("2"));
    }

    #[test]
    fn pass_through_mapper_builds_a_name_to_value_map() {
        let field_set = FieldSet::new(
            vec!["foo".to_string(), "bar".to_string()],
            vec!["1".to_string(), "2".to_string()],
        );

        let map: HashMap<String, String> = PassThroughFieldSetMapper
            .map_field_set(field_set)
            .unwrap();

        assert_eq!(map.get("foo").map(String::as_str), Some("1"));
        assert_eq!(map.get("bar").map(String::as_str), Some("2"));
    }
}
