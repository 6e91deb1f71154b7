/// An ordered set of decoded field values, optionally bound to field names.
///
/// Insertion order is field order: iterating a `FieldSet` yields the fields
/// in the order they were decoded from the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    names: Vec<String>,
    values: Vec<String>,
}

impl FieldSet {
    /// Creates a field set binding `values` positionally to `names`.
    ///
    /// The two lists must have equal length; tokenizers enforce this before
    /// constructing the set.
    pub fn new(names: Vec<String>, values: Vec<String>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Creates a field set with positional values only.
    pub fn with_values(values: Vec<String>) -> Self {
        Self {
            names: Vec::new(),
            values,
        }
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    /// Value at a zero-based position.
    pub fn read_string(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Value bound to `name`, if the set carries names.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|index| self.read_string(index))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Iterates (name, value) pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
