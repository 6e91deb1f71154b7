/// Decides where a logical record ends when records may span multiple
/// physical lines.
///
/// The reader accumulates physical lines into a record buffer: each time a
/// line is appended the buffer first goes through `pre_process`, and
/// accumulation stops once `is_end_of_record` accepts the buffer. The
/// finished buffer goes through `post_process` before mapping.
pub trait RecordSeparatorPolicy {
    fn is_end_of_record(&self, record: &str) -> bool;

    fn pre_process(&self, record: &str) -> String {
        record.to_string()
    }

    fn post_process(&self, record: &str) -> String {
        record.to_string()
    }
}

/// Treats every physical line as one complete record.
pub struct SimpleRecordSeparatorPolicy;

impl RecordSeparatorPolicy for SimpleRecordSeparatorPolicy {
    fn is_end_of_record(&self, _record: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_policy_ends_every_record_immediately() {
        let policy = SimpleRecordSeparatorPolicy;
        assert!(policy.is_end_of_record("any line"));
        assert_eq!(policy.pre_process("x"), "x");
        assert_eq!(policy.post_process("x"), "x");
    }
}
