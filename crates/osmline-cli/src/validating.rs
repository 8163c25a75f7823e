use osmline::{validate_record, Record, RecordSink};
use tracing::warn;

/// Sink adapter that drops records failing [`validate_record`].
pub struct Validating<S> {
    inner: S,
    rejected: usize,
}

impl<S: RecordSink> Validating<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, rejected: 0 }
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl<S: RecordSink> RecordSink for Validating<S> {
    type Error = S::Error;

    fn accept(&mut self, record: Record) -> Result<(), S::Error> {
        match validate_record(&record) {
            Ok(()) => self.inner.accept(record),
            Err(e) => {
                warn!(reference = %record.reference(), error = %e, "dropping invalid record");
                self.rejected += 1;
                Ok(())
            }
        }
    }

    fn finish(&mut self) -> Result<(), S::Error> {
        self.inner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmline::Node;

    #[test]
    fn test_invalid_records_dropped() {
        let mut out: Vec<Record> = Vec::new();
        let mut sink = Validating::new(&mut out);
        sink.accept(Record::Node(Node::new(1, 10.0, 10.0))).unwrap();
        sink.accept(Record::Node(Node::new(2, 100.0, 10.0))).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.rejected(), 1);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), 1);
    }
}
