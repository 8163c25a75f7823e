//! Destination interface for completed records.

use std::convert::Infallible;

use crate::model::{Record, RecordBatch};

/// Receives completed records in input order.
///
/// Implementations decide how records map onto storage; the assembler and
/// stream driver only ever call [`accept`](RecordSink::accept) and, once at
/// the end of input, [`finish`](RecordSink::finish).
pub trait RecordSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Takes ownership of one completed record.
    fn accept(&mut self, record: Record) -> Result<(), Self::Error>;

    /// Flushes anything buffered. Called once after the last record.
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl RecordSink for Vec<Record> {
    type Error = Infallible;

    fn accept(&mut self, record: Record) -> Result<(), Infallible> {
        self.push(record);
        Ok(())
    }
}

impl RecordSink for RecordBatch {
    type Error = Infallible;

    fn accept(&mut self, record: Record) -> Result<(), Infallible> {
        self.push(record);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    type Error = S::Error;

    fn accept(&mut self, record: Record) -> Result<(), S::Error> {
        (**self).accept(record)
    }

    fn finish(&mut self) -> Result<(), S::Error> {
        (**self).finish()
    }
}
