//! Line-stream driver around the assembler.

use std::io::BufRead;

use tracing::{debug, warn};

use crate::assemble::Assembler;
use crate::error::IngestError;
use crate::model::Record;
use crate::sink::RecordSink;

/// What to do with a line that fails to tokenize or assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first bad line.
    #[default]
    Abort,
    /// Log the line, count it and continue.
    Skip,
}

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    /// Lines read, including blank ones.
    pub lines: usize,
    pub nodes: usize,
    pub ways: usize,
    pub relations: usize,
    /// Lines rejected under [`ErrorPolicy::Skip`].
    pub skipped: usize,
    /// Records opened but never emitted.
    pub discarded: u64,
}

impl IngestStats {
    /// Total records emitted.
    pub fn records(&self) -> usize {
        self.nodes + self.ways + self.relations
    }

    fn count(&mut self, record: &Record) {
        match record {
            Record::Node(_) => self.nodes += 1,
            Record::Way(_) => self.ways += 1,
            Record::Relation(_) => self.relations += 1,
        }
    }
}

/// Iterator of completed records over a line reader.
///
/// Blank lines are skipped. The ready record is taken after every line, so
/// none is lost to a following open.
pub struct Records<R> {
    reader: R,
    buf: Vec<u8>,
    assembler: Assembler,
    policy: ErrorPolicy,
    line_number: usize,
    skipped: usize,
    done: bool,
}

impl<R: BufRead> Records<R> {
    /// Creates an iterator that stops at the first error.
    pub fn new(reader: R) -> Self {
        Self::with_policy(reader, ErrorPolicy::Abort)
    }

    pub fn with_policy(reader: R, policy: ErrorPolicy) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            assembler: Assembler::new(),
            policy,
            line_number: 0,
            skipped: 0,
            done: false,
        }
    }

    /// Number of lines read so far (1-based number of the last line).
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Number of lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Applies the error policy to a bad line. Returns the error if
    /// iteration has to stop.
    fn reject(&mut self, err: IngestError) -> Option<IngestError> {
        match self.policy {
            ErrorPolicy::Abort => {
                self.done = true;
                Some(err)
            }
            ErrorPolicy::Skip => {
                warn!(error = %err, "skipping line");
                self.skipped += 1;
                None
            }
        }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Record, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
            self.line_number += 1;

            // The bytes are consumed either way, so a bad line can be skipped.
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(_) => {
                    let err = IngestError::InvalidUtf8 {
                        line_number: self.line_number,
                    };
                    match self.reject(err) {
                        Some(err) => return Some(Err(err)),
                        None => continue,
                    }
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            if let Err(source) = self.assembler.feed(line) {
                let err = IngestError::Parse {
                    line_number: self.line_number,
                    source,
                };
                match self.reject(err) {
                    Some(err) => return Some(Err(err)),
                    None => continue,
                }
            }

            if let Some(record) = self.assembler.take_ready() {
                return Some(Ok(record));
            }
        }
    }
}

/// Reads all lines, handing every completed record to `sink`.
///
/// The sink is finished once input is exhausted. A record still open at
/// end of input counts as discarded.
pub fn ingest<R, S>(reader: R, mut sink: S, policy: ErrorPolicy) -> Result<IngestStats, IngestError>
where
    R: BufRead,
    S: RecordSink,
{
    let mut records = Records::with_policy(reader, policy);
    let mut stats = IngestStats::default();

    for record in records.by_ref() {
        let record = record?;
        stats.count(&record);
        sink.accept(record)
            .map_err(|e| IngestError::Sink(Box::new(e)))?;
    }
    sink.finish().map_err(|e| IngestError::Sink(Box::new(e)))?;

    let assembler = records.assembler();
    stats.lines = records.line_number();
    stats.skipped = records.skipped();
    stats.discarded = assembler.discarded() + u64::from(assembler.pending().is_some());

    debug!(?stats, "ingest finished");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MarkupFault, ParseError};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <node id="1" lat="48.8" lon="2.3" visible="true"/>
  <node id="2" lat="48.9" lon="2.4" visible="true">
    <tag k="name" v="Cafe"/>
  </node>

  <way id="9" visible="true">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="service"/>
  </way>
  <way id="10">
    <nd ref="1"/>
  </way>
  <relation id="20">
    <member type="way" ref="9" role="outer"/>
  </relation>
</osm>
"#;

    #[test]
    fn test_records_in_input_order() {
        let refs: Vec<String> = Records::new(SAMPLE.as_bytes())
            .map(|r| r.unwrap().reference())
            .collect();
        assert_eq!(refs, vec!["N1", "N2", "W9", "R20"]);
    }

    #[test]
    fn test_ingest_stats() {
        let mut out: Vec<Record> = Vec::new();
        let stats = ingest(SAMPLE.as_bytes(), &mut out, ErrorPolicy::Abort).unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(
            stats,
            IngestStats {
                lines: 19,
                nodes: 2,
                ways: 1,
                relations: 1,
                skipped: 0,
                discarded: 1,
            }
        );
        assert_eq!(stats.records(), 4);
    }

    #[test]
    fn test_abort_reports_line_number() {
        let input = "<osm>\n<node id=\"1\" lat=\"0\" lon=\"0\"/>\n<node id = \"2\"/>\n<node id=\"3\" lat=\"0\" lon=\"0\"/>\n";
        let mut records = Records::new(input.as_bytes());

        assert_eq!(records.next().unwrap().unwrap().id(), 1);
        match records.next() {
            Some(Err(IngestError::Parse { line_number, source })) => {
                assert_eq!(line_number, 3);
                assert_eq!(source.fault(), Some(MarkupFault::SpaceAroundEquals));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(records.next().is_none());
    }

    #[test]
    fn test_skip_policy_continues() {
        let input = "<node id=\"1\" lat=\"0\" lon=\"0\"/>\n<member type=\"area\" ref=\"1\"/>\n</ node>\n<node id=\"3\" lat=\"0\" lon=\"0\"/>\n";
        let mut out: Vec<Record> = Vec::new();
        let stats = ingest(input.as_bytes(), &mut out, ErrorPolicy::Skip).unwrap();

        assert_eq!(out.iter().map(Record::id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_abort_surfaces_unknown_kind() {
        let input = "<relation id=\"1\">\n<member type=\"area\" ref=\"1\"/>\n";
        let mut out: Vec<Record> = Vec::new();
        let err = ingest(input.as_bytes(), &mut out, ErrorPolicy::Abort).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Parse {
                line_number: 2,
                source: ParseError::UnknownReferenceKind { .. }
            }
        ));
    }
}
