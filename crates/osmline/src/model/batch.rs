//! Per-kind staging of records before export.

use crate::model::{Node, Record, Relation, Way};

/// Records split into one table per kind.
///
/// Row order within each table is the order records were pushed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordBatch {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
}

impl RecordBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to the table of its kind.
    pub fn push(&mut self, record: Record) {
        match record {
            Record::Node(n) => self.nodes.push(n),
            Record::Way(w) => self.ways.push(w),
            Record::Relation(r) => self.relations.push(r),
        }
    }

    /// Total rows across all tables.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all rows, keeping allocations.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.ways.clear();
        self.relations.clear();
    }

    /// Consumes the batch, yielding nodes, then ways, then relations.
    pub fn into_records(self) -> impl Iterator<Item = Record> {
        self.nodes
            .into_iter()
            .map(Record::Node)
            .chain(self.ways.into_iter().map(Record::Way))
            .chain(self.relations.into_iter().map(Record::Relation))
    }
}

impl FromIterator<Record> for RecordBatch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut batch = RecordBatch::new();
        for record in iter {
            batch.push(record);
        }
        batch
    }
}
