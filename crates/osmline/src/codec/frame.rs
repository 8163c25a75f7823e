//! Length-prefixed batch frames.
//!
//! A frame stream is a sequence of `varint length, batch bytes` pairs,
//! each batch encoded by [`encode_batch`] or [`encode_batch_compressed`].

use std::io::Write;

use tracing::debug;

use crate::codec::batch::{decode_batch, encode_batch, encode_batch_compressed};
use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_BATCH_SIZE;
use crate::model::{Record, RecordBatch};
use crate::sink::RecordSink;

/// How [`BatchWriter`] cuts and encodes frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Rows buffered before a frame is written. Zero is treated as one.
    pub rows_per_batch: usize,
    /// zstd level, or `None` for uncompressed frames.
    pub compression_level: Option<i32>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            rows_per_batch: 50_000,
            compression_level: None,
        }
    }
}

/// Record sink that buffers rows and writes one frame per full batch.
#[derive(Debug)]
pub struct BatchWriter<W: Write> {
    out: W,
    options: BatchOptions,
    batch: RecordBatch,
    frames: usize,
    rows: usize,
}

impl<W: Write> BatchWriter<W> {
    pub fn new(out: W, options: BatchOptions) -> Self {
        Self {
            out,
            options,
            batch: RecordBatch::new(),
            frames: 0,
            rows: 0,
        }
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// Rows written so far, not counting the buffered batch.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Writes the buffered rows as one frame. Does nothing when empty.
    pub fn flush_batch(&mut self) -> Result<(), EncodeError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let bytes = match self.options.compression_level {
            Some(level) => encode_batch_compressed(&self.batch, level)?,
            None => encode_batch(&self.batch)?,
        };

        let mut prefix = Writer::with_capacity(10);
        prefix.write_varint(bytes.len() as u64);
        self.out
            .write_all(prefix.as_bytes())
            .and_then(|()| self.out.write_all(&bytes))
            .map_err(|e| EncodeError::Write(e.to_string()))?;

        debug!(
            frame = self.frames,
            rows = self.batch.len(),
            bytes = bytes.len(),
            "wrote batch frame"
        );
        self.frames += 1;
        self.rows += self.batch.len();
        self.batch.clear();
        Ok(())
    }

    /// Returns the underlying writer. Buffered rows are dropped; call
    /// [`RecordSink::finish`] first.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for BatchWriter<W> {
    type Error = EncodeError;

    fn accept(&mut self, record: Record) -> Result<(), EncodeError> {
        self.batch.push(record);
        if self.batch.len() >= self.options.rows_per_batch.max(1) {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        self.flush_batch()?;
        self.out
            .flush()
            .map_err(|e| EncodeError::Write(e.to_string()))
    }
}

/// Decodes every frame in `input`.
pub fn read_frames(input: &[u8]) -> Result<Vec<RecordBatch>, DecodeError> {
    let mut reader = Reader::new(input);
    let mut batches = Vec::new();
    while !reader.is_empty() {
        let len = reader.read_len(MAX_BATCH_SIZE, "frame_length")?;
        let frame = reader.read_bytes(len, "frame")?;
        batches.push(decode_batch(frame)?);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Way};
    use pretty_assertions::assert_eq;

    fn records(n: i64) -> Vec<Record> {
        (1..=n)
            .map(|id| Record::Node(Node::new(id, id as f64 / 10.0, 0.5)))
            .collect()
    }

    #[test]
    fn test_frames_cut_at_row_limit() {
        let options = BatchOptions {
            rows_per_batch: 2,
            compression_level: None,
        };
        let mut writer = BatchWriter::new(Vec::new(), options);
        for record in records(5) {
            writer.accept(record).unwrap();
        }
        assert_eq!(writer.frames_written(), 2);
        writer.finish().unwrap();
        assert_eq!(writer.frames_written(), 3);
        assert_eq!(writer.rows_written(), 5);

        let batches = read_frames(&writer.into_inner()).unwrap();
        let sizes: Vec<usize> = batches.iter().map(RecordBatch::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        let ids: Vec<i64> = batches
            .into_iter()
            .flat_map(RecordBatch::into_records)
            .map(|r| r.id())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_compressed_frames() {
        let options = BatchOptions {
            rows_per_batch: 10,
            compression_level: Some(3),
        };
        let mut writer = BatchWriter::new(Vec::new(), options);
        let mut way = Way::new(9);
        way.push_node("N1".to_string());
        way.push_node("N2".to_string());
        for record in records(2).into_iter().chain([Record::Way(way.clone())]) {
            writer.accept(record).unwrap();
        }
        writer.finish().unwrap();

        let bytes = writer.into_inner();
        let batches = read_frames(&bytes).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].ways, vec![way]);
        assert_eq!(batches[0].nodes.len(), 2);
    }

    #[test]
    fn test_empty_stream_writes_nothing() {
        let mut writer = BatchWriter::new(Vec::new(), BatchOptions::default());
        writer.finish().unwrap();
        assert_eq!(writer.frames_written(), 0);
        assert!(writer.into_inner().is_empty());
        assert_eq!(read_frames(&[]).unwrap(), Vec::<RecordBatch>::new());
    }

    #[test]
    fn test_truncated_frame() {
        let mut writer = BatchWriter::new(Vec::new(), BatchOptions::default());
        for record in records(3) {
            writer.accept(record).unwrap();
        }
        writer.finish().unwrap();
        let bytes = writer.into_inner();

        assert_eq!(
            read_frames(&bytes[..bytes.len() - 1]),
            Err(DecodeError::UnexpectedEof { context: "frame" })
        );
    }

    #[test]
    fn test_write_failure_is_reported() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let options = BatchOptions {
            rows_per_batch: 1,
            compression_level: None,
        };
        let mut writer = BatchWriter::new(Broken, options);
        let err = writer.accept(records(1).remove(0)).unwrap_err();
        assert!(matches!(err, EncodeError::Write(msg) if msg.contains("disk full")));
    }
}
