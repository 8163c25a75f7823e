//! Binary encoding for assembled records.
//!
//! Records are exported as columnar batches, optionally zstd-compressed,
//! and streamed as length-prefixed frames.

pub mod batch;
pub mod frame;
pub mod primitives;

pub use batch::{decode_batch, decompress, encode_batch, encode_batch_compressed};
pub use frame::{read_frames, BatchOptions, BatchWriter};
