//! Format constants and decoding limits for record batches.
//!
//! Every length read from untrusted batch bytes is checked against one of
//! these before anything is allocated.

/// Magic for an uncompressed batch.
pub const MAGIC_UNCOMPRESSED: &[u8; 4] = b"OSMB";

/// Magic for a zstd-compressed batch.
pub const MAGIC_COMPRESSED: &[u8; 5] = b"OSMBZ";

/// Batch format version written by this crate.
pub const FORMAT_VERSION: u8 = 1;

/// Oldest batch format version this crate can read.
pub const MIN_FORMAT_VERSION: u8 = 1;

/// A u64 LEB128 varint never needs more than 10 bytes.
pub const MAX_VARINT_BYTES: usize = 10;

/// Longest string (user name, tag key or value, role, reference).
pub const MAX_STRING_LEN: usize = 64 * 1024;

/// Most rows in one table of one batch.
pub const MAX_ROWS_PER_TABLE: usize = 4_000_000;

/// Most tags on a single record.
pub const MAX_TAGS_PER_RECORD: usize = 10_000;

/// Most node references or members on a single record.
pub const MAX_MEMBERS_PER_RECORD: usize = 1_000_000;

/// Largest uncompressed batch, in bytes.
pub const MAX_BATCH_SIZE: usize = 1 << 30;
