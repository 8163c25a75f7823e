//! osmline: line-oriented OSM XML ingestion.
//!
//! This crate turns OSM XML, one element per line, into typed records and
//! exports them as compact columnar batches.
//!
//! # Overview
//!
//! Input is handled in three stages:
//! - **Tokenize**: each line becomes exactly one [`Token`] (start, end,
//!   empty, complete or declaration), or is rejected with a [`MarkupFault`]
//! - **Assemble**: the [`Assembler`] folds tokens into [`Record`]s (nodes,
//!   ways, relations) with a single open record and no lookahead
//! - **Export**: completed records flow into a [`RecordSink`], such as a
//!   [`BatchWriter`] producing zstd-compressed frames
//!
//! # Quick Start
//!
//! ```rust
//! use osmline::{Assembler, Record};
//!
//! let mut assembler = Assembler::new();
//! let mut records = Vec::new();
//! for line in [
//!     r#"<way id="9" visible="true">"#,
//!     r#"  <nd ref="1"/>"#,
//!     r#"  <nd ref="2"/>"#,
//!     r#"</way>"#,
//! ] {
//!     assembler.feed(line).unwrap();
//!     records.extend(assembler.take_ready());
//! }
//!
//! let Record::Way(way) = &records[0] else { panic!("expected a way") };
//! assert_eq!(way.nodes, vec!["N1", "N2"]);
//! ```
//!
//! # Modules
//!
//! - [`markup`]: Single-line tokenizer
//! - [`assemble`]: Record assembly state machine and line-stream driver
//! - [`model`]: Records, namespaced references and batches
//! - [`codec`]: Columnar batch encoding with compression support
//! - [`validate`]: Advisory semantic validation
//! - [`sink`]: Destination trait for completed records
//! - [`error`]: Error types
//! - [`limits`]: Format constants and decoding limits
//!
//! # Batch Format
//!
//! Batches are column-major with one table per record kind:
//! - Uncompressed: `OSMB` magic + version + tables
//! - Compressed: `OSMBZ` magic + uncompressed size + zstd data
//!
//! The decoder detects both forms and bounds every allocation by
//! [`limits`].

pub mod assemble;
pub mod codec;
pub mod error;
pub mod limits;
pub mod markup;
pub mod model;
pub mod sink;
pub mod validate;

pub use assemble::{ingest, Assembler, ErrorPolicy, IngestStats, Records};
pub use codec::{
    decode_batch, encode_batch, encode_batch_compressed, read_frames, BatchOptions, BatchWriter,
};
pub use error::{DecodeError, EncodeError, IngestError, MarkupFault, ParseError, ValidationError};
pub use markup::{tokenize, Attributes, Token, TokenKind};
pub use model::{
    namespaced_id, parse_reference, ElementKind, Member, Metadata, Node, Record, RecordBatch,
    Relation, Way,
};
pub use sink::RecordSink;
pub use validate::validate_record;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
