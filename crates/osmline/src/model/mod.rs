//! Data model for assembled OSM records.
//!
//! - Identifiers and namespaced references
//! - Records (node, way, relation) and their shared metadata
//! - Batches (one table per record kind)

pub mod batch;
pub mod id;
pub mod record;

pub use batch::RecordBatch;
pub use id::{namespaced_id, parse_reference, ElementKind};
pub use record::{
    Member, Metadata, Node, Record, Relation, Way, MIN_RELATION_MEMBERS, MIN_WAY_NODES,
};
