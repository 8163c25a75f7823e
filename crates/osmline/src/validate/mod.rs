//! Semantic validation for assembled records.
//!
//! The assembler accepts any coordinate and any namespaced reference. This
//! module checks what it does not: coordinates on the globe, references
//! that parse back to a kind and id, and minimum shapes. Validation is
//! advisory; callers decide whether a failure drops the record.

use crate::error::ValidationError;
use crate::model::{
    parse_reference, ElementKind, Node, Record, Relation, Way, MIN_RELATION_MEMBERS,
    MIN_WAY_NODES,
};

/// Validates a record, returning the first violation found.
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    match record {
        Record::Node(node) => validate_node(node),
        Record::Way(way) => validate_way(way),
        Record::Relation(relation) => validate_relation(relation),
    }
}

fn validate_node(node: &Node) -> Result<(), ValidationError> {
    let id = node.meta.id;
    if !(-90.0..=90.0).contains(&node.lat) {
        return Err(ValidationError::LatitudeOutOfRange { id, lat: node.lat });
    }
    if !(-180.0..=180.0).contains(&node.lon) {
        return Err(ValidationError::LongitudeOutOfRange { id, lon: node.lon });
    }
    Ok(())
}

fn validate_way(way: &Way) -> Result<(), ValidationError> {
    let id = way.meta.id;
    if way.nodes.len() < MIN_WAY_NODES {
        return Err(ValidationError::TooFewNodes {
            id,
            count: way.nodes.len(),
        });
    }
    for reference in &way.nodes {
        // A way may only reference nodes.
        if !matches!(parse_reference(reference), Some((ElementKind::Node, _))) {
            return Err(ValidationError::MalformedReference {
                kind: ElementKind::Way.name(),
                id,
                reference: reference.clone(),
            });
        }
    }
    Ok(())
}

fn validate_relation(relation: &Relation) -> Result<(), ValidationError> {
    let id = relation.meta.id;
    if relation.members.len() < MIN_RELATION_MEMBERS {
        return Err(ValidationError::EmptyRelation { id });
    }
    if let Some(member) = relation
        .members
        .iter()
        .find(|m| parse_reference(&m.reference).is_none())
    {
        return Err(ValidationError::MalformedReference {
            kind: ElementKind::Relation.name(),
            id,
            reference: member.reference.clone(),
        });
    }
    Ok(())
}
