//! Namespaced identifiers.
//!
//! Node, way and relation ids are only unique within their own kind. A
//! namespaced reference prefixes the raw id with a one-letter kind tag so
//! references of different kinds can share one column:
//!
//! ```text
//! node 5     -> "N5"
//! way 5      -> "W5"
//! relation 5 -> "R5"
//! ```

use crate::error::ParseError;

/// The three top-level OSM element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    /// Looks up a kind by its markup name (`node`, `way`, `relation`).
    pub fn from_name(name: &str) -> Option<ElementKind> {
        match name {
            "node" => Some(ElementKind::Node),
            "way" => Some(ElementKind::Way),
            "relation" => Some(ElementKind::Relation),
            _ => None,
        }
    }

    /// Looks up a kind by its reference prefix letter.
    pub fn from_prefix(prefix: char) -> Option<ElementKind> {
        match prefix {
            'N' => Some(ElementKind::Node),
            'W' => Some(ElementKind::Way),
            'R' => Some(ElementKind::Relation),
            _ => None,
        }
    }

    /// Returns the markup name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }

    /// Returns the one-letter reference prefix of this kind.
    pub fn prefix(self) -> char {
        match self {
            ElementKind::Node => 'N',
            ElementKind::Way => 'W',
            ElementKind::Relation => 'R',
        }
    }

    /// Builds the namespaced reference for a raw id of this kind.
    pub fn reference(self, raw: &str) -> String {
        let mut s = String::with_capacity(raw.len() + 1);
        s.push(self.prefix());
        s.push_str(raw);
        s
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the namespaced reference for `raw` given a kind name.
///
/// The raw id is copied verbatim; only the kind is checked.
pub fn namespaced_id(kind: &str, raw: &str) -> Result<String, ParseError> {
    ElementKind::from_name(kind)
        .map(|k| k.reference(raw))
        .ok_or_else(|| ParseError::UnknownReferenceKind {
            kind: kind.to_string(),
        })
}

/// Splits a namespaced reference back into its kind and numeric id.
///
/// Returns `None` if the prefix is unknown or the rest is not an integer.
pub fn parse_reference(reference: &str) -> Option<(ElementKind, i64)> {
    let mut chars = reference.chars();
    let kind = ElementKind::from_prefix(chars.next()?)?;
    let id = chars.as_str().parse().ok()?;
    Some((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_id() {
        assert_eq!(namespaced_id("node", "5").unwrap(), "N5");
        assert_eq!(namespaced_id("way", "5").unwrap(), "W5");
        assert_eq!(namespaced_id("relation", "5").unwrap(), "R5");
    }

    #[test]
    fn test_namespaced_id_unknown_kind() {
        for kind in ["area", "Node", ""] {
            assert_eq!(
                namespaced_id(kind, "5"),
                Err(ParseError::UnknownReferenceKind {
                    kind: kind.to_string()
                })
            );
        }
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("N42"), Some((ElementKind::Node, 42)));
        assert_eq!(parse_reference("W-7"), Some((ElementKind::Way, -7)));
        assert_eq!(parse_reference("R0"), Some((ElementKind::Relation, 0)));
        assert_eq!(parse_reference("X1"), None);
        assert_eq!(parse_reference("N"), None);
        assert_eq!(parse_reference("Nabc"), None);
        assert_eq!(parse_reference(""), None);
    }

    #[test]
    fn test_kind_name_and_prefix_agree() {
        for kind in [ElementKind::Node, ElementKind::Way, ElementKind::Relation] {
            assert_eq!(ElementKind::from_name(kind.name()), Some(kind));
            assert_eq!(ElementKind::from_prefix(kind.prefix()), Some(kind));
            assert_eq!(parse_reference(&kind.reference("9")), Some((kind, 9)));
        }
    }
}
