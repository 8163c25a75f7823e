//! Record types assembled from OSM markup.

use rustc_hash::FxHashMap;

use crate::model::ElementKind;

/// Minimum node references for a way to be emitted.
pub const MIN_WAY_NODES: usize = 2;

/// Minimum members for a relation to be emitted.
pub const MIN_RELATION_MEMBERS: usize = 1;

/// Fields shared by every record kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    /// Raw id, unique within its kind.
    pub id: i64,
    /// Author display name (`user`).
    pub user: Option<String>,
    /// Author id (`uid`).
    pub uid: Option<i64>,
    pub visible: bool,
    pub version: Option<i32>,
    pub changeset: Option<i64>,
    /// Timestamp text as found in the input, not parsed.
    pub timestamp: Option<String>,
    /// Tags; keys are unique and the last write wins.
    pub tags: FxHashMap<String, String>,
}

impl Metadata {
    /// Creates metadata with only an id set.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Sets a tag, returning the value it replaced.
    pub fn insert_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.tags.insert(key.into(), value.into())
    }

    /// Returns a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// A single geolocated point.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub meta: Metadata,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            meta: Metadata::new(id),
            lat,
            lon,
        }
    }
}

/// An ordered list of node references.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub meta: Metadata,
    /// Namespaced node references (`N<id>`), in document order.
    /// Duplicates are kept, closed ways repeat their first node.
    pub nodes: Vec<String>,
}

impl Way {
    pub fn new(id: i64) -> Self {
        Self {
            meta: Metadata::new(id),
            nodes: Vec::new(),
        }
    }

    /// Appends a namespaced node reference.
    pub fn push_node(&mut self, reference: String) {
        self.nodes.push(reference);
    }
}

/// One entry of a relation's member list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub role: String,
    /// Namespaced reference to a node, way or relation.
    pub reference: String,
}

/// An ordered list of role-annotated references to other elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub meta: Metadata,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn new(id: i64) -> Self {
        Self {
            meta: Metadata::new(id),
            members: Vec::new(),
        }
    }

    /// Appends a member.
    pub fn push_member(&mut self, role: impl Into<String>, reference: String) {
        self.members.push(Member {
            role: role.into(),
            reference,
        });
    }
}

/// A node, way or relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Record {
    /// Returns the element kind.
    pub fn kind(&self) -> ElementKind {
        match self {
            Record::Node(_) => ElementKind::Node,
            Record::Way(_) => ElementKind::Way,
            Record::Relation(_) => ElementKind::Relation,
        }
    }

    /// Returns the raw id.
    pub fn id(&self) -> i64 {
        self.meta().id
    }

    /// Returns the namespaced reference of this record (e.g. `"W9"`).
    pub fn reference(&self) -> String {
        self.kind().reference(&self.id().to_string())
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            Record::Node(n) => &n.meta,
            Record::Way(w) => &w.meta,
            Record::Relation(r) => &r.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Metadata {
        match self {
            Record::Node(n) => &mut n.meta,
            Record::Way(w) => &mut w.meta,
            Record::Relation(r) => &mut r.meta,
        }
    }

    /// Returns true if the record satisfies its kind's minimum shape:
    /// any node, a way with at least [`MIN_WAY_NODES`] references, a
    /// relation with at least [`MIN_RELATION_MEMBERS`] members.
    pub fn has_minimum_shape(&self) -> bool {
        match self {
            Record::Node(_) => true,
            Record::Way(w) => w.nodes.len() >= MIN_WAY_NODES,
            Record::Relation(r) => r.members.len() >= MIN_RELATION_MEMBERS,
        }
    }
}

impl From<Node> for Record {
    fn from(node: Node) -> Self {
        Record::Node(node)
    }
}

impl From<Way> for Record {
    fn from(way: Way) -> Self {
        Record::Way(way)
    }
}

impl From<Relation> for Record {
    fn from(relation: Relation) -> Self {
        Record::Relation(relation)
    }
}
