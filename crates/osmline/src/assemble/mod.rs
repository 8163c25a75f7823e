//! Streaming assembly of records from tokens.
//!
//! The [`Assembler`] holds a single in-progress record and a readiness flag.
//! Each token either opens a record, mutates the open one, or closes it:
//!
//! ```text
//! <way id="9">      open Way 9            ready = false
//! <nd ref="1"/>     append "N1"           ready = false
//! <nd ref="2"/>     append "N2"           ready = false
//! </way>            2 refs >= minimum     ready = true
//! ```
//!
//! There is no lookahead and no stack. A new top-level open replaces the
//! current record whether or not it was finished; the input is assumed to be
//! flat (no element nested inside another top-level element). Callers must
//! take the ready record after every line, before feeding the next one.
//!
//! Child tokens that arrive while the wrong kind is open (`nd` inside a
//! relation, `member` inside a way, either with nothing open) are ignored.

pub mod stream;

pub use stream::{ingest, ErrorPolicy, IngestStats, Records};

use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::markup::{tokenize, Token, TokenKind};
use crate::model::{namespaced_id, ElementKind, Metadata, Node, Record, Relation, Way};

const NODE: &str = "node";
const WAY: &str = "way";
const RELATION: &str = "relation";
const WAY_NODE: &str = "nd";
const MEMBER: &str = "member";
const TAG: &str = "tag";

/// Single-slot record assembler.
///
/// Independent instances share nothing; run one per input stream.
#[derive(Debug, Default)]
pub struct Assembler {
    current: Option<Record>,
    ready: bool,
    discarded: u64,
}

impl Assembler {
    /// Creates an assembler with no open record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes one line and applies it.
    pub fn feed(&mut self, line: &str) -> Result<(), ParseError> {
        let token = tokenize(line)?;
        self.apply(&token)
    }

    /// Applies one token.
    ///
    /// On error the assembler is left exactly as it was.
    pub fn apply(&mut self, token: &Token<'_>) -> Result<(), ParseError> {
        match token.kind {
            TokenKind::Start => {
                self.open(token)?;
                self.ready = false;
            }
            TokenKind::End => self.close(token.name),
            TokenKind::Empty | TokenKind::Complete => {
                self.open(token)?;
                self.close(token.name);
            }
            TokenKind::Declaration => {}
        }
        Ok(())
    }

    /// Returns true if the current record is complete.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Borrows the ready record without taking it.
    pub fn ready_record(&self) -> Option<&Record> {
        if self.ready { self.current.as_ref() } else { None }
    }

    /// Takes the ready record, leaving the slot empty.
    ///
    /// Returns `None` while the current record is still open or was closed
    /// without reaching its minimum shape.
    pub fn take_ready(&mut self) -> Option<Record> {
        if !self.ready {
            return None;
        }
        self.ready = false;
        self.current.take()
    }

    /// Borrows the record in the slot, finished or not.
    pub fn pending(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Number of records replaced before they were taken.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn open(&mut self, token: &Token<'_>) -> Result<(), ParseError> {
        match token.name {
            NODE => {
                let node = Node {
                    meta: metadata(token, NODE)?,
                    lat: coordinate(token, "lat")?,
                    lon: coordinate(token, "lon")?,
                };
                self.replace(Record::Node(node));
            }
            WAY => {
                let way = Way {
                    meta: metadata(token, WAY)?,
                    nodes: Vec::new(),
                };
                self.replace(Record::Way(way));
            }
            RELATION => {
                let relation = Relation {
                    meta: metadata(token, RELATION)?,
                    members: Vec::new(),
                };
                self.replace(Record::Relation(relation));
            }
            WAY_NODE => {
                let raw = attribute(token, WAY_NODE, "ref")?;
                match self.current.as_mut() {
                    Some(Record::Way(way)) => way.push_node(ElementKind::Node.reference(raw)),
                    other => ignored_child(WAY_NODE, other.map(|r| r.kind())),
                }
            }
            MEMBER => {
                let kind = attribute(token, MEMBER, "type")?;
                let raw = attribute(token, MEMBER, "ref")?;
                let reference = namespaced_id(kind, raw)?;
                let role = token.attribute("role").unwrap_or("");
                match self.current.as_mut() {
                    Some(Record::Relation(relation)) => relation.push_member(role, reference),
                    other => ignored_child(MEMBER, other.map(|r| r.kind())),
                }
            }
            TAG => {
                let key = attribute(token, TAG, "k")?;
                let value = token.attribute("v").unwrap_or("");
                match self.current.as_mut() {
                    Some(record) => {
                        record.meta_mut().insert_tag(key, value);
                    }
                    None => ignored_child(TAG, None),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        self.ready = match (ElementKind::from_name(name), &self.current) {
            (Some(kind), Some(record)) if record.kind() == kind => {
                let complete = record.has_minimum_shape();
                if !complete {
                    debug!(kind = %kind, id = record.id(), "closed below minimum shape, not emitted");
                }
                complete
            }
            _ => false,
        };
    }

    fn replace(&mut self, record: Record) {
        if let Some(previous) = self.current.replace(record) {
            if self.ready {
                warn!(kind = %previous.kind(), id = previous.id(), "ready record replaced before it was taken");
            } else {
                debug!(kind = %previous.kind(), id = previous.id(), "discarding unfinished record");
            }
            self.discarded += 1;
        }
    }
}

fn ignored_child(child: &str, current: Option<ElementKind>) {
    debug!(child, current = ?current, "child element outside its parent, ignored");
}

/// Reads the attributes shared by nodes, ways and relations.
fn metadata(token: &Token<'_>, element: &'static str) -> Result<Metadata, ParseError> {
    Ok(Metadata {
        id: required(token, element, "id")?,
        user: token.attribute("user").map(str::to_string),
        uid: optional(token, element, "uid")?,
        visible: token.attribute("visible").is_some_and(parse_flag),
        version: optional(token, element, "version")?,
        changeset: optional(token, element, "changeset")?,
        timestamp: token.attribute("timestamp").map(str::to_string),
        tags: Default::default(),
    })
}

/// `"true"` in any ASCII case is true; anything else, including a
/// missing attribute, is false.
fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn attribute<'a>(
    token: &Token<'a>,
    element: &'static str,
    name: &'static str,
) -> Result<&'a str, ParseError> {
    token.attribute(name).ok_or(ParseError::MissingAttribute {
        element,
        attribute: name,
    })
}

fn required<T: FromStr>(
    token: &Token<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<T, ParseError> {
    let raw = attribute(token, element, name)?;
    parse_number(raw, element, name)
}

/// Node coordinates must be finite; `f64::from_str` also accepts `NaN`
/// and `inf`.
fn coordinate(token: &Token<'_>, name: &'static str) -> Result<f64, ParseError> {
    let raw = attribute(token, NODE, name)?;
    match parse_number::<f64>(raw, NODE, name)? {
        value if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidAttribute {
            element: NODE,
            attribute: name,
            value: raw.to_string(),
        }),
    }
}

fn optional<T: FromStr>(
    token: &Token<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<Option<T>, ParseError> {
    token
        .attribute(name)
        .map(|raw| parse_number(raw, element, name))
        .transpose()
}

fn parse_number<T: FromStr>(
    raw: &str,
    element: &'static str,
    name: &'static str,
) -> Result<T, ParseError> {
    raw.parse().map_err(|_| ParseError::InvalidAttribute {
        element,
        attribute: name,
        value: raw.to_string(),
    })
}
