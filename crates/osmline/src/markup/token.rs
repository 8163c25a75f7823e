//! Token types produced by the tokenizer.

use rustc_hash::FxHashMap;

/// The shape of the markup found on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `<name attrs>` with no close on the same line.
    Start,
    /// `</name>`.
    End,
    /// `<name attrs/>` or `<name attrs />`.
    Empty,
    /// `<name attrs>text</name>` on one line.
    Complete,
    /// `<?name attrs?>`.
    Declaration,
}

/// Ordered attribute set of one token.
///
/// Keys are unique; inserting an existing key replaces its value in place,
/// so the last occurrence on the line wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes<'a> {
    entries: Vec<(&'a str, &'a str)>,
    /// Key -> position in `entries`.
    index: FxHashMap<&'a str, usize>,
}

impl<'a> Attributes<'a> {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an attribute.
    pub fn insert(&mut self, key: &'a str, value: &'a str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.entries.iter().copied()
    }
}

/// One line of markup, borrowing from the line it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Element name, always a valid identifier.
    pub name: &'a str,
    pub attributes: Attributes<'a>,
    /// Inner text; non-empty only for [`TokenKind::Complete`].
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub(crate) fn new(kind: TokenKind, name: &'a str, attributes: Attributes<'a>) -> Self {
        Self {
            kind,
            name,
            attributes,
            text: "",
        }
    }

    /// Returns the value of an attribute, if present.
    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes.get(key)
    }

    /// Returns true if the attribute is present.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains(key)
    }
}
