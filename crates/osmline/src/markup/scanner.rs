//! Byte cursor over a single trimmed line.
//!
//! All positions the scanner stops at follow an ASCII byte, so slicing the
//! underlying `str` at the cursor is always on a char boundary.

use crate::error::MarkupFault;

/// Cursor for reading markup pieces from one line.
#[derive(Debug, Clone)]
pub(crate) struct Scanner<'a> {
    data: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner over a string slice.
    pub fn new(data: &'a str) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the unread part of the input.
    pub fn remaining(&self) -> &'a str {
        &self.data[self.pos..]
    }

    /// Returns true if all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the next byte without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.data.as_bytes().get(self.pos).copied()
    }

    /// Consumes `byte` if it is next. Only ASCII bytes may be passed.
    #[inline]
    pub fn eat(&mut self, byte: u8) -> bool {
        debug_assert!(byte.is_ascii());
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Reads an identifier matching `[A-Za-z_][A-Za-z0-9_\-:]*`.
    ///
    /// Returns `None` without consuming anything if the next byte cannot
    /// start an identifier.
    pub fn read_name(&mut self) -> Option<&'a str> {
        let bytes = self.data.as_bytes();
        let start = self.pos;
        match bytes.get(start) {
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
            _ => return None,
        }
        let mut end = start + 1;
        while let Some(&b) = bytes.get(end) {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':') {
                end += 1;
            } else {
                break;
            }
        }
        self.pos = end;
        Some(&self.data[start..end])
    }

    /// Reads a value delimited by `"` or `'`, returning the text between the
    /// quotes.
    ///
    /// The opposite quote character may not appear inside the value.
    pub fn read_quoted(&mut self) -> Result<&'a str, MarkupFault> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(MarkupFault::UnquotedValue),
        };
        let opposite = if quote == b'"' { b'\'' } else { b'"' };

        let start = self.pos + 1;
        for (offset, &b) in self.data.as_bytes()[start..].iter().enumerate() {
            if b == quote {
                let end = start + offset;
                self.pos = end + 1;
                return Ok(&self.data[start..end]);
            }
            if b == opposite {
                return Err(MarkupFault::EmbeddedQuote);
            }
        }
        Err(MarkupFault::UnterminatedValue)
    }
}
