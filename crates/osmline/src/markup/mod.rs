//! Single-line markup tokenizer.
//!
//! Recognizes exactly one tag per line, in this priority:
//!
//! | Shape       | Form                          |
//! |-------------|-------------------------------|
//! | Declaration | `<?name attrs?>`              |
//! | End         | `</name>`                     |
//! | Empty       | `<name attrs/>`, `<name attrs />` |
//! | Complete    | `<name attrs>text</name>`     |
//! | Start       | `<name attrs>`                |
//!
//! Attributes are `key="value"` or `key='value'`, separated by single spaces,
//! with no space around `=`. A value may not contain the quote character that
//! was not used to delimit it. This is narrower than XML quoting and is kept
//! that way on purpose: widening it changes which lines are accepted.
//!
//! The tokenizer has no state and knows nothing about OSM elements.

mod scanner;
mod token;

pub use token::{Attributes, Token, TokenKind};

use crate::error::{MarkupFault, ParseError};
use scanner::Scanner;

/// Tokenizes one line of markup. Surrounding whitespace is ignored.
pub fn tokenize(line: &str) -> Result<Token<'_>, ParseError> {
    let line = line.trim();
    tokenize_trimmed(line).map_err(|fault| ParseError::malformed(line, fault))
}

fn tokenize_trimmed(line: &str) -> Result<Token<'_>, MarkupFault> {
    if line.is_empty() {
        return Err(MarkupFault::EmptyLine);
    }
    if let Some(rest) = line.strip_prefix("<?") {
        return declaration(rest);
    }
    if let Some(rest) = line.strip_prefix("</") {
        let name = end_tag(rest)?;
        return Ok(Token::new(TokenKind::End, name, Attributes::new()));
    }
    if let Some(rest) = line.strip_prefix('<') {
        return open_tag(rest);
    }
    Err(MarkupFault::UnexpectedStart)
}

fn declaration(rest: &str) -> Result<Token<'_>, MarkupFault> {
    let inner = rest
        .strip_suffix("?>")
        .ok_or(MarkupFault::UnterminatedDeclaration)?;

    let mut scanner = Scanner::new(inner);
    let mut attributes = Attributes::new();
    let name = read_head(&mut scanner, &mut attributes)?;
    if !scanner.is_empty() {
        // Only `/` or `>` can stop the head early, neither belongs here.
        return Err(MarkupFault::TrailingContent);
    }
    Ok(Token::new(TokenKind::Declaration, name, attributes))
}

/// Parses the `name>` part of an end tag and returns the name.
fn end_tag(rest: &str) -> Result<&str, MarkupFault> {
    if rest.starts_with(char::is_whitespace) {
        return Err(MarkupFault::SpaceInEndTag);
    }
    let mut scanner = Scanner::new(rest);
    let name = scanner.read_name().ok_or(MarkupFault::InvalidName)?;
    match scanner.remaining() {
        ">" => Ok(name),
        "" => Err(MarkupFault::UnterminatedTag),
        r if r.starts_with(char::is_whitespace) => Err(MarkupFault::SpaceInEndTag),
        _ => Err(MarkupFault::TrailingContent),
    }
}

fn open_tag(rest: &str) -> Result<Token<'_>, MarkupFault> {
    let mut scanner = Scanner::new(rest);
    let mut attributes = Attributes::new();
    let name = read_head(&mut scanner, &mut attributes)?;
    let tail = scanner.remaining();

    if let Some(after) = tail.strip_prefix('/') {
        return if after == ">" {
            Ok(Token::new(TokenKind::Empty, name, attributes))
        } else {
            Err(MarkupFault::MalformedSelfClose)
        };
    }

    let after = tail.strip_prefix('>').ok_or(MarkupFault::UnterminatedTag)?;
    if after.is_empty() {
        return Ok(Token::new(TokenKind::Start, name, attributes));
    }

    let close_at = after.rfind("</").ok_or(MarkupFault::TrailingContent)?;
    let close_name = end_tag(&after[close_at + 2..])?;
    if close_name != name {
        return Err(MarkupFault::MismatchedClose);
    }

    let mut token = Token::new(TokenKind::Complete, name, attributes);
    token.text = &after[..close_at];
    Ok(token)
}

/// Reads an element name and its attributes.
///
/// Stops before `>`, `/` or end of input. A single space is tolerated
/// before the stop.
fn read_head<'a>(
    scanner: &mut Scanner<'a>,
    attributes: &mut Attributes<'a>,
) -> Result<&'a str, MarkupFault> {
    let name = scanner.read_name().ok_or(MarkupFault::InvalidName)?;
    let mut first = true;

    loop {
        match scanner.peek() {
            None | Some(b'>' | b'/') => return Ok(name),
            Some(b' ') => {
                scanner.eat(b' ');
            }
            Some(_) if first => return Err(MarkupFault::InvalidName),
            Some(_) => return Err(MarkupFault::MissingSeparator),
        }
        first = false;

        match scanner.peek() {
            None | Some(b'>' | b'/') => return Ok(name),
            Some(b' ') => return Err(MarkupFault::ExtraSpace),
            Some(_) => {}
        }

        let key = scanner.read_name().ok_or(MarkupFault::InvalidName)?;
        if !scanner.eat(b'=') {
            return Err(match scanner.peek() {
                Some(b' ') => MarkupFault::SpaceAroundEquals,
                _ => MarkupFault::MissingEquals,
            });
        }
        if scanner.peek() == Some(b' ') {
            return Err(MarkupFault::SpaceAroundEquals);
        }
        let value = scanner.read_quoted()?;
        attributes.insert(key, value);
    }
}
