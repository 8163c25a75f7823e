//! Error types for tokenizing, assembling, encoding and validating records.

use thiserror::Error;

/// Why a line was rejected by the markup tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupFault {
    /// M001: Line is empty after trimming
    EmptyLine,
    /// M002: Line does not start with `<`
    UnexpectedStart,
    /// M003: Element or attribute name is not a valid identifier
    InvalidName,
    /// M004: Whitespace inside `</name>`
    SpaceInEndTag,
    /// M005: More than one space between attributes or before the tag end
    ExtraSpace,
    /// M006: Space before or after `=`
    SpaceAroundEquals,
    /// M007: Attribute key not followed by `=`
    MissingEquals,
    /// M008: Attribute value not opened by `"` or `'`
    UnquotedValue,
    /// M009: Attribute value never closed
    UnterminatedValue,
    /// M010: Value contains the quote character not used to delimit it
    EmbeddedQuote,
    /// M011: Attribute follows another without a separating space
    MissingSeparator,
    /// M012: Self-closing tag is not exactly `/>`
    MalformedSelfClose,
    /// M013: Declaration does not end with `?>`
    UnterminatedDeclaration,
    /// M014: Tag never reaches its closing `>`
    UnterminatedTag,
    /// M015: Closing tag name differs from the opening name
    MismatchedClose,
    /// M016: Content after the tag that is not a closing tag
    TrailingContent,
}

impl MarkupFault {
    /// Returns the fault code string (e.g., "M001").
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyLine => "M001",
            Self::UnexpectedStart => "M002",
            Self::InvalidName => "M003",
            Self::SpaceInEndTag => "M004",
            Self::ExtraSpace => "M005",
            Self::SpaceAroundEquals => "M006",
            Self::MissingEquals => "M007",
            Self::UnquotedValue => "M008",
            Self::UnterminatedValue => "M009",
            Self::EmbeddedQuote => "M010",
            Self::MissingSeparator => "M011",
            Self::MalformedSelfClose => "M012",
            Self::UnterminatedDeclaration => "M013",
            Self::UnterminatedTag => "M014",
            Self::MismatchedClose => "M015",
            Self::TrailingContent => "M016",
        }
    }

    /// Returns a human-readable message for this fault.
    pub fn message(self) -> &'static str {
        match self {
            Self::EmptyLine => "empty line",
            Self::UnexpectedStart => "line does not start with a tag",
            Self::InvalidName => "invalid name",
            Self::SpaceInEndTag => "whitespace in end tag",
            Self::ExtraSpace => "unexpected extra space",
            Self::SpaceAroundEquals => "space around '='",
            Self::MissingEquals => "attribute without '='",
            Self::UnquotedValue => "unquoted attribute value",
            Self::UnterminatedValue => "unterminated attribute value",
            Self::EmbeddedQuote => "opposite quote character inside value",
            Self::MissingSeparator => "attributes not separated by a space",
            Self::MalformedSelfClose => "malformed self-closing tag",
            Self::UnterminatedDeclaration => "declaration not closed by '?>'",
            Self::UnterminatedTag => "unterminated tag",
            Self::MismatchedClose => "closing tag does not match opening tag",
            Self::TrailingContent => "unexpected content after tag",
        }
    }
}

impl std::fmt::Display for MarkupFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

/// Error while turning a line into a token or a token into a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("malformed markup {fault}: {line:?}")]
    MalformedMarkup { line: String, fault: MarkupFault },

    #[error("unknown reference kind: {kind:?}")]
    UnknownReferenceKind { kind: String },

    #[error("<{element}> is missing required attribute {attribute:?}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("<{element}> attribute {attribute:?} has invalid value {value:?}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

impl ParseError {
    pub(crate) fn malformed(line: &str, fault: MarkupFault) -> Self {
        ParseError::MalformedMarkup {
            line: line.to_string(),
            fault,
        }
    }

    /// Returns the tokenizer fault, if this is a markup error.
    pub fn fault(&self) -> Option<MarkupFault> {
        match self {
            ParseError::MalformedMarkup { fault, .. } => Some(*fault),
            _ => None,
        }
    }
}

/// Error while reading a line stream.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line_number}: not valid UTF-8")]
    InvalidUtf8 { line_number: usize },

    #[error("line {line_number}: {source}")]
    Parse {
        line_number: usize,
        #[source]
        source: ParseError,
    },

    #[error("record sink failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Error during batch decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("invalid magic bytes: expected OSMB or OSMBZ, found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported batch version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid presence flag {value} in {field} (expected 0x00 or 0x01)")]
    InvalidFlag { field: &'static str, value: u8 },

    #[error("coordinate is NaN")]
    FloatIsNan,

    #[error("{field} value {value} does not fit its column type")]
    ValueOutOfRange { field: &'static str, value: i64 },

    #[error("trailing {len} bytes after batch")]
    TrailingBytes { len: usize },

    #[error("zstd decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("decompressed size {actual} doesn't match declared {declared}")]
    UncompressedSizeMismatch { declared: usize, actual: usize },
}

/// Error during batch encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("node {id} has a NaN coordinate")]
    FloatIsNan { id: i64 },

    #[error("zstd compression failed: {0}")]
    CompressionFailed(String),

    #[error("failed to write batch: {0}")]
    Write(String),
}

/// Error during semantic validation of an assembled record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("node {id} latitude {lat} out of range [-90, +90]")]
    LatitudeOutOfRange { id: i64, lat: f64 },

    #[error("node {id} longitude {lon} out of range [-180, +180]")]
    LongitudeOutOfRange { id: i64, lon: f64 },

    #[error("{kind} {id} references malformed id {reference:?}")]
    MalformedReference {
        kind: &'static str,
        id: i64,
        reference: String,
    },

    #[error("way {id} has {count} node references (minimum 2)")]
    TooFewNodes { id: i64, count: usize },

    #[error("relation {id} has no members")]
    EmptyRelation { id: i64 },
}
