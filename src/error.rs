//! Centralized error handling for pooldoc.
//!
//! Every fallible operation in the crate returns [`Result`]. Nothing panics and
//! nothing aborts: running out of slots, presenting a stale handle, malformed
//! input and failed path lookups are all ordinary values the caller can match on.
//!
//! ## Error Categories
//!
//! - **Capacity** ([`PooldocError::OutOfCapacity`]): the request exceeds the
//!   largest size class or the relevant free-list is exhausted. Recoverable.
//! - **Arguments** ([`PooldocError::InvalidArgument`]): stale or double-freed
//!   handles, slots whose capacity matches no class, malformed trees.
//! - **Parsing** ([`PooldocError::Parse`]): JSON/XML syntax errors, with the
//!   byte offset where the problem was detected.
//! - **Paths** ([`PooldocError::Path`]): dotted-path traversal failures.
//! - **Depth** ([`PooldocError::RecursionLimit`]): nesting beyond the
//!   configured maximum.
//! - **I/O** ([`PooldocError::Io`]): only produced by the [`crate::io`] helpers.
//!
//! ## Usage
//!
//! ```rust
//! use pooldoc::{Arena, ArenaConfig, ParseErrorKind, PooldocError, parse_json};
//!
//! let mut arena = Arena::new(ArenaConfig::small())?;
//! match parse_json(&mut arena, br#"{"a":}"#) {
//!     Err(PooldocError::Parse { kind, offset }) => {
//!         assert_eq!(kind, ParseErrorKind::ExpectedValue);
//!         assert_eq!(offset, 5);
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok::<(), PooldocError>(())
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for pooldoc operations.
pub type Result<T> = std::result::Result<T, PooldocError>;

/// The syntax error categories reported by the JSON and XML parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Input ended where more was required.
    UnexpectedEof,
    /// A JSON string has no closing quote.
    UnterminatedString,
    /// A JSON value was required but something else was found.
    ExpectedValue,
    /// A JSON object key (a string) was required.
    ExpectedKey,
    /// A `:` was required after a JSON object key.
    ExpectedColon,
    /// A `,` or the container's closing bracket was required.
    ExpectedCommaOrClose,
    /// A backslash escape is not one of the recognized forms.
    InvalidEscape,
    /// A bare JSON token is neither `true`, `false`, `null` nor a number.
    InvalidPrimitive,
    /// Non-whitespace input follows the top-level JSON value.
    TrailingCharacters,
    /// A buffer does not hold a valid decimal integer.
    InvalidInteger,
    /// An XML tag name does not start with a letter or `_`.
    BadTagStart,
    /// An XML tag is not closed by `>` (attributes land here too).
    UnterminatedTag,
    /// An XML closing tag names a different element than the open one.
    MismatchedClosingTag,
    /// An XML element holds both text and child elements.
    MixedContentUnsupported,
}

impl ParseErrorKind {
    /// Short human readable description.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedEof => "unexpected end of input",
            Self::UnterminatedString => "unterminated string",
            Self::ExpectedValue => "expected a value",
            Self::ExpectedKey => "expected an object key",
            Self::ExpectedColon => "expected ':'",
            Self::ExpectedCommaOrClose => "expected ',' or closing bracket",
            Self::InvalidEscape => "invalid escape sequence",
            Self::InvalidPrimitive => "invalid primitive literal",
            Self::TrailingCharacters => "trailing characters after document",
            Self::InvalidInteger => "invalid integer",
            Self::BadTagStart => "bad tag start",
            Self::UnterminatedTag => "unterminated tag",
            Self::MismatchedClosingTag => "mismatched closing tag",
            Self::MixedContentUnsupported => "mixed content is not supported",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dotted-path traversal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathErrorKind {
    /// No entry of the current object has the segment as its key.
    KeyNotFound,
    /// The current array (or leaf) has no child at the requested index.
    IndexOutOfRange,
    /// A segment is longer than [`crate::path::MAX_SEGMENT_LEN`] bytes.
    SegmentTooLong,
}

impl fmt::Display for PathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::KeyNotFound => "key not found",
            Self::IndexOutOfRange => "index out of range",
            Self::SegmentTooLong => "segment too long",
        };
        f.write_str(s)
    }
}

/// The master error enum covering all failure domains in pooldoc.
///
/// This type is `Clone` so errors can be stored and compared in tests;
/// I/O errors are wrapped in `Arc` for that reason.
#[derive(Debug, Clone)]
pub enum PooldocError {
    /// The allocation cannot be satisfied.
    ///
    /// Either `requested` exceeds the largest size class, or the free-list of
    /// the chosen class (or the node free-list) is empty.
    OutOfCapacity {
        /// Requested capacity in bytes (0 for node allocations).
        requested: usize,
        /// Which pool ran dry, or why the request was refused.
        detail: String,
    },

    /// A handle or argument is not acceptable.
    ///
    /// ## Common Causes
    ///
    /// - Freeing a buffer or node twice
    /// - Using a handle after it was freed or rebound by a mutating call
    /// - A slot whose capacity matches no size class
    /// - Serializing a tree that mixes entry-shaped and value-shaped children
    InvalidArgument(String),

    /// The JSON or XML input is malformed.
    Parse {
        /// What went wrong.
        kind: ParseErrorKind,
        /// Byte offset in the input where the problem was detected.
        offset: usize,
    },

    /// A dotted-path lookup failed.
    Path {
        /// What went wrong.
        kind: PathErrorKind,
        /// The segment being resolved when the lookup failed.
        segment: String,
    },

    /// The document nests deeper than the configured maximum.
    RecursionLimit {
        /// The configured maximum depth.
        depth: usize,
    },

    /// Low-level I/O failure from the file helpers.
    Io(Arc<io::Error>),
}

impl PooldocError {
    pub(crate) fn parse(kind: ParseErrorKind, offset: usize) -> Self {
        Self::Parse { kind, offset }
    }

    pub(crate) fn path(kind: PathErrorKind, segment: &[u8]) -> Self {
        Self::Path {
            kind,
            segment: String::from_utf8_lossy(segment).into_owned(),
        }
    }

    /// Returns the parse error kind, if this is a parse error.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Self::Parse { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns the path error kind, if this is a path error.
    pub fn path_kind(&self) -> Option<PathErrorKind> {
        match self {
            Self::Path { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for [`PooldocError::OutOfCapacity`].
    pub fn is_out_of_capacity(&self) -> bool {
        matches!(self, Self::OutOfCapacity { .. })
    }
}

impl fmt::Display for PooldocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfCapacity { requested, detail } => {
                write!(f, "Out of capacity ({requested} bytes requested): {detail}")
            }
            Self::InvalidArgument(s) => write!(f, "Invalid argument: {s}"),
            Self::Parse { kind, offset } => write!(f, "Parse error at offset {offset}: {kind}"),
            Self::Path { kind, segment } => write!(f, "Path error at segment {segment:?}: {kind}"),
            Self::RecursionLimit { depth } => {
                write!(f, "Recursion limit exceeded (max depth {depth})")
            }
            Self::Io(e) => write!(f, "I/O Error: {e}"),
        }
    }
}

impl std::error::Error for PooldocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PooldocError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
