//! JSON codec.
//!
//! The parser keeps primitives (`true`, `false`, `null`, numbers) as their
//! raw lexeme, so `-1.5e+10` serializes back byte-for-byte. Strings are stored
//! decoded. The serializer never inserts whitespace.
//!
//! ```rust
//! use pooldoc::{Arena, ArenaConfig, parse_json, serialize_json};
//!
//! let mut arena = Arena::new(ArenaConfig::small())?;
//! let doc = parse_json(&mut arena, br#"{ "n" : -1.5e+10 }"#)?;
//! let out = serialize_json(&mut arena, doc)?;
//! assert_eq!(arena.buffer_bytes(out)?, br#"{"n":-1.5e+10}"#);
//! # Ok::<(), pooldoc::PooldocError>(())
//! ```

use crate::arena::{Arena, BufferId, Container, NodeId};
use crate::buffer::{decode_json_escape, is_json_primitive};
use crate::error::{ParseErrorKind, PooldocError, Result};
use crate::node::Shape;

/// Parses a complete JSON document into a new tree.
///
/// On failure every node and buffer allocated so far is released.
///
/// # Errors
/// `Parse` with the offending offset, `RecursionLimit` past the configured
/// depth, or `OutOfCapacity` if the arena runs dry.
pub fn parse_json(arena: &mut Arena, src: &[u8]) -> Result<NodeId> {
    let max_depth = arena.config().max_depth;
    let mut parser = JsonParser {
        src,
        pos: 0,
        arena,
        max_depth,
    };
    parser.parse_document().inspect_err(|e| {
        tracing::debug!(error = %e, "JSON parse failed");
    })
}

/// Serializes a tree into a new compact JSON buffer.
///
/// # Errors
/// `InvalidArgument` for malformed trees (an entry where a value belongs, a
/// container mixing entries and values), `RecursionLimit`, `OutOfCapacity`.
pub fn serialize_json(arena: &mut Arena, node: NodeId) -> Result<BufferId> {
    let mut out = arena.buffer_create()?;
    match write_value(arena, &mut out, node, 0) {
        Ok(()) => Ok(out),
        Err(e) => {
            if let Err(cleanup) = arena.buffer_destroy(out) {
                tracing::warn!(error = %cleanup, "failed to release partial JSON output");
            }
            Err(e)
        }
    }
}

/// Destroys a partially built subtree, keeping the original error.
pub(crate) fn discard(arena: &mut Arena, node: Option<NodeId>, err: PooldocError) -> PooldocError {
    if let Err(cleanup) = arena.node_destroy(node) {
        tracing::warn!(error = %cleanup, "cleanup after failed parse failed");
    }
    err
}

struct JsonParser<'s, 'a> {
    src: &'s [u8],
    pos: usize,
    arena: &'a mut Arena,
    max_depth: usize,
}

impl JsonParser<'_, '_> {
    fn error(&self, kind: ParseErrorKind) -> PooldocError {
        PooldocError::parse(kind, self.pos)
    }

    fn skip_ws(&mut self) {
        while matches!(self.src.get(self.pos), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Next non-whitespace byte, without consuming it.
    fn peek(&mut self) -> Result<u8> {
        self.skip_ws();
        self.src
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error(ParseErrorKind::UnexpectedEof))
    }

    fn parse_document(&mut self) -> Result<NodeId> {
        let root = self.parse_value(0)?;
        self.skip_ws();
        if self.pos < self.src.len() {
            let err = self.error(ParseErrorKind::TrailingCharacters);
            return Err(discard(self.arena, Some(root), err));
        }
        Ok(root)
    }

    fn parse_value(&mut self, depth: usize) -> Result<NodeId> {
        match self.peek()? {
            b'{' => self.parse_container(depth, Container::Object),
            b'[' => self.parse_container(depth, Container::Array),
            b'"' => {
                let text = self.parse_string()?;
                self.leaf(text)
            }
            b'}' | b']' | b',' | b':' => Err(self.error(ParseErrorKind::ExpectedValue)),
            _ => self.parse_primitive(),
        }
    }

    fn leaf(&mut self, payload: BufferId) -> Result<NodeId> {
        match self.arena.node_alloc() {
            Ok(node) => {
                self.arena.node_mut(node)?.payload = Some(payload);
                Ok(node)
            }
            Err(e) => {
                self.arena.buffer_free(payload)?;
                Err(e)
            }
        }
    }

    /// Parses a quoted string at `pos` into a buffer of decoded bytes.
    fn parse_string(&mut self) -> Result<BufferId> {
        let open = self.pos;
        let mut end = open + 1;
        loop {
            match self.src.get(end) {
                Some(b'"') => break,
                Some(b'\\') => end += 2,
                Some(_) => end += 1,
                None => return Err(PooldocError::parse(ParseErrorKind::UnterminatedString, open)),
            }
        }
        let raw = &self.src[open + 1..end];
        // Decoding never grows the text, so the raw length is enough.
        let buf = self.arena.buffer_alloc(raw.len())?;
        let decoded = {
            let slot = self.arena.slot_mut(buf)?;
            decode_string(raw, slot)
        };
        match decoded {
            Ok(len) => {
                self.arena.set_buffer_len(buf, len)?;
                self.pos = end + 1;
                Ok(buf)
            }
            Err(at) => {
                self.arena.buffer_free(buf)?;
                Err(PooldocError::parse(ParseErrorKind::InvalidEscape, open + 1 + at))
            }
        }
    }

    fn parse_primitive(&mut self) -> Result<NodeId> {
        let start = self.pos;
        let len = self.src[start..]
            .iter()
            .position(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b',' | b'}' | b']' | b':'))
            .unwrap_or(self.src.len() - start);
        let lexeme = &self.src[start..start + len];
        if !is_json_primitive(lexeme) {
            return Err(self.error(ParseErrorKind::InvalidPrimitive));
        }
        let payload = self.arena.buffer_create_from_bytes(lexeme)?;
        self.pos += len;
        self.leaf(payload)
    }

    fn parse_container(&mut self, depth: usize, kind: Container) -> Result<NodeId> {
        if depth >= self.max_depth {
            return Err(PooldocError::RecursionLimit {
                depth: self.max_depth,
            });
        }
        let node = self.arena.node_alloc()?;
        self.arena.node_mut(node)?.container = Some(kind);
        self.pos += 1;
        match self.parse_members(node, depth, kind) {
            Ok(()) => Ok(node),
            Err(e) => Err(discard(self.arena, Some(node), e)),
        }
    }

    /// Parses members up to and including the closing bracket, linking each
    /// one under `parent` as soon as it is complete.
    fn parse_members(&mut self, parent: NodeId, depth: usize, kind: Container) -> Result<()> {
        let close = match kind {
            Container::Object => b'}',
            Container::Array => b']',
        };
        if self.peek()? == close {
            self.pos += 1;
            return Ok(());
        }
        let mut tail: Option<NodeId> = None;
        loop {
            let member = match kind {
                Container::Object => self.parse_entry(depth)?,
                Container::Array => self.parse_value(depth + 1)?,
            };
            self.arena.node_link(parent, tail, member)?;
            tail = Some(member);

            match self.peek()? {
                b',' => self.pos += 1,
                b if b == close => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.error(ParseErrorKind::ExpectedCommaOrClose)),
            }
        }
    }

    fn parse_entry(&mut self, depth: usize) -> Result<NodeId> {
        if self.peek()? != b'"' {
            return Err(self.error(ParseErrorKind::ExpectedKey));
        }
        let key = self.parse_string()?;
        let entry = self.leaf(key)?;
        match self.parse_entry_value(depth) {
            Ok(value) => {
                self.arena.node_link(entry, None, value)?;
                Ok(entry)
            }
            Err(e) => Err(discard(self.arena, Some(entry), e)),
        }
    }

    fn parse_entry_value(&mut self, depth: usize) -> Result<NodeId> {
        if self.peek()? != b':' {
            return Err(self.error(ParseErrorKind::ExpectedColon));
        }
        self.pos += 1;
        self.parse_value(depth + 1)
    }
}

/// Decodes the body of a JSON string into `out`.
///
/// Returns the decoded length, or the offset within `raw` of a bad escape.
fn decode_string(raw: &[u8], out: &mut [u8]) -> std::result::Result<usize, usize> {
    let mut i = 0;
    let mut len = 0;
    while i < raw.len() {
        let (byte, consumed) = if raw[i] == b'\\' {
            decode_json_escape(raw, i).ok_or(i)?
        } else {
            (raw[i], 1)
        };
        *out.get_mut(len).ok_or(i)? = byte;
        len += 1;
        i += consumed;
    }
    Ok(len)
}

fn write_value(arena: &mut Arena, out: &mut BufferId, node: NodeId, depth: usize) -> Result<()> {
    let max_depth = arena.config().max_depth;
    if depth > max_depth {
        return Err(PooldocError::RecursionLimit { depth: max_depth });
    }
    let cell = *arena.node(node)?;
    match arena.node_shape(node)? {
        Shape::Scalar => {
            let Some(payload) = cell.payload else {
                return Ok(());
            };
            write_scalar(arena, out, payload)
        }
        Shape::Empty => {
            let literal: &[u8] = match cell.container {
                Some(Container::Object) => b"{}",
                Some(Container::Array) => b"[]",
                None => b"null",
            };
            arena.buffer_append_bytes(out, literal)
        }
        Shape::Object => {
            arena.buffer_append_byte(out, b'{')?;
            let mut entry = cell.child;
            let mut first = true;
            while let Some(e) = entry {
                let ecell = *arena.node(e)?;
                if !first {
                    arena.buffer_append_byte(out, b',')?;
                }
                first = false;
                if let (Some(key), Some(value)) = (ecell.payload, ecell.child) {
                    write_string(arena, out, key)?;
                    arena.buffer_append_byte(out, b':')?;
                    write_value(arena, out, value, depth + 1)?;
                }
                entry = ecell.next;
            }
            arena.buffer_append_byte(out, b'}')
        }
        Shape::Array => {
            arena.buffer_append_byte(out, b'[')?;
            let mut element = cell.child;
            let mut first = true;
            while let Some(e) = element {
                if !first {
                    arena.buffer_append_byte(out, b',')?;
                }
                first = false;
                write_value(arena, out, e, depth + 1)?;
                element = arena.node(e)?.next;
            }
            arena.buffer_append_byte(out, b']')
        }
        Shape::Entry => Err(PooldocError::InvalidArgument(format!(
            "{node:?} is an object entry, not a value"
        ))),
    }
}

fn write_scalar(arena: &mut Arena, out: &mut BufferId, payload: BufferId) -> Result<()> {
    if is_json_primitive(arena.buffer_bytes(payload)?) {
        arena.buffer_append(out, payload)
    } else {
        write_string(arena, out, payload)
    }
}

fn write_string(arena: &mut Arena, out: &mut BufferId, text: BufferId) -> Result<()> {
    arena.buffer_append_byte(out, b'"')?;
    arena.write_json_escaped(out, text)?;
    arena.buffer_append_byte(out, b'"')
}
