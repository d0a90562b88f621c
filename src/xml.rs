//! XML codec for the attribute-free subset used by the document tree.
//!
//! Parsing yields a root whose children are `(tag, content)` entries; a
//! content node holds either trimmed, entity-decoded text or its own entries.
//! Serialization sorts object entries by key bytes (stable for duplicates),
//! names array elements `item0`, `item1`, ... and escapes text.

use std::cmp::Ordering;

use crate::arena::{Arena, BufferId, NodeId};
use crate::error::{ParseErrorKind, PooldocError, Result};
use crate::json::discard;
use crate::node::Shape;

/// Element name used for a bare scalar or empty node at the top level.
pub const VALUE_ELEMENT: &str = "value";

/// Prefix of the synthesized element names of array items.
pub const ITEM_PREFIX: &str = "item";

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-')
}

/// True if `name` matches `[A-Za-z_][A-Za-z0-9._:-]*`.
pub fn is_valid_name(name: &[u8]) -> bool {
    match name.split_first() {
        Some((&first, rest)) => is_name_start(first) && rest.iter().all(|&b| is_name_byte(b)),
        None => false,
    }
}

/// Parses an XML document into a root node of `(tag, content)` entries.
///
/// Processing instructions, comments and `<!...>` declarations are skipped.
/// Stray text between top-level elements is ignored. On failure everything
/// allocated so far is released.
///
/// # Errors
/// `Parse` (`BadTagStart`, `UnterminatedTag`, `MismatchedClosingTag`,
/// `MixedContentUnsupported`, `UnexpectedEof`), `RecursionLimit`,
/// `OutOfCapacity`.
pub fn parse_xml(arena: &mut Arena, src: &[u8]) -> Result<NodeId> {
    let max_depth = arena.config().max_depth;
    let mut parser = XmlParser {
        src,
        pos: 0,
        arena,
        max_depth,
    };
    parser.parse_document().inspect_err(|e| {
        tracing::debug!(error = %e, "XML parse failed");
    })
}

/// Serializes a tree into a new XML buffer.
///
/// An object-shaped root emits its entries without a wrapper element; an
/// array-shaped root emits `item0`, `item1`, ...; a scalar or empty root is
/// wrapped in `<value>`.
///
/// # Errors
/// `InvalidArgument` for keys that are not valid element names or malformed
/// trees, `RecursionLimit`, `OutOfCapacity`.
pub fn serialize_xml(arena: &mut Arena, node: NodeId) -> Result<BufferId> {
    let mut out = arena.buffer_create()?;
    let written = match arena.node_shape(node) {
        Ok(Shape::Object) => write_entries(arena, &mut out, node, 0),
        Ok(Shape::Array) => write_items(arena, &mut out, node, 0),
        Ok(_) => write_element(arena, &mut out, &ElementName::Value, node, 0),
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => Ok(out),
        Err(e) => {
            if let Err(cleanup) = arena.buffer_destroy(out) {
                tracing::warn!(error = %cleanup, "failed to release partial XML output");
            }
            Err(e)
        }
    }
}

struct XmlParser<'s, 'a> {
    src: &'s [u8],
    pos: usize,
    arena: &'a mut Arena,
    max_depth: usize,
}

impl<'s> XmlParser<'s, '_> {
    fn error_at(&self, kind: ParseErrorKind, offset: usize) -> PooldocError {
        PooldocError::parse(kind, offset)
    }

    fn eof(&self) -> PooldocError {
        self.error_at(ParseErrorKind::UnexpectedEof, self.src.len())
    }

    fn rest(&self) -> &'s [u8] {
        let src = self.src;
        src.get(self.pos..).unwrap_or_default()
    }

    fn skip_ws(&mut self) {
        while self.src.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    /// Moves past the next occurrence of `terminator`.
    fn skip_past(&mut self, terminator: &[u8]) -> Result<()> {
        let found = self
            .rest()
            .windows(terminator.len())
            .position(|w| w == terminator);
        match found {
            Some(at) => {
                self.pos += at + terminator.len();
                Ok(())
            }
            None => Err(self.eof()),
        }
    }

    /// Skips a comment, processing instruction or declaration at `pos`.
    /// Returns false if `pos` does not start one.
    fn skip_markup(&mut self) -> Result<bool> {
        let rest = self.rest();
        if rest.starts_with(b"<!--") {
            self.pos += 4;
            self.skip_past(b"-->")?;
        } else if rest.starts_with(b"<?") {
            self.pos += 2;
            self.skip_past(b"?>")?;
        } else if rest.starts_with(b"<!") {
            self.pos += 2;
            self.skip_past(b">")?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    fn parse_document(&mut self) -> Result<NodeId> {
        if self.src.is_empty() {
            return Err(self.eof());
        }
        let root = self.arena.node_alloc()?;
        match self.parse_top_level(root) {
            Ok(()) => Ok(root),
            Err(e) => Err(discard(self.arena, Some(root), e)),
        }
    }

    fn parse_top_level(&mut self, root: NodeId) -> Result<()> {
        let mut tail: Option<NodeId> = None;
        loop {
            self.skip_ws();
            if self.pos >= self.src.len() {
                return Ok(());
            }
            if self.skip_markup()? {
                continue;
            }
            if self.src[self.pos] != b'<' {
                let rest = self.rest();
                self.pos += rest.iter().position(|&b| b == b'<').unwrap_or(rest.len());
                continue;
            }
            let entry = self.parse_element(1)?;
            self.link(root, &mut tail, entry)?;
        }
    }

    fn link(&mut self, parent: NodeId, tail: &mut Option<NodeId>, child: NodeId) -> Result<()> {
        self.arena.node_link(parent, *tail, child)?;
        *tail = Some(child);
        Ok(())
    }

    /// Scans an element name at `pos` without allocating.
    fn scan_name(&mut self) -> Result<&'s [u8]> {
        let start = self.pos;
        match self.src.get(start) {
            None => return Err(self.eof()),
            Some(&b) if !is_name_start(b) => {
                return Err(self.error_at(ParseErrorKind::BadTagStart, start));
            }
            Some(_) => {}
        }
        let len = self.src[start..]
            .iter()
            .position(|&b| !is_name_byte(b))
            .unwrap_or(self.src.len() - start);
        self.pos += len;
        let src = self.src;
        Ok(&src[start..start + len])
    }

    /// Expects `>` after optional whitespace.
    fn close_tag(&mut self) -> Result<()> {
        self.skip_ws();
        match self.src.get(self.pos) {
            Some(b'>') => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.error_at(ParseErrorKind::UnterminatedTag, self.pos)),
            None => Err(self.eof()),
        }
    }

    /// Parses `<name>...</name>` or `<name/>` at `pos` into an entry node.
    fn parse_element(&mut self, depth: usize) -> Result<NodeId> {
        if depth > self.max_depth {
            return Err(PooldocError::RecursionLimit {
                depth: self.max_depth,
            });
        }
        self.pos += 1;
        let name = self.scan_name()?;

        let key = self.arena.buffer_create_from_bytes(name)?;
        let entry = match self.arena.node_alloc() {
            Ok(entry) => entry,
            Err(e) => {
                self.arena.buffer_free(key)?;
                return Err(e);
            }
        };
        self.arena.node_mut(entry)?.payload = Some(key);
        match self.parse_element_body(entry, name, depth) {
            Ok(()) => Ok(entry),
            Err(e) => Err(discard(self.arena, Some(entry), e)),
        }
    }

    fn parse_element_body(&mut self, entry: NodeId, name: &[u8], depth: usize) -> Result<()> {
        let content = self.arena.node_alloc()?;
        self.arena.node_link(entry, None, content)?;

        self.skip_ws();
        match self.src.get(self.pos) {
            Some(b'/') => {
                self.pos += 1;
                return self.close_tag();
            }
            Some(b'>') => self.pos += 1,
            Some(_) => return Err(self.error_at(ParseErrorKind::UnterminatedTag, self.pos)),
            None => return Err(self.eof()),
        }

        let mut text: Option<BufferId> = None;
        let mut tail: Option<NodeId> = None;
        loop {
            self.skip_ws();
            if self.pos >= self.src.len() {
                return Err(self.eof());
            }
            let rest = self.rest();
            if rest.starts_with(b"</") {
                self.pos += 2;
                let closing_at = self.pos;
                if self.scan_name()? != name {
                    return Err(self.error_at(ParseErrorKind::MismatchedClosingTag, closing_at));
                }
                return self.close_tag();
            }
            if self.skip_markup()? {
                continue;
            }
            if rest[0] == b'<' {
                if text.is_some() {
                    return Err(self.error_at(ParseErrorKind::MixedContentUnsupported, self.pos));
                }
                let child = self.parse_element(depth + 1)?;
                self.link(content, &mut tail, child)?;
                continue;
            }

            let start = self.pos;
            let len = rest.iter().position(|&b| b == b'<').unwrap_or(rest.len());
            let chunk = self.src[start..start + len].trim_ascii_end();
            self.pos += len;
            if tail.is_some() {
                return Err(self.error_at(ParseErrorKind::MixedContentUnsupported, start));
            }
            let mut buf = match text {
                Some(buf) => buf,
                None => {
                    let buf = self.arena.buffer_create()?;
                    self.arena.node_mut(content)?.payload = Some(buf);
                    buf
                }
            };
            // A partial append may already have rebound the handle.
            let appended = self.arena.append_xml_text(&mut buf, chunk);
            self.arena.node_mut(content)?.payload = Some(buf);
            appended?;
            text = Some(buf);
        }
    }
}

enum ElementName {
    Key(BufferId),
    Item(usize),
    Value,
}

fn write_open(arena: &mut Arena, out: &mut BufferId, name: &ElementName) -> Result<()> {
    arena.buffer_append_byte(out, b'<')?;
    write_name(arena, out, name)
}

fn write_name(arena: &mut Arena, out: &mut BufferId, name: &ElementName) -> Result<()> {
    match name {
        ElementName::Key(key) => arena.buffer_append(out, *key),
        ElementName::Item(index) => arena.buffer_append_str(out, &format!("{ITEM_PREFIX}{index}")),
        ElementName::Value => arena.buffer_append_str(out, VALUE_ELEMENT),
    }
}

fn write_close(arena: &mut Arena, out: &mut BufferId, name: &ElementName) -> Result<()> {
    arena.buffer_append_bytes(out, b"</")?;
    write_name(arena, out, name)?;
    arena.buffer_append_byte(out, b'>')
}

fn write_element(
    arena: &mut Arena,
    out: &mut BufferId,
    name: &ElementName,
    node: NodeId,
    depth: usize,
) -> Result<()> {
    let max_depth = arena.config().max_depth;
    if depth > max_depth {
        return Err(PooldocError::RecursionLimit { depth: max_depth });
    }
    let shape = arena.node_shape(node)?;
    write_open(arena, out, name)?;
    match shape {
        Shape::Empty => return arena.buffer_append_bytes(out, b"/>"),
        Shape::Scalar => {
            arena.buffer_append_byte(out, b'>')?;
            if let Some(payload) = arena.node_payload(node)? {
                arena.write_xml_escaped(out, payload)?;
            }
        }
        Shape::Object => {
            arena.buffer_append_byte(out, b'>')?;
            write_entries(arena, out, node, depth + 1)?;
        }
        Shape::Array => {
            arena.buffer_append_byte(out, b'>')?;
            write_items(arena, out, node, depth + 1)?;
        }
        Shape::Entry => {
            return Err(PooldocError::InvalidArgument(format!(
                "{node:?} is an object entry, not a value"
            )));
        }
    }
    write_close(arena, out, name)
}

/// Emits the entries of an object node sorted by key bytes.
fn write_entries(arena: &mut Arena, out: &mut BufferId, node: NodeId, depth: usize) -> Result<()> {
    let mut entries: Vec<(BufferId, NodeId)> = Vec::new();
    for entry in arena.node_children(node)? {
        let cell = arena.node(entry)?;
        if let (Some(key), Some(value)) = (cell.payload, cell.child) {
            let bytes = arena.buffer_bytes(key)?;
            if !is_valid_name(bytes) {
                return Err(PooldocError::InvalidArgument(format!(
                    "key {:?} is not a valid XML element name",
                    String::from_utf8_lossy(bytes)
                )));
            }
            entries.push((key, value));
        }
    }
    // Stable: duplicate keys keep their insertion order.
    entries.sort_by(|(a, _), (b, _)| match (arena.buffer_bytes(*a), arena.buffer_bytes(*b)) {
        (Ok(a), Ok(b)) => a.cmp(b),
        _ => Ordering::Equal,
    });
    for (key, value) in entries {
        write_element(arena, out, &ElementName::Key(key), value, depth)?;
    }
    Ok(())
}

fn write_items(arena: &mut Arena, out: &mut BufferId, node: NodeId, depth: usize) -> Result<()> {
    let mut item = arena.node(node)?.child;
    let mut index = 0;
    while let Some(current) = item {
        write_element(arena, out, &ElementName::Item(index), current, depth)?;
        index += 1;
        item = arena.node(current)?.next;
    }
    Ok(())
}
