//! Dotted-path lookup over a document tree.
//!
//! `provide(arena, root, "b.0")` walks key `b` of an object, then index `0` of
//! an array. Lookup never mutates the tree.

use crate::arena::{Arena, NodeId};
use crate::error::{PathErrorKind, PooldocError, Result};
use crate::node::Shape;

/// Longest accepted path segment, in bytes.
pub const MAX_SEGMENT_LEN: usize = 255;

/// Resolves `path` starting at `node`.
///
/// Object-shaped nodes match segments by exact key bytes, even when the
/// segment is all digits. Array-shaped nodes take all-digit segments as
/// 0-based indices. The empty path yields `node` itself.
///
/// # Errors
/// `Path` with `KeyNotFound`, `IndexOutOfRange` or `SegmentTooLong`;
/// `InvalidArgument` for stale handles or malformed containers.
///
/// ```rust
/// use pooldoc::{Arena, ArenaConfig, PathErrorKind, parse_json, provide};
///
/// let mut arena = Arena::new(ArenaConfig::small())?;
/// let doc = parse_json(&mut arena, br#"{"b":[true,null]}"#)?;
/// let first = provide(&arena, doc, "b.0")?;
/// assert!(arena.buffer_equal_str(arena.node(first)?.payload.unwrap(), "true")?);
/// let missing = provide(&arena, doc, "b.5").unwrap_err();
/// assert_eq!(missing.path_kind(), Some(PathErrorKind::IndexOutOfRange));
/// # Ok::<(), pooldoc::PooldocError>(())
/// ```
pub fn provide(arena: &Arena, node: NodeId, path: &str) -> Result<NodeId> {
    arena.node(node)?;
    if path.is_empty() {
        return Ok(node);
    }
    path.split('.')
        .try_fold(node, |current, segment| step(arena, current, segment.as_bytes()))
}

fn is_index(segment: &[u8]) -> bool {
    !segment.is_empty() && segment.iter().all(u8::is_ascii_digit)
}

fn step(arena: &Arena, current: NodeId, segment: &[u8]) -> Result<NodeId> {
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(PooldocError::path(PathErrorKind::SegmentTooLong, segment));
    }
    match arena.node_shape(current)? {
        Shape::Object => {
            for entry in arena.node_children(current)? {
                let cell = arena.node(entry)?;
                if let (Some(key), Some(value)) = (cell.payload, cell.child)
                    && arena.buffer_bytes(key)? == segment
                {
                    return Ok(value);
                }
            }
            Err(PooldocError::path(PathErrorKind::KeyNotFound, segment))
        }
        Shape::Array if is_index(segment) => std::str::from_utf8(segment)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .and_then(|index| arena.node_children(current).ok()?.nth(index))
            .ok_or_else(|| PooldocError::path(PathErrorKind::IndexOutOfRange, segment)),
        _ if is_index(segment) => Err(PooldocError::path(PathErrorKind::IndexOutOfRange, segment)),
        _ => Err(PooldocError::path(PathErrorKind::KeyNotFound, segment)),
    }
}
