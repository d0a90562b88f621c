//! Tools for inspecting arena usage and tree structure.
//! Useful for sizing an [`ArenaConfig`](crate::ArenaConfig) and debugging codecs.

use std::fmt;

use serde::Serialize;

use crate::arena::{Arena, NodeId, SizeClass};
use crate::error::{PooldocError, Result};
use crate::node::Shape;

/// Payload bytes shown in a [`TreeInfo`] preview.
const PREVIEW_LEN: usize = 32;

/// Usage snapshot of an arena.
#[derive(Debug, Clone, Serialize)]
pub struct ArenaReport {
    /// Size of the backing byte region.
    pub region_bytes: usize,
    /// One entry per size class, smallest first.
    pub classes: Vec<ClassUsage>,
    /// Node slot usage.
    pub nodes: NodeUsage,
}

/// Usage of one size class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassUsage {
    /// Slot capacity in bytes.
    pub capacity: usize,
    /// Total slots.
    pub slots: usize,
    /// Slots on the free-list.
    pub free: usize,
    /// Slots handed out.
    pub live: usize,
    /// Sum of the sizes of live buffers.
    pub bytes_in_use: usize,
}

/// Usage of the node pool.
#[derive(Debug, Clone, Serialize)]
pub struct NodeUsage {
    /// Total slots.
    pub slots: usize,
    /// Slots on the free-list.
    pub free: usize,
    /// Slots handed out.
    pub live: usize,
}

impl Arena {
    /// Takes a usage snapshot.
    pub fn report(&self) -> ArenaReport {
        ArenaReport {
            region_bytes: self.region_size(),
            classes: SizeClass::ALL
                .iter()
                .map(|&class| ClassUsage {
                    capacity: class.capacity(),
                    slots: self.slot_count(class),
                    free: self.free_count(class),
                    live: self.live_count(class),
                    bytes_in_use: self.bytes_in_use(class),
                })
                .collect(),
            nodes: NodeUsage {
                slots: self.node_slot_count(),
                free: self.node_free_count(),
                live: self.node_live_count(),
            },
        }
    }
}

impl fmt::Display for ArenaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== POOLDOC ARENA REPORT ===")?;
        writeln!(f, "Region: {} bytes", self.region_bytes)?;
        for class in &self.classes {
            writeln!(
                f,
                "  {:>8}B  live {:>6} / {:<6}  free {:>6}  bytes {}",
                class.capacity, class.live, class.slots, class.free, class.bytes_in_use
            )?;
        }
        writeln!(
            f,
            "  nodes      live {:>6} / {:<6}  free {:>6}",
            self.nodes.live, self.nodes.slots, self.nodes.free
        )
    }
}

/// Structural description of one node and its subtree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeInfo {
    /// Slot index of the node.
    pub node: u32,
    /// Structural interpretation.
    pub shape: Shape,
    /// Payload size, if the node has one.
    pub payload_len: Option<usize>,
    /// The first bytes of the payload, lossily decoded.
    pub preview: Option<String>,
    /// Child nodes.
    pub children: Vec<TreeInfo>,
}

/// Describes the subtree rooted at `node`.
///
/// # Errors
/// `RecursionLimit` past the arena's `max_depth`, `InvalidArgument` for stale
/// handles or malformed containers.
pub fn inspect_tree(arena: &Arena, node: NodeId) -> Result<TreeInfo> {
    inspect_node(arena, node, 0)
}

fn inspect_node(arena: &Arena, node: NodeId, depth: usize) -> Result<TreeInfo> {
    let max_depth = arena.config().max_depth;
    if depth > max_depth {
        return Err(PooldocError::RecursionLimit { depth: max_depth });
    }
    let shape = arena.node_shape(node)?;
    let (payload_len, preview) = match arena.node_payload(node)? {
        Some(payload) => {
            let bytes = arena.buffer_bytes(payload)?;
            let shown = &bytes[..bytes.len().min(PREVIEW_LEN)];
            let mut text = String::from_utf8_lossy(shown).into_owned();
            if bytes.len() > PREVIEW_LEN {
                text.push_str("...");
            }
            (Some(bytes.len()), Some(text))
        }
        None => (None, None),
    };
    // An entry and its value sit at the same nesting level.
    let child_depth = if shape == Shape::Entry { depth } else { depth + 1 };
    let children = arena
        .node_children(node)?
        .map(|child| inspect_node(arena, child, child_depth))
        .collect::<Result<Vec<_>>>()?;
    Ok(TreeInfo {
        node: node.as_u32(),
        shape,
        payload_len,
        preview,
        children,
    })
}

impl fmt::Display for TreeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_recursive(f, "", true)
    }
}

impl TreeInfo {
    fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, prefix: &str, is_last: bool) -> fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };
        let preview = self
            .preview
            .as_deref()
            .map(|p| format!(" {p:?}"))
            .unwrap_or_default();

        writeln!(f, "{prefix}{connector}#{} {:?}{preview}", self.node, self.shape)?;

        for (i, child) in self.children.iter().enumerate() {
            let is_last_child = i + 1 == self.children.len();
            child.fmt_recursive(f, &format!("{prefix}{child_prefix}"), is_last_child)?;
        }
        Ok(())
    }
}
