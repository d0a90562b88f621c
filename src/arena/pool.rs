use super::id::{BufferId, NodeId, SizeClass};
use crate::error::{PooldocError, Result};

/// Remembers which container literal produced an otherwise empty node.
///
/// The structural shape of a node decides how it is serialized; the hint only
/// matters for a node with neither payload nor children, where it tells `{}`
/// and `[]` apart from `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Created as an object (`{}`).
    Object,
    /// Created as an array (`[]`).
    Array,
}

/// A tree cell: optional payload, first child, next sibling.
///
/// For scalar leaves the payload is the textual value; for object entries the
/// payload is the key and `child` is the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Node {
    /// Scalar text or entry key.
    pub payload: Option<BufferId>,
    /// Head of the child list.
    pub child: Option<NodeId>,
    /// Next sibling in the parent's child list.
    pub next: Option<NodeId>,
    /// The node whose child list holds this one. `None` for roots.
    pub parent: Option<NodeId>,
    /// Container hint for empty `{}` / `[]`.
    pub container: Option<Container>,
}

/// Slot table for one size class.
#[derive(Debug)]
pub(crate) struct ClassPool {
    class: SizeClass,
    /// Offset of slot 0 in the arena region.
    base: usize,
    sizes: Vec<usize>,
    live: Vec<bool>,
    /// LIFO stack of free slot indices.
    free: Vec<u32>,
}

impl ClassPool {
    pub(crate) fn new(class: SizeClass, base: usize, count: u32) -> Self {
        Self {
            class,
            base,
            sizes: vec![0; count as usize],
            live: vec![false; count as usize],
            // Reverse so the first pop yields slot 0.
            free: (0..count).rev().collect(),
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn alloc(&mut self) -> Option<BufferId> {
        let slot = self.free.pop()?;
        let idx = slot as usize;
        self.live[idx] = true;
        self.sizes[idx] = 0;
        Some(BufferId::new(self.class, slot))
    }

    pub(crate) fn release(&mut self, id: BufferId) -> Result<()> {
        self.check(id)?;
        if self.free.len() >= self.slot_count() {
            return Err(PooldocError::InvalidArgument(format!(
                "free-list overflow for class {}",
                self.class
            )));
        }
        let idx = id.slot() as usize;
        self.live[idx] = false;
        self.sizes[idx] = 0;
        self.free.push(id.slot());
        Ok(())
    }

    /// Validates that `id` names a live slot of this class.
    pub(crate) fn check(&self, id: BufferId) -> Result<()> {
        if id.class() != self.class {
            return Err(PooldocError::InvalidArgument(format!(
                "{id:?} does not belong to class {}",
                self.class
            )));
        }
        match self.live.get(id.slot() as usize) {
            Some(true) => Ok(()),
            Some(false) => {
                tracing::warn!(buffer = ?id, "stale or double-freed buffer handle");
                Err(PooldocError::InvalidArgument(format!(
                    "{id:?} is not allocated (double free or stale handle)"
                )))
            }
            None => Err(PooldocError::InvalidArgument(format!(
                "{id:?} is outside the slot table"
            ))),
        }
    }

    pub(crate) fn len_of(&self, id: BufferId) -> usize {
        self.sizes.get(id.slot() as usize).copied().unwrap_or(0)
    }

    pub(crate) fn set_len(&mut self, id: BufferId, len: usize) {
        if let Some(size) = self.sizes.get_mut(id.slot() as usize) {
            *size = len.min(self.class.capacity());
        }
    }

    /// Region offset of the first byte of the slot.
    pub(crate) fn offset_of(&self, id: BufferId) -> usize {
        self.base + id.slot() as usize * self.class.capacity()
    }

    pub(crate) fn bytes_in_use(&self) -> usize {
        self.sizes.iter().sum()
    }
}

/// Slot table for tree nodes.
#[derive(Debug)]
pub(crate) struct NodePool {
    slots: Vec<Node>,
    live: Vec<bool>,
    free: Vec<u32>,
}

impl NodePool {
    pub(crate) fn new(count: u32) -> Self {
        Self {
            slots: vec![Node::default(); count as usize],
            live: vec![false; count as usize],
            free: (0..count).rev().collect(),
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn alloc(&mut self) -> Option<NodeId> {
        let slot = self.free.pop()?;
        let idx = slot as usize;
        self.live[idx] = true;
        self.slots[idx] = Node::default();
        Some(NodeId::new(slot))
    }

    pub(crate) fn release(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        if self.free.len() >= self.slot_count() {
            return Err(PooldocError::InvalidArgument(
                "free-list overflow for nodes".into(),
            ));
        }
        self.live[id.index()] = false;
        self.slots[id.index()] = Node::default();
        self.free.push(id.as_u32());
        Ok(())
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<()> {
        match self.live.get(id.index()) {
            Some(true) => Ok(()),
            Some(false) => {
                tracing::warn!(node = ?id, "stale or double-freed node handle");
                Err(PooldocError::InvalidArgument(format!(
                    "{id:?} is not allocated (double free or stale handle)"
                )))
            }
            None => Err(PooldocError::InvalidArgument(format!(
                "{id:?} is outside the node table"
            ))),
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.check(id)?;
        self.slots
            .get(id.index())
            .ok_or_else(|| PooldocError::InvalidArgument(format!("{id:?} out of bounds")))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.check(id)?;
        self.slots
            .get_mut(id.index())
            .ok_or_else(|| PooldocError::InvalidArgument(format!("{id:?} out of bounds")))
    }
}
