//! Tree construction, inspection and teardown.
//!
//! A parent owns its children. Removing a child hands the subtree back to the
//! caller (see [`Arena::node_detach_child`]), who must either destroy it or
//! attach it elsewhere.

use serde::Serialize;

use crate::arena::{Arena, BufferId, Container, NodeId};
use crate::error::{PooldocError, Result};

/// The structural interpretation of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Shape {
    /// Payload, no children: a text or primitive leaf.
    Scalar,
    /// No payload, every child is an entry.
    Object,
    /// No payload, no child is an entry.
    Array,
    /// Payload (the key) and a single value child: one object entry.
    Entry,
    /// Neither payload nor children.
    Empty,
}

/// Iterator over a node's direct children, in order.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.node(current).ok().and_then(|n| n.next);
        Some(current)
    }
}

impl Arena {
    /// Allocates a node with no payload, children or siblings.
    pub fn node_new(&mut self) -> Result<NodeId> {
        self.node_alloc()
    }

    /// A leaf holding a copy of `text`.
    pub fn node_new_scalar(&mut self, text: &[u8]) -> Result<NodeId> {
        let payload = self.buffer_create_from_bytes(text)?;
        match self.node_alloc() {
            Ok(node) => {
                self.node_mut(node)?.payload = Some(payload);
                Ok(node)
            }
            Err(e) => {
                self.buffer_free(payload)?;
                Err(e)
            }
        }
    }

    /// An empty node that serializes as `{}` until it gains entries.
    pub fn node_new_object(&mut self) -> Result<NodeId> {
        self.node_new_container(Container::Object)
    }

    /// An empty node that serializes as `[]` until it gains elements.
    pub fn node_new_array(&mut self) -> Result<NodeId> {
        self.node_new_container(Container::Array)
    }

    fn node_new_container(&mut self, container: Container) -> Result<NodeId> {
        let node = self.node_alloc()?;
        self.node_mut(node)?.container = Some(container);
        Ok(node)
    }

    /// Destroys a subtree: payloads, every descendant, then the node.
    ///
    /// Uses an explicit worklist, so arbitrarily deep trees are safe.
    /// `None` is a no-op. Only roots can be destroyed: a node that is still
    /// attached to a parent is refused with `InvalidArgument`.
    pub fn node_destroy(&mut self, node: Option<NodeId>) -> Result<()> {
        let Some(root) = node else {
            return Ok(());
        };
        if let Some(owner) = self.node(root)?.parent {
            return Err(PooldocError::InvalidArgument(format!(
                "{root:?} is still attached to {owner:?}; detach it first"
            )));
        }
        let mut pending = vec![root];
        while let Some(current) = pending.pop() {
            let cell = *self.node(current)?;
            let mut child = cell.child;
            while let Some(c) = child {
                pending.push(c);
                child = self.node(c)?.next;
            }
            if let Some(payload) = cell.payload {
                self.buffer_free(payload)?;
            }
            self.node_free(current)?;
        }
        Ok(())
    }

    /// The payload buffer, if any.
    pub fn node_payload(&self, node: NodeId) -> Result<Option<BufferId>> {
        Ok(self.node(node)?.payload)
    }

    /// Replaces the payload and hands back the previous one.
    ///
    /// The returned buffer is no longer owned by the tree.
    #[must_use = "the displaced payload must be destroyed or reused"]
    pub fn node_set_payload(&mut self, node: NodeId, payload: Option<BufferId>) -> Result<Option<BufferId>> {
        if let Some(p) = payload {
            self.buffer_span(p)?;
        }
        let cell = self.node_mut(node)?;
        Ok(std::mem::replace(&mut cell.payload, payload))
    }

    /// Appends a detached node at the end of `parent`'s child list.
    ///
    /// # Errors
    /// `InvalidArgument` if `child` already has a parent, or if `parent` lies
    /// inside `child`'s subtree (the link would close a cycle).
    pub fn node_push_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        let tail = self.node_children(parent)?.last();
        self.node_link(parent, tail, child)
    }

    /// Appends a `key: value` entry to an object node and returns the entry.
    ///
    /// Ownership of `value` passes to the tree only on success. The same
    /// attachment rules as [`Arena::node_push_child`] apply to `value`.
    pub fn node_insert_entry(&mut self, object: NodeId, key: &[u8], value: NodeId) -> Result<NodeId> {
        self.check_attachable(object, value)?;
        let entry = self.node_new_scalar(key)?;
        self.node_link(entry, None, value)?;
        if let Err(e) = self.node_push_child(object, entry) {
            // Unhook the value first so it survives the cleanup.
            self.node_mut(entry)?.child = None;
            self.node_mut(value)?.parent = None;
            self.node_destroy(Some(entry))?;
            return Err(e);
        }
        Ok(entry)
    }

    /// Links a parentless `child` after `tail`, or as the first child of
    /// `parent` when `tail` is `None`.
    pub(crate) fn node_link(&mut self, parent: NodeId, tail: Option<NodeId>, child: NodeId) -> Result<()> {
        match tail {
            Some(prev) => self.node_mut(prev)?.next = Some(child),
            None => self.node_mut(parent)?.child = Some(child),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        let cell = self.node(child)?;
        if let Some(owner) = cell.parent {
            return Err(PooldocError::InvalidArgument(format!(
                "{child:?} is already attached to {owner:?}"
            )));
        }
        // A leaf can only contain `parent` if it is `parent`.
        if parent == child || cell.child.is_some() {
            let mut cursor = Some(parent);
            while let Some(ancestor) = cursor {
                if ancestor == child {
                    return Err(PooldocError::InvalidArgument(format!(
                        "attaching {child:?} under {parent:?} would create a cycle"
                    )));
                }
                cursor = self.node(ancestor)?.parent;
            }
        }
        Ok(())
    }

    /// Unlinks the `index`-th child and returns it as a standalone subtree.
    #[must_use = "a detached subtree leaks unless destroyed or reattached"]
    pub fn node_detach_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let mut prev: Option<NodeId> = None;
        let mut current = self.node(parent)?.child;
        for _ in 0..index {
            prev = current;
            current = match current {
                Some(c) => self.node(c)?.next,
                None => None,
            };
        }
        let target = current.ok_or_else(|| {
            PooldocError::InvalidArgument(format!("{parent:?} has no child at index {index}"))
        })?;
        let after = self.node(target)?.next;
        match prev {
            Some(p) => self.node_mut(p)?.next = after,
            None => self.node_mut(parent)?.child = after,
        }
        let cell = self.node_mut(target)?;
        cell.next = None;
        cell.parent = None;
        Ok(target)
    }

    /// Iterates the direct children of `node`.
    pub fn node_children(&self, node: NodeId) -> Result<Children<'_>> {
        Ok(Children {
            arena: self,
            next: self.node(node)?.child,
        })
    }

    /// Number of direct children.
    pub fn node_child_count(&self, node: NodeId) -> Result<usize> {
        Ok(self.node_children(node)?.count())
    }

    /// True if `node` is a well-formed entry: key payload and exactly one value.
    fn is_entry(&self, node: NodeId) -> Result<bool> {
        let cell = self.node(node)?;
        match (cell.payload, cell.child) {
            (Some(_), Some(value)) => Ok(self.node(value)?.next.is_none()),
            _ => Ok(false),
        }
    }

    /// Classifies a node.
    ///
    /// # Errors
    /// `InvalidArgument` for a container mixing entries and plain values.
    pub fn node_shape(&self, node: NodeId) -> Result<Shape> {
        let cell = self.node(node)?;
        match (cell.payload, cell.child) {
            (Some(_), None) => Ok(Shape::Scalar),
            (None, None) => Ok(Shape::Empty),
            (Some(_), Some(_)) => Ok(Shape::Entry),
            (None, Some(_)) => {
                let (mut entries, mut values) = (0usize, 0usize);
                for child in self.node_children(node)? {
                    if self.is_entry(child)? {
                        entries += 1;
                    } else {
                        values += 1;
                    }
                }
                match (entries, values) {
                    (_, 0) => Ok(Shape::Object),
                    (0, _) => Ok(Shape::Array),
                    _ => Err(PooldocError::InvalidArgument(format!(
                        "{node:?} mixes {entries} entries with {values} values"
                    ))),
                }
            }
        }
    }

    /// Structural equality of two subtrees.
    ///
    /// Payloads compare byte-wise and children pairwise in order. Container
    /// hints only matter for empty nodes.
    pub fn tree_equal(&self, a: NodeId, b: NodeId) -> Result<bool> {
        self.tree_compare(a, b, false)
    }

    /// Like [`Arena::tree_equal`], but object entries compare as a multiset
    /// ordered by key (stable for duplicates).
    pub fn tree_equal_unordered(&self, a: NodeId, b: NodeId) -> Result<bool> {
        self.tree_compare(a, b, true)
    }

    fn payload_bytes(&self, payload: Option<BufferId>) -> Result<Option<&[u8]>> {
        payload.map(|p| self.buffer_bytes(p)).transpose()
    }

    fn sorted_entries(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut entries: Vec<NodeId> = self.node_children(node)?.collect();
        entries.sort_by(|x, y| {
            let key = |n: &NodeId| {
                self.node(*n)
                    .ok()
                    .and_then(|c| c.payload)
                    .and_then(|p| self.buffer_bytes(p).ok())
                    .unwrap_or_default()
            };
            key(x).cmp(key(y))
        });
        Ok(entries)
    }

    fn tree_compare(&self, a: NodeId, b: NodeId, unordered: bool) -> Result<bool> {
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            let (cx, cy) = (*self.node(x)?, *self.node(y)?);
            if self.payload_bytes(cx.payload)? != self.payload_bytes(cy.payload)? {
                return Ok(false);
            }
            if cx.child.is_none() && cy.child.is_none() {
                if cx.payload.is_none() && cx.container != cy.container {
                    return Ok(false);
                }
                continue;
            }
            let (xs, ys): (Vec<NodeId>, Vec<NodeId>) =
                if unordered && self.node_shape(x)? == Shape::Object && self.node_shape(y)? == Shape::Object {
                    (self.sorted_entries(x)?, self.sorted_entries(y)?)
                } else {
                    (self.node_children(x)?.collect(), self.node_children(y)?.collect())
                };
            if xs.len() != ys.len() {
                return Ok(false);
            }
            pending.extend(xs.into_iter().zip(ys));
        }
        Ok(true)
    }
}
