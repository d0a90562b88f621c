//! The size-class segregated object pool.
//!
//! An [`Arena`] owns one byte region laid out once at construction. The region is
//! cut into fixed-capacity slots for each [`SizeClass`]; every class keeps a LIFO
//! free-list of its unused slots. Tree nodes live in a separate slot table with
//! their own free-list. Nothing ever grows: running dry is reported as
//! [`PooldocError::OutOfCapacity`](crate::PooldocError::OutOfCapacity).
//!
//! ```text
//! region: [ 16 x N16 ][ 256 x N256 ][ 4096 x N4096 ][ 65536 x N64K ][ 1 MiB x N1M ]
//! nodes:  [ Node x N_node ]
//! ```
//!
//! Handles ([`BufferId`], [`NodeId`]) are small `Copy` identities into the arena.
//! Every slot carries a liveness flag, so freeing twice or reading through a stale
//! handle is reported instead of corrupting the free-lists.

/// Defines the `Arena` allocator.
pub mod core;
/// Defines the `BufferId`, `NodeId` and `SizeClass` types.
pub mod id;
/// Per-class slot tables and the node table.
pub mod pool;

pub use self::core::Arena;
pub use id::{BufferId, NodeId, SizeClass};
pub use pool::{Container, Node};
