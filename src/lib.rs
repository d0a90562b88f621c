//! # Pooldoc
//!
//! A fixed-capacity, size-class segregated memory pool and a JSON/XML document
//! tree that lives entirely inside it.
//!
//! ## Overview
//!
//! Pooldoc allocates one byte region up front and never grows it. Byte
//! buffers are carved from five size classes (16 B, 256 B, 4 KiB, 64 KiB,
//! 1 MiB), each with its own LIFO free-list, so allocation and release are
//! O(1) and the memory footprint is known before the first document arrives.
//! Document trees are built from fixed node slots on top of those buffers.
//!
//! ### Key Features
//!
//! *   **Deterministic Footprint:** The [`ArenaConfig`] fixes every slot count.
//!     Exhaustion is an ordinary [`PooldocError::OutOfCapacity`] value.
//! *   **Value-Semantic Buffers:** Appending past a slot's capacity promotes
//!     the buffer to the next fitting class and rebinds the caller's
//!     [`BufferId`].
//! *   **Lossless JSON:** Number lexemes are kept verbatim, so `-1.5e+10`
//!     survives a round-trip byte-for-byte.
//! *   **Deterministic XML:** Object entries are emitted in byte order of their
//!     keys, with duplicates kept in insertion order.
//! *   **Dotted Paths:** [`provide`] walks keys and indices such as `"b.0"`.
//! *   **No Panics:** Stale handles and double frees are detected and
//!     reported, never silently corrupting the pool.
//!
//! ## Architecture
//!
//! ### The Arena
//!
//! [`Arena`] owns the byte region, one slot table per [`SizeClass`] and the
//! node table. Buffers and nodes are addressed by small `Copy` handles
//! ([`BufferId`], [`NodeId`]) that index into it.
//!
//! ### Node Shapes
//!
//! A [`Node`] has an optional payload, a first child and a next sibling. Its
//! [`Shape`] follows from its structure:
//! - payload and no children: a scalar leaf;
//! - no payload, every child an entry (key payload plus one value child): an object;
//! - no payload, children that are not entries: an array;
//! - nothing at all: empty (`null`, or `{}` / `[]` when created as a container).
//!
//! ## Usage
//!
//! ```rust
//! use pooldoc::{Arena, ArenaConfig, parse_json, provide, serialize_json};
//!
//! let mut arena = Arena::new(ArenaConfig::small())?;
//! let input = br#"{"a":1,"b":[true,null,"x\n"],"c":{}}"#;
//! let doc = parse_json(&mut arena, input)?;
//!
//! let leaf = provide(&arena, doc, "b.2")?;
//! let text = arena.node_payload(leaf)?.expect("scalar");
//! assert_eq!(arena.buffer_bytes(text)?, b"x\n");
//!
//! let out = serialize_json(&mut arena, doc)?;
//! assert_eq!(arena.buffer_bytes(out)?, input);
//!
//! arena.buffer_destroy(out)?;
//! arena.node_destroy(Some(doc))?;
//! # Ok::<(), pooldoc::PooldocError>(())
//! ```
//!
//! ## Threading
//!
//! An arena is a plain single-threaded value. Every operation runs to
//! completion without I/O (except the [`io`] helpers); wrap the arena in your
//! own lock to share it.
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** the crate forbids `unsafe` code.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`PooldocError`] value.
//! * **Rollback:** A failed parse releases everything it allocated.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod arena;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod inspector;
pub mod io;
pub mod json;
pub mod node;
pub mod path;
pub mod xml;

// --- RE-EXPORTS ---

pub use arena::{Arena, BufferId, Container, Node, NodeId, SizeClass};
pub use codec::{CodecRegistry, DocumentCodec, Format, JsonCodec, XmlCodec, transcode};
pub use config::{ArenaConfig, ArenaConfigBuilder};
pub use error::{ParseErrorKind, PathErrorKind, PooldocError, Result};
pub use inspector::{ArenaReport, TreeInfo, inspect_tree};
pub use io::{load_file, store_file};
pub use json::{parse_json, serialize_json};
pub use node::{Children, Shape};
pub use path::provide;
pub use xml::{parse_xml, serialize_xml};
