//! Pluggable document codecs.
//!
//! The [`DocumentCodec`] trait puts the JSON and XML codecs behind one seam so
//! callers can pick a wire format at runtime, and a [`CodecRegistry`] maps each
//! [`Format`] to its implementation.

use std::fmt;
use std::path::Path;

use crate::arena::{Arena, BufferId, NodeId};
use crate::error::{PooldocError, Result};
use crate::{json, xml};

/// The wire formats understood by pooldoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Format {
    /// The RFC 8259 subset of [`crate::json`].
    Json,
    /// The attribute-free subset of [`crate::xml`].
    Xml,
}

impl Format {
    /// Every supported format.
    pub const ALL: [Format; 2] = [Format::Json, Format::Xml];

    /// Lowercase format name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }

    /// Guesses the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(ext))
    }

    /// Guesses the format from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn index(self) -> usize {
        match self {
            Self::Json => 0,
            Self::Xml => 1,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interface for document codecs.
///
/// A codec turns bytes into a tree allocated in the caller's arena and back.
/// Implementations must release everything they allocated when they fail.
pub trait DocumentCodec: fmt::Debug {
    /// The format this codec speaks.
    fn format(&self) -> Format;

    /// Parses `src` into a new tree.
    fn parse(&self, arena: &mut Arena, src: &[u8]) -> Result<NodeId>;

    /// Serializes the tree rooted at `node` into a new buffer.
    fn serialize(&self, arena: &mut Arena, node: NodeId) -> Result<BufferId>;
}

/// The JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl DocumentCodec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn parse(&self, arena: &mut Arena, src: &[u8]) -> Result<NodeId> {
        json::parse_json(arena, src)
    }

    fn serialize(&self, arena: &mut Arena, node: NodeId) -> Result<BufferId> {
        json::serialize_json(arena, node)
    }
}

/// The XML codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl DocumentCodec for XmlCodec {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn parse(&self, arena: &mut Arena, src: &[u8]) -> Result<NodeId> {
        xml::parse_xml(arena, src)
    }

    fn serialize(&self, arena: &mut Arena, node: NodeId) -> Result<BufferId> {
        xml::serialize_xml(arena, node)
    }
}

/// Maps each [`Format`] to a codec.
///
/// The default registry holds [`JsonCodec`] and [`XmlCodec`]; either can be
/// replaced with [`CodecRegistry::register`].
#[derive(Debug)]
pub struct CodecRegistry {
    codecs: Vec<Option<Box<dyn DocumentCodec>>>,
}

impl CodecRegistry {
    /// A registry with the built-in codecs.
    pub fn new() -> Self {
        let mut reg = Self {
            codecs: Format::ALL.iter().map(|_| None).collect(),
        };
        reg.register(Box::new(JsonCodec));
        reg.register(Box::new(XmlCodec));
        reg
    }

    /// Registers a codec under its own format, replacing any previous one.
    pub fn register(&mut self, codec: Box<dyn DocumentCodec>) {
        if let Some(slot) = self.codecs.get_mut(codec.format().index()) {
            *slot = Some(codec);
        }
    }

    /// Looks up the codec for `format`.
    ///
    /// # Errors
    /// `InvalidArgument` if no codec is registered for it.
    pub fn get(&self, format: Format) -> Result<&dyn DocumentCodec> {
        self.codecs
            .get(format.index())
            .and_then(|slot| slot.as_deref())
            .ok_or_else(|| PooldocError::InvalidArgument(format!("no codec registered for {format}")))
    }

    /// Parses `src` in `from` and re-emits it in `to`.
    ///
    /// The intermediate tree is always destroyed, whether or not serialization
    /// succeeds.
    pub fn transcode(&self, arena: &mut Arena, src: &[u8], from: Format, to: Format) -> Result<BufferId> {
        let tree = self.get(from)?.parse(arena, src)?;
        let emitted = self.get(to).and_then(|codec| codec.serialize(arena, tree));
        let destroyed = arena.node_destroy(Some(tree));
        let out = emitted?;
        if let Err(e) = destroyed {
            arena.buffer_destroy(out)?;
            return Err(e);
        }
        Ok(out)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// [`CodecRegistry::transcode`] with the built-in codecs.
///
/// ```rust
/// use pooldoc::{Arena, ArenaConfig, Format, transcode};
///
/// let mut arena = Arena::new(ArenaConfig::small())?;
/// let out = transcode(&mut arena, br#"{"b":"2","a":"1"}"#, Format::Json, Format::Xml)?;
/// assert_eq!(arena.buffer_bytes(out)?, b"<a>1</a><b>2</b>");
/// # Ok::<(), pooldoc::PooldocError>(())
/// ```
pub fn transcode(arena: &mut Arena, src: &[u8], from: Format, to: Format) -> Result<BufferId> {
    CodecRegistry::new().transcode(arena, src, from, to)
}
