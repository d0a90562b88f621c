//! Arena sizing and parser limits.
//!
//! The slot counts decide the whole memory footprint of an [`Arena`](crate::Arena):
//! the backing region is `sum(count_s * s)` bytes and is allocated exactly once.

use crate::arena::SizeClass;

/// Base slot counts per class, before scaling.
///
/// One MiB of storage per size class at scale 1.
pub const BASE_SLOT_COUNTS: [usize; SizeClass::COUNT] = [65536, 4096, 256, 16, 1];

/// Base node count, before scaling.
pub const BASE_NODE_COUNT: usize = 4096;

/// Default nesting limit for parsers and serializers.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Sizing of an arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Slot count per size class, indexed by [`SizeClass::index`].
    pub slot_counts: [usize; SizeClass::COUNT],
    /// Number of tree node slots.
    pub node_count: usize,
    /// Maximum nesting depth accepted by the codecs.
    pub max_depth: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::scaled(1)
    }
}

impl ArenaConfig {
    /// Multiplies every base count by `bias`.
    pub fn scaled(bias: usize) -> Self {
        Self {
            slot_counts: BASE_SLOT_COUNTS.map(|n| n.saturating_mul(bias)),
            node_count: BASE_NODE_COUNT.saturating_mul(bias),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// A compact arena (about 1.45 MiB) suitable for tests and small tools.
    pub fn small() -> Self {
        Self {
            slot_counts: [1024, 256, 32, 4, 1],
            node_count: 1024,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Starts a builder from [`ArenaConfig::small`].
    pub fn builder() -> ArenaConfigBuilder {
        ArenaConfigBuilder {
            config: Self::small(),
        }
    }

    /// Slot count for one class.
    pub fn slots(&self, class: SizeClass) -> usize {
        self.slot_counts[class.index()]
    }

    /// Total bytes of buffer storage this config lays out, or `None` on overflow.
    pub fn region_size(&self) -> Option<usize> {
        SizeClass::ALL.iter().try_fold(0usize, |acc, class| {
            self.slots(*class)
                .checked_mul(class.capacity())
                .and_then(|bytes| acc.checked_add(bytes))
        })
    }
}

/// Fluent construction of an [`ArenaConfig`].
///
/// ```rust
/// use pooldoc::{ArenaConfig, SizeClass};
///
/// let config = ArenaConfig::builder()
///     .slots(SizeClass::B16, 8)
///     .slots(SizeClass::B1M, 0)
///     .nodes(32)
///     .max_depth(16)
///     .build();
/// assert_eq!(config.slots(SizeClass::B16), 8);
/// ```
#[derive(Debug, Clone)]
pub struct ArenaConfigBuilder {
    config: ArenaConfig,
}

impl ArenaConfigBuilder {
    /// Sets the slot count of one size class.
    pub fn slots(mut self, class: SizeClass, count: usize) -> Self {
        self.config.slot_counts[class.index()] = count;
        self
    }

    /// Sets the node slot count.
    pub fn nodes(mut self, count: usize) -> Self {
        self.config.node_count = count;
        self
    }

    /// Sets the codec nesting limit.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> ArenaConfig {
        self.config
    }
}
