use std::fmt;

/// One of the five fixed slot capacities.
///
/// Classes grow geometrically (16 x 4^n) so that short keys, typical lines,
/// documents and rare large blobs each have a home without much waste.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum SizeClass {
    /// 16 bytes.
    B16,
    /// 256 bytes.
    B256,
    /// 4 KiB.
    B4K,
    /// 64 KiB.
    B64K,
    /// 1 MiB.
    B1M,
}

impl SizeClass {
    /// Number of classes.
    pub const COUNT: usize = 5;

    /// All classes, smallest first.
    pub const ALL: [SizeClass; Self::COUNT] =
        [Self::B16, Self::B256, Self::B4K, Self::B64K, Self::B1M];

    /// The largest capacity any buffer can have.
    pub const MAX_CAPACITY: usize = 1 << 20;

    /// Slot capacity in bytes.
    pub const fn capacity(self) -> usize {
        match self {
            Self::B16 => 16,
            Self::B256 => 256,
            Self::B4K => 4096,
            Self::B64K => 65536,
            Self::B1M => 1 << 20,
        }
    }

    /// Position in [`SizeClass::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::B16 => 0,
            Self::B256 => 1,
            Self::B4K => 2,
            Self::B64K => 3,
            Self::B1M => 4,
        }
    }

    /// The smallest class whose capacity is at least `requested`.
    ///
    /// Returns `None` when `requested` exceeds [`SizeClass::MAX_CAPACITY`].
    pub fn fitting(requested: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.capacity() >= requested)
    }

    /// The class whose capacity is exactly `capacity`.
    pub fn from_capacity(capacity: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.capacity() == capacity)
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.capacity())
    }
}

/// Identity of a buffer slot inside an [`Arena`](crate::Arena).
///
/// Mutating buffer operations take `&mut BufferId` because they may move the
/// content to a slot of a larger class; re-read the handle after every such call.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId {
    class: SizeClass,
    slot: u32,
}

impl BufferId {
    pub(crate) fn new(class: SizeClass, slot: u32) -> Self {
        Self { class, slot }
    }

    /// The size class (and therefore the capacity) of the slot.
    pub fn class(&self) -> SizeClass {
        self.class
    }

    /// Slot index within the class.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Capacity of the slot in bytes.
    pub fn capacity(&self) -> usize {
        self.class.capacity()
    }
}

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({}#{})", self.class, self.slot)
    }
}

/// Identity of a tree node slot inside an [`Arena`](crate::Arena).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw slot index.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
