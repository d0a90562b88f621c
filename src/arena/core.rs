use super::id::{BufferId, NodeId, SizeClass};
use super::pool::{ClassPool, Node, NodePool};
use crate::config::ArenaConfig;
use crate::error::{PooldocError, Result};

/// The single owner of all buffer and node storage.
///
/// Construction lays out every slot and pushes it onto its free-list; after
/// that, allocation and release are O(1) stack operations and the memory
/// footprint never changes. The arena is single-threaded: share it behind
/// your own lock if you must.
#[derive(Debug)]
pub struct Arena {
    region: Box<[u8]>,
    classes: [ClassPool; SizeClass::COUNT],
    nodes: NodePool,
    config: ArenaConfig,
}

fn slot_count_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| PooldocError::InvalidArgument(format!("{what} slot count {count} exceeds u32")))
}

impl Arena {
    /// Lays out all slots described by `config`.
    ///
    /// # Errors
    /// `InvalidArgument` if a count does not fit `u32` or the region size
    /// overflows `usize`.
    pub fn new(config: ArenaConfig) -> Result<Self> {
        let region_size = config.region_size().ok_or_else(|| {
            PooldocError::InvalidArgument("arena region size overflows usize".into())
        })?;
        let mut counts = [0u32; SizeClass::COUNT];
        for class in SizeClass::ALL {
            counts[class.index()] = slot_count_u32(config.slots(class), "buffer")?;
        }
        let node_count = slot_count_u32(config.node_count, "node")?;

        let mut base = 0usize;
        let classes = std::array::from_fn(|i| {
            let class = SizeClass::ALL[i];
            let pool = ClassPool::new(class, base, counts[i]);
            base += counts[i] as usize * class.capacity();
            pool
        });

        tracing::debug!(
            region_bytes = region_size,
            slots = ?config.slot_counts,
            nodes = config.node_count,
            "arena initialized"
        );

        Ok(Self {
            region: vec![0u8; region_size].into_boxed_slice(),
            classes,
            nodes: NodePool::new(node_count),
            config,
        })
    }

    /// An arena with [`ArenaConfig::default`] sizing.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ArenaConfig::default())
    }

    /// The configuration this arena was built from.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    // --- Buffer slots ---

    /// Allocates an empty buffer from the smallest class holding `requested` bytes.
    ///
    /// # Errors
    /// `OutOfCapacity` if `requested` exceeds the largest class or the chosen
    /// class has no free slot. There is no fallback to a larger class.
    pub fn buffer_alloc(&mut self, requested: usize) -> Result<BufferId> {
        let class = SizeClass::fitting(requested).ok_or_else(|| PooldocError::OutOfCapacity {
            requested,
            detail: format!("exceeds the largest size class ({} bytes)", SizeClass::MAX_CAPACITY),
        })?;
        self.pool_mut(class)
            .alloc()
            .ok_or_else(|| PooldocError::OutOfCapacity {
                requested,
                detail: format!("free-list of class {class} is empty"),
            })
    }

    /// Returns a buffer slot to its class free-list.
    ///
    /// # Errors
    /// `InvalidArgument` on a double free, a stale handle, or a free-list overflow.
    pub fn buffer_free(&mut self, id: BufferId) -> Result<()> {
        self.pool_mut(id.class()).release(id)
    }

    /// Replaces `id` with an empty slot of the class fitting `requested`.
    ///
    /// The content is not preserved. A realloc within the current class keeps
    /// the slot and resets its size. Otherwise the new slot is taken before the
    /// old one is released, so on failure `id` still names the old, intact slot.
    pub fn buffer_realloc(&mut self, id: &mut BufferId, requested: usize) -> Result<()> {
        self.pool(id.class()).check(*id)?;
        let class = SizeClass::fitting(requested).ok_or_else(|| PooldocError::OutOfCapacity {
            requested,
            detail: format!("exceeds the largest size class ({} bytes)", SizeClass::MAX_CAPACITY),
        })?;
        if class == id.class() {
            self.pool_mut(class).set_len(*id, 0);
            return Ok(());
        }
        let fresh = self.buffer_alloc(requested)?;
        if let Err(e) = self.buffer_free(*id) {
            self.buffer_free(fresh)?;
            return Err(e);
        }
        *id = fresh;
        Ok(())
    }

    // --- Node slots ---

    /// Allocates a node with all fields cleared.
    pub fn node_alloc(&mut self) -> Result<NodeId> {
        self.nodes.alloc().ok_or_else(|| PooldocError::OutOfCapacity {
            requested: 0,
            detail: "node free-list is empty".into(),
        })
    }

    /// Returns a node slot to the node free-list.
    ///
    /// Only the slot itself is released; see [`Arena::node_destroy`] for
    /// recursive teardown.
    pub fn node_free(&mut self, id: NodeId) -> Result<()> {
        self.nodes.release(id)
    }

    /// Reads a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id)
    }

    // --- Statistics ---

    /// Total slots of a class.
    pub fn slot_count(&self, class: SizeClass) -> usize {
        self.pool(class).slot_count()
    }

    /// Slots of a class currently on its free-list.
    pub fn free_count(&self, class: SizeClass) -> usize {
        self.pool(class).free_count()
    }

    /// Slots of a class currently handed out.
    pub fn live_count(&self, class: SizeClass) -> usize {
        self.slot_count(class) - self.free_count(class)
    }

    /// Sum of the sizes of all live buffers of a class.
    pub fn bytes_in_use(&self, class: SizeClass) -> usize {
        self.pool(class).bytes_in_use()
    }

    /// Total node slots.
    pub fn node_slot_count(&self) -> usize {
        self.nodes.slot_count()
    }

    /// Node slots currently on the free-list.
    pub fn node_free_count(&self) -> usize {
        self.nodes.free_count()
    }

    /// Node slots currently handed out.
    pub fn node_live_count(&self) -> usize {
        self.node_slot_count() - self.node_free_count()
    }

    /// Size of the backing byte region.
    pub fn region_size(&self) -> usize {
        self.region.len()
    }

    // --- Raw slot access (crate internal) ---

    pub(crate) fn pool(&self, class: SizeClass) -> &ClassPool {
        &self.classes[class.index()]
    }

    fn pool_mut(&mut self, class: SizeClass) -> &mut ClassPool {
        &mut self.classes[class.index()]
    }

    /// Region offset and current size of a live buffer.
    pub(crate) fn buffer_span(&self, id: BufferId) -> Result<(usize, usize)> {
        let pool = self.pool(id.class());
        pool.check(id)?;
        Ok((pool.offset_of(id), pool.len_of(id)))
    }

    /// Sets the size of a live buffer, clamped to its capacity.
    pub(crate) fn set_buffer_len(&mut self, id: BufferId, len: usize) -> Result<()> {
        let pool = self.pool_mut(id.class());
        pool.check(id)?;
        pool.set_len(id, len);
        Ok(())
    }

    /// The full capacity of a live slot, for in-place writes.
    pub(crate) fn slot_mut(&mut self, id: BufferId) -> Result<&mut [u8]> {
        let (offset, _) = self.buffer_span(id)?;
        let end = offset + id.capacity();
        self.region
            .get_mut(offset..end)
            .ok_or_else(|| PooldocError::InvalidArgument(format!("{id:?} lies outside the region")))
    }

    /// Region bytes `[offset, offset + len)`.
    pub(crate) fn region_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.region.get(offset..offset + len).ok_or_else(|| {
            PooldocError::InvalidArgument(format!("span {offset}+{len} lies outside the region"))
        })
    }

    /// Copies `len` region bytes from `from` to `to`. Ranges may overlap.
    pub(crate) fn region_copy(&mut self, from: usize, len: usize, to: usize) -> Result<()> {
        if from + len > self.region.len() || to + len > self.region.len() {
            return Err(PooldocError::InvalidArgument(
                "region copy out of bounds".into(),
            ));
        }
        self.region.copy_within(from..from + len, to);
        Ok(())
    }

    /// Writes external bytes into the region at `to`.
    pub(crate) fn region_write(&mut self, to: usize, bytes: &[u8]) -> Result<()> {
        let dst = self
            .region
            .get_mut(to..to + bytes.len())
            .ok_or_else(|| PooldocError::InvalidArgument("region write out of bounds".into()))?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}
