//! Control-block slab allocator
//!
//! A `ControlBlockTable<T>` hands out fixed-position `ControlBlock<T>`
//! records indexed by `FiberId`. Allocation and release are O(1) through an
//! intrusive LIFO free list threaded through the blocks' `link` field, so
//! recently released slots (and whatever their bodies still hold, such as a
//! fiber stack mapping) are reused first.
//!
//! Storage is a fixed directory of lazily allocated buckets. A bucket is
//! created the first time the high-water mark reaches it and is never moved
//! or freed while the table lives, so a `&mut ControlBlock<T>` derived raw
//! pointer stays valid for the table's lifetime.
//!
//! ```text
//!  buckets[0]           buckets[1]                 buckets[255]
//! ┌───┬───┬───┬─...─┐  ┌───┬───┬─...─┐            (allocated on demand)
//! │ 0 │ 1 │ 2 │     │  │256│257│     │
//! └───┴───┴───┴─...─┘  └───┴───┴─...─┘
//!
//!  free_head ──▶ 2 ──link──▶ 0 ──link──▶ high_water   (empty when head == high_water)
//! ```

use crate::error::{BlockError, BlockResult};
use crate::id::FiberId;

/// Entries per bucket
pub const BUCKET_SIZE: usize = 256;

/// Number of buckets in the directory
pub const BUCKET_COUNT: usize = 256;

/// Maximum number of live blocks (ids 0..=65_534; 65_535 is the sentinel)
pub const MAX_LIVE_BLOCKS: usize = u16::MAX as usize;

/// Payload stored inside a control block.
///
/// `reset` is called on every allocation. The default replaces the body with
/// `Default::default()`; bodies that own reusable resources override it to
/// keep them.
pub trait BlockBody: Default {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A pooled record: payload plus id plus intrusive link.
pub struct ControlBlock<T> {
    /// The payload
    pub body: T,
    id: FiberId,
    pub(crate) link: FiberId,
    /// Member of a `ControlBlockQueue` (tail included, whose link is NONE)
    pub(crate) queued: bool,
    live: bool,
}

impl<T> ControlBlock<T> {
    /// Id of this block (fixed for the table's lifetime)
    #[inline]
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Next id on whichever intrusive list holds this block
    #[inline]
    pub fn link(&self) -> FiberId {
        self.link
    }

    /// Whether the block is currently handed out
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Whether the block sits in a queue
    #[inline]
    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

/// Fixed-capacity slab of control blocks with a LIFO free list.
pub struct ControlBlockTable<T> {
    buckets: Vec<Option<Box<[ControlBlock<T>]>>>,
    /// Next never-used id. Ids below it have a backing block.
    high_water: u32,
    /// Head of the free list; equals `high_water` when the list is empty.
    free_head: u32,
    /// Live block count
    live: usize,
    /// Live block cap (<= MAX_LIVE_BLOCKS)
    limit: usize,
}

impl<T: BlockBody> ControlBlockTable<T> {
    /// Create a table with the full 65,535-block capacity
    pub fn new() -> Self {
        Self::with_limit(MAX_LIVE_BLOCKS)
    }

    /// Create a table that refuses to hold more than `limit` live blocks
    pub fn with_limit(limit: usize) -> Self {
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        buckets.resize_with(BUCKET_COUNT, || None);
        Self {
            buckets,
            high_water: 0,
            free_head: 0,
            live: 0,
            limit: limit.min(MAX_LIVE_BLOCKS),
        }
    }

    /// Allocate a block, preferring the most recently released one.
    ///
    /// The returned block has a reset body and no link.
    pub fn get_or_allocate(&mut self) -> BlockResult<(FiberId, &mut ControlBlock<T>)> {
        if self.live >= self.limit {
            return Err(BlockError::Exhausted);
        }

        let id = if self.free_head == self.high_water {
            // Free list empty: extend the high-water mark
            if self.high_water as usize >= MAX_LIVE_BLOCKS {
                return Err(BlockError::Exhausted);
            }
            let id = FiberId::new(self.high_water as u16);
            self.ensure_bucket(id);
            self.high_water += 1;
            self.free_head = self.high_water;
            id
        } else {
            let id = FiberId::new(self.free_head as u16);
            let next = self.slot(id).link;
            // The list is terminated by the high-water value that was current
            // when it last became empty, which is still the current one.
            self.free_head = if next.is_none() {
                self.high_water
            } else {
                next.as_u16() as u32
            };
            id
        };

        self.live += 1;
        let block = self.slot_mut(id);
        block.body.reset();
        block.link = FiberId::NONE;
        block.queued = false;
        block.live = true;
        Ok((id, block))
    }

    /// Return a block to the free list.
    pub fn release(&mut self, id: FiberId) -> BlockResult<()> {
        if id.is_none() || id.as_u16() as u32 >= self.high_water {
            return Err(BlockError::NeverAllocated(id));
        }
        let free_head = self.free_head;
        let block = self.slot_mut(id);
        if !block.live || block.queued {
            return Err(BlockError::DoubleRelease(id));
        }
        block.live = false;
        // free_head <= 65_535, so it always fits; 65_535 reads back as NONE
        block.link = FiberId::new(free_head as u16);
        self.free_head = id.as_u16() as u32;
        self.live -= 1;
        Ok(())
    }

    fn ensure_bucket(&mut self, id: FiberId) {
        let b = id.as_usize() / BUCKET_SIZE;
        if self.buckets[b].is_none() {
            let base = b * BUCKET_SIZE;
            let bucket: Vec<ControlBlock<T>> = (0..BUCKET_SIZE)
                .map(|i| ControlBlock {
                    body: T::default(),
                    id: FiberId::new((base + i) as u16),
                    link: FiberId::NONE,
                    queued: false,
                    live: false,
                })
                .collect();
            self.buckets[b] = Some(bucket.into_boxed_slice());
        }
    }
}

impl<T> ControlBlockTable<T> {
    /// Mutable access to a block by id
    pub fn get_block(&mut self, id: FiberId) -> BlockResult<&mut ControlBlock<T>> {
        if id.is_none() || id.as_u16() as u32 >= self.high_water {
            return Err(BlockError::OutOfRange(id));
        }
        Ok(self.slot_mut(id))
    }

    /// Shared access to a block by id
    pub fn get(&self, id: FiberId) -> BlockResult<&ControlBlock<T>> {
        if id.is_none() || id.as_u16() as u32 >= self.high_water {
            return Err(BlockError::OutOfRange(id));
        }
        Ok(self.slot(id))
    }

    /// Number of live blocks
    #[inline]
    pub fn count(&self) -> usize {
        self.live
    }

    /// Live block cap
    #[inline]
    pub fn capacity(&self) -> usize {
        self.limit
    }

    /// Number of ids ever handed out
    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water as usize
    }

    /// Iterate over live blocks in id order
    pub fn iter_live(&self) -> impl Iterator<Item = &ControlBlock<T>> + '_ {
        self.buckets
            .iter()
            .flatten()
            .flat_map(|bucket| bucket.iter())
            .take(self.high_water as usize)
            .filter(|block| block.live)
    }

    // Callers have checked `id < high_water`, so the bucket exists.
    #[inline]
    fn slot(&self, id: FiberId) -> &ControlBlock<T> {
        let i = id.as_usize();
        match &self.buckets[i / BUCKET_SIZE] {
            Some(bucket) => &bucket[i % BUCKET_SIZE],
            None => unreachable!("bucket for id {} below high-water is missing", id),
        }
    }

    #[inline]
    fn slot_mut(&mut self, id: FiberId) -> &mut ControlBlock<T> {
        let i = id.as_usize();
        match &mut self.buckets[i / BUCKET_SIZE] {
            Some(bucket) => &mut bucket[i % BUCKET_SIZE],
            None => unreachable!("bucket for id {} below high-water is missing", id),
        }
    }
}

impl<T: BlockBody> Default for ControlBlockTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
