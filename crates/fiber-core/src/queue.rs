//! Intrusive FIFO over a control-block table
//!
//! `ControlBlockQueue<T>` links blocks through their `link` field, so
//! enqueue/dequeue allocate nothing. The table is passed to every call
//! instead of being stored, which lets the owner keep using the table
//! between queue operations.

use core::marker::PhantomData;

use crate::control_block::ControlBlockTable;
use crate::error::{BlockError, BlockResult};
use crate::id::FiberId;

/// FIFO of control-block ids. Used as the reactor's run queue.
pub struct ControlBlockQueue<T> {
    head: FiberId,
    tail: FiberId,
    len: usize,
    _table: PhantomData<fn() -> T>,
}

impl<T> ControlBlockQueue<T> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            head: FiberId::NONE,
            tail: FiberId::NONE,
            len: 0,
            _table: PhantomData,
        }
    }

    /// Append `id` at the tail
    pub fn enqueue(&mut self, table: &mut ControlBlockTable<T>, id: FiberId) -> BlockResult<()> {
        let block = table.get_block(id)?;
        if block.queued {
            return Err(BlockError::AlreadyLinked(id));
        }
        block.queued = true;

        if self.len == 0 {
            self.head = id;
        } else {
            table.get_block(self.tail)?.link = id;
        }
        self.tail = id;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the head
    pub fn dequeue(&mut self, table: &mut ControlBlockTable<T>) -> BlockResult<FiberId> {
        if self.len == 0 {
            return Err(BlockError::EmptyQueue);
        }

        let id = self.head;
        let block = table.get_block(id)?;
        let next = block.link;
        block.link = FiberId::NONE;
        block.queued = false;

        self.len -= 1;
        if self.len == 0 {
            self.head = FiberId::NONE;
            self.tail = FiberId::NONE;
        } else {
            self.head = next;
        }
        Ok(id)
    }

    /// Head id without removing it
    #[inline]
    pub fn peek(&self) -> Option<FiberId> {
        self.head.to_option()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for ControlBlockQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
