//! Per-fiber control-block payload.

use std::any::Any;
use std::thread;

use fiber_core::{BlockBody, FiberState};
use fiber_ring::UringEvent;

use crate::arch::SavedContext;
use crate::fiber::Fiber;
use crate::stack::FiberStack;

/// Fiber body closure. Runs once on the reactor thread.
pub type Task = Box<dyn FnOnce(&Fiber) + Send + 'static>;

/// Result of a delegated computation: value or panic payload.
pub type Outcome = thread::Result<Box<dyn Any + Send>>;

#[derive(Default)]
pub struct FiberBody {
    pub(crate) context: SavedContext,
    /// Kept across slot reuse
    pub(crate) stack: Option<FiberStack>,
    pub(crate) launch: Option<Task>,
    /// Completion that woke the fiber
    pub(crate) event: Option<UringEvent>,
    pub(crate) delegated: Option<Outcome>,
    pub(crate) state: FiberState,
    pub(crate) yielding: bool,
    /// A completion or delegated outcome is expected
    pub(crate) awaiting: bool,
}

impl FiberBody {
    pub fn state(&self) -> FiberState {
        self.state
    }
}

impl BlockBody for FiberBody {
    fn reset(&mut self) {
        self.context = SavedContext::default();
        self.launch = None;
        self.event = None;
        self.delegated = None;
        self.state = FiberState::Unallocated;
        self.yielding = false;
        self.awaiting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiber_core::ControlBlockTable;

    #[test]
    fn test_reset_keeps_stack() {
        let mut table: ControlBlockTable<FiberBody> = ControlBlockTable::new();
        let (id, block) = table.get_or_allocate().unwrap();
        block.body.stack = Some(FiberStack::new(64 * 1024).unwrap());
        block.body.launch = Some(Box::new(|_: &Fiber| {}));
        block.body.state = FiberState::Terminated;
        let top = block.body.stack.as_ref().unwrap().top();
        table.release(id).unwrap();

        let (again, block) = table.get_or_allocate().unwrap();
        assert_eq!(again, id);
        assert!(block.body.launch.is_none());
        assert_eq!(block.body.state(), FiberState::Unallocated);
        assert_eq!(block.body.stack.as_ref().map(|s| s.top()), Some(top));
    }
}
