//! Error types for the control-block table and run queue

use core::fmt;
use crate::id::FiberId;

/// Result type for control-block operations
pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised by `ControlBlockTable` and `ControlBlockQueue`.
///
/// `Exhausted` is the only recoverable one. The rest are programming
/// errors and callers treat them as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// No free control block left
    Exhausted,

    /// Id beyond the high-water mark
    OutOfRange(FiberId),

    /// Release of an id that was never handed out
    NeverAllocated(FiberId),

    /// Release of an id that is already free or still in a queue
    DoubleRelease(FiberId),

    /// Enqueue of a block that is already linked
    AlreadyLinked(FiberId),

    /// Dequeue from an empty queue
    EmptyQueue,
}

impl BlockError {
    /// Whether the error indicates a bug in the caller rather than load
    #[inline]
    pub const fn is_logic_fault(&self) -> bool {
        !matches!(self, BlockError::Exhausted | BlockError::EmptyQueue)
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Exhausted => write!(f, "control-block table exhausted"),
            BlockError::OutOfRange(id) => write!(f, "control block {} out of range", id),
            BlockError::NeverAllocated(id) => write!(f, "control block {} was never allocated", id),
            BlockError::DoubleRelease(id) => write!(f, "control block {} released twice", id),
            BlockError::AlreadyLinked(id) => write!(f, "control block {} is already queued", id),
            BlockError::EmptyQueue => write!(f, "queue is empty"),
        }
    }
}

impl std::error::Error for BlockError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", BlockError::Exhausted), "control-block table exhausted");
        assert_eq!(
            format!("{}", BlockError::DoubleRelease(FiberId::new(7))),
            "control block 7 released twice"
        );
    }

    #[test]
    fn test_logic_fault_classification() {
        assert!(!BlockError::Exhausted.is_logic_fault());
        assert!(!BlockError::EmptyQueue.is_logic_fault());
        assert!(BlockError::NeverAllocated(FiberId::new(1)).is_logic_fault());
        assert!(BlockError::OutOfRange(FiberId::new(1)).is_logic_fault());
    }
}
