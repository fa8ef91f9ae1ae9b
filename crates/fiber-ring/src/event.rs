//! Completion events copied out of the completion queue.

use crate::token::Token;

/// One completion. Copying it out of the CQ acknowledges the kernel slot,
/// so the value stays valid independently of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UringEvent {
    pub token: Token,
    /// Operation result; negative values are `-errno`
    pub result: i32,
    pub flags: u32,
}

impl UringEvent {
    pub const fn new(token: Token, result: i32) -> Self {
        Self { token, result, flags: 0 }
    }

    #[inline]
    pub const fn is_error(&self) -> bool {
        self.result < 0
    }

    /// Positive errno if the operation failed
    #[inline]
    pub const fn errno(&self) -> Option<i32> {
        if self.result < 0 {
            Some(-self.result)
        } else {
            None
        }
    }
}

impl From<&io_uring::cqueue::Entry> for UringEvent {
    fn from(cqe: &io_uring::cqueue::Entry) -> Self {
        Self {
            token: Token(cqe.user_data()),
            result: cqe.result(),
            flags: cqe.flags(),
        }
    }
}
