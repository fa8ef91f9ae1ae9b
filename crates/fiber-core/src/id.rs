//! Fiber identifier type

use core::fmt;

/// Identifier of a fiber control block.
///
/// A 16-bit dense index into the control-block table. The same value is used
/// as the correlation token of every request the fiber submits and as the
/// intrusive "next" link of the free list and the run queue.
/// The maximum value (u16::MAX) is reserved as the "no link" sentinel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FiberId(u16);

impl FiberId {
    /// Sentinel value: no fiber / no link
    pub const NONE: FiberId = FiberId(u16::MAX);

    /// Create a new FiberId from a raw value
    #[inline]
    pub const fn new(id: u16) -> Self {
        FiberId(id)
    }

    /// Get the raw u16 value
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Get as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u16::MAX
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u16::MAX
    }

    /// Next id in allocation order. Saturates at the sentinel.
    #[inline]
    pub const fn next(self) -> FiberId {
        if self.0 == u16::MAX {
            self
        } else {
            FiberId(self.0 + 1)
        }
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<FiberId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }

    /// Recover an id from a correlation token.
    ///
    /// Returns `None` for tokens wider than 16 bits or equal to the sentinel.
    #[inline]
    pub const fn from_token(token: u64) -> Option<FiberId> {
        if token >= u16::MAX as u64 {
            None
        } else {
            Some(FiberId(token as u16))
        }
    }

    /// The correlation token carried by requests of this fiber.
    #[inline]
    pub const fn as_token(self) -> u64 {
        self.0 as u64
    }
}

impl From<u16> for FiberId {
    #[inline]
    fn from(id: u16) -> Self {
        FiberId(id)
    }
}

impl From<FiberId> for u16 {
    #[inline]
    fn from(id: FiberId) -> Self {
        id.0
    }
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "FiberId(NONE)")
        } else {
            write!(f, "FiberId({})", self.0)
        }
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for FiberId {
    fn default() -> Self {
        FiberId::NONE
    }
}
