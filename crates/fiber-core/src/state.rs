//! Fiber state machine

use core::fmt;

/// State of a fiber control block.
///
/// ```text
/// Unallocated ──allocate──▶ Embryonic ──first switch──▶ Active
///                                                          │
///            ┌──────────── yield ──── Yielding ◀───────────┤
///            ▼                                             │
///        Runnable ◀── completion ── Blocked ◀── await ─────┤
///            │                                             │
///            └──────────── switch in ──────────▶ Active    └──▶ Terminated ──release──▶ Unallocated
/// ```
///
/// At most one fiber per reactor is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FiberState {
    /// Slot is on the free list (or never used)
    #[default]
    Unallocated = 0,

    /// Allocated, launch closure set, never run
    Embryonic = 1,

    /// Currently executing on the reactor thread
    Active = 2,

    /// Voluntarily gave up the CPU, about to be re-queued
    Yielding = 3,

    /// Waiting for a completion (I/O, timer, delegated job)
    Blocked = 4,

    /// In the run queue
    Runnable = 5,

    /// Body returned; slot is released after the next switch
    Terminated = 6,
}

impl FiberState {
    /// Check whether the fiber sits in (or belongs in) the run queue
    #[inline]
    pub const fn is_runnable(&self) -> bool {
        matches!(self, FiberState::Runnable)
    }

    /// Check whether a completion may be delivered to this fiber
    #[inline]
    pub const fn accepts_completion(&self) -> bool {
        matches!(self, FiberState::Blocked)
    }

    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, FiberState::Terminated)
    }

    /// Check whether the slot holds a live fiber
    #[inline]
    pub const fn is_live(&self) -> bool {
        !matches!(self, FiberState::Unallocated | FiberState::Terminated)
    }
}

impl From<u8> for FiberState {
    fn from(v: u8) -> Self {
        match v {
            1 => FiberState::Embryonic,
            2 => FiberState::Active,
            3 => FiberState::Yielding,
            4 => FiberState::Blocked,
            5 => FiberState::Runnable,
            6 => FiberState::Terminated,
            _ => FiberState::Unallocated,
        }
    }
}

impl From<FiberState> for u8 {
    fn from(state: FiberState) -> u8 {
        state as u8
    }
}

impl fmt::Display for FiberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FiberState::Unallocated => "unallocated",
            FiberState::Embryonic => "embryonic",
            FiberState::Active => "active",
            FiberState::Yielding => "yielding",
            FiberState::Blocked => "blocked",
            FiberState::Runnable => "runnable",
            FiberState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(FiberState::Runnable.is_runnable());
        assert!(!FiberState::Active.is_runnable());

        assert!(FiberState::Blocked.accepts_completion());
        assert!(!FiberState::Runnable.accepts_completion());
        assert!(!FiberState::Active.accepts_completion());

        assert!(FiberState::Terminated.is_terminated());
        assert!(!FiberState::Terminated.is_live());
        assert!(!FiberState::Unallocated.is_live());
        assert!(FiberState::Embryonic.is_live());
    }

    #[test]
    fn test_state_u8_round_trip() {
        for v in 0u8..=6 {
            let s = FiberState::from(v);
            assert_eq!(u8::from(s), v);
        }
        assert_eq!(FiberState::from(200), FiberState::Unallocated);
    }
}
