//! Library defaults, overridable through `FIBER_*` environment variables.

/// io_uring submission queue entries
pub const RING_ENTRIES: u32 = 256;

/// Usable stack bytes per fiber (one guard page is added)
pub const STACK_SIZE: usize = 128 * 1024;

/// Smallest stack accepted by `validate()`
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Live fiber cap (the id space holds 65,535)
pub const MAX_FIBERS: usize = 65_535;

pub const POOL_WORKERS: usize = 2;

pub const POOL_QUEUE: usize = 1024;

/// Scheduler wait bound in ms; 0 waits indefinitely
pub const WAIT_TIMEOUT_MS: u64 = 0;
