//! # fiber-core
//!
//! Platform-agnostic building blocks of the fiber reactor.
//!
//! ## Modules
//!
//! - `id` - fiber identifier (also the request correlation token)
//! - `state` - fiber state machine
//! - `control_block` - slab of control blocks with a LIFO free list
//! - `queue` - intrusive FIFO run queue over the slab
//! - `error` - slab and queue errors
//! - `kprint` - leveled stderr logging macros
//! - `env` - environment variable helpers

pub mod id;
pub mod state;
pub mod control_block;
pub mod queue;
pub mod error;
pub mod kprint;
pub mod env;

pub use id::FiberId;
pub use state::FiberState;
pub use control_block::{BlockBody, ControlBlock, ControlBlockTable, MAX_LIVE_BLOCKS};
pub use queue::ControlBlockQueue;
pub use error::{BlockError, BlockResult};
pub use env::{env_get, env_get_bool, env_get_millis, env_get_opt};
