//! # fiber-runtime
//!
//! Stackful fibers on a single-threaded io_uring reactor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  driving thread: Reactor::start()                            │
//! │                                                              │
//! │   fiber A ──reschedule──▶ fiber B ──reschedule──▶ ...        │
//! │      │                       │                               │
//! │      ▼                       ▼                               │
//! │   ControlBlockTable ◀── run queue ◀── completion routing     │
//! │                                          ▲                   │
//! │                              CompletionRing (io_uring)       │
//! │                                          ▲ eventfd           │
//! └──────────────────────────────────────────┼───────────────────┘
//!                                            │
//!     other threads: ReactorHandle::post / shutdown
//!     worker pool:   compute / execute results
//! ```
//!
//! Fibers switch directly into each other; the driving thread only gets
//! control back when the reactor shuts down.

pub mod arch;
pub mod body;
pub mod channel;
pub mod config;
pub mod error;
pub mod fiber;
pub mod net;
pub mod pool;
pub mod reactor;
pub mod resolver;
pub mod stack;

pub use body::Task;
pub use channel::ReactorHandle;
pub use config::{ConfigError, ReactorConfig};
pub use error::{FiberError, FiberResult};
pub use fiber::Fiber;
pub use pool::WorkerPool;
pub use reactor::Reactor;
pub use resolver::{FiberResolverIo, Resolver, ResolverIo};
pub use stack::FiberStack;

pub use fiber_core::kprint::LogLevel;
pub use fiber_core::FiberId;
