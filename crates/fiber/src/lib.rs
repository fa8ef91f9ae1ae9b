//! # fiber - stackful fibers on io_uring
//!
//! Straight-line blocking-style code that runs as fibers on a
//! single-threaded io_uring reactor. Every I/O call suspends only the
//! calling fiber; the reactor thread keeps running the others.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fiber::{block_on, ReactorConfig};
//! use std::time::Duration;
//!
//! fn main() {
//!     block_on(ReactorConfig::from_env(), |fiber| {
//!         fiber.spawn(|f| {
//!             f.await_timeout(Duration::from_millis(10)).unwrap();
//!             println!("child {} woke up", f.id());
//!         }).unwrap();
//!
//!         let sum = fiber.compute(|| (1..=1000u64).sum::<u64>()).unwrap();
//!         println!("sum computed on the pool: {}", sum);
//!     }).unwrap();
//! }
//! ```
//!
//! ## Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  fiber            block_on, re-exports                   │
//! ├──────────────────────────────────────────────────────────┤
//! │  fiber-runtime    Reactor, Fiber, channel, worker pool   │
//! ├──────────────────────────────────────────────────────────┤
//! │  fiber-ring       CompletionRing, tokens, eventfd        │
//! ├──────────────────────────────────────────────────────────┤
//! │  fiber-core       control-block table, run queue, logs   │
//! └──────────────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use fiber_core::{BlockError, FiberId, FiberState};

// Re-export kprint macros
pub use fiber_core::{kdebug, kerror, kinfo, kprintln, ktrace, kwarn};
pub use fiber_core::kprint::{init as init_logging, set_flush_enabled, set_log_level, LogLevel};

// Re-export env utilities
pub use fiber_core::{env_get, env_get_bool, env_get_millis, env_get_opt};

pub use fiber_ring::{RingError, UringEvent};

// Re-export runtime types
pub use fiber_runtime::{
    ConfigError, Fiber, FiberError, FiberResolverIo, FiberResult, Reactor, ReactorConfig, ReactorHandle, Resolver,
    ResolverIo, Task,
};

/// Sends shutdown when dropped, so the reactor stops even if the root
/// fiber panics.
struct ShutdownOnDrop(ReactorHandle);

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        if let Err(e) = self.0.shutdown() {
            kerror!("block_on: shutdown request failed: {}", e);
        }
    }
}

/// Run `f` as the root fiber of `reactor` on the calling thread. Returns
/// once `f` and every fiber still runnable after it have finished.
pub fn run_on<F>(reactor: &Reactor, f: F) -> FiberResult<()>
where
    F: FnOnce(&Fiber) + Send + 'static,
{
    let guard = ShutdownOnDrop(reactor.handle());
    reactor.post(move |fiber| {
        let _guard = guard;
        f(fiber);
    })?;
    reactor.start()
}

/// Build a reactor from `config` and `run_on` it.
pub fn block_on<F>(config: ReactorConfig, f: F) -> FiberResult<()>
where
    F: FnOnce(&Fiber) + Send + 'static,
{
    init_logging();
    let reactor = Reactor::new(config)?;
    run_on(&reactor, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ring_unavailable(result: &FiberResult<()>) -> bool {
        if let Err(FiberError::Ring(e)) = result {
            kwarn!("io_uring unavailable, skipping: {}", e);
            return true;
        }
        false
    }

    #[test]
    fn test_block_on_waits_for_children() {
        let done = Arc::new(AtomicUsize::new(0));

        let done2 = done.clone();
        let result = block_on(ReactorConfig::new(), move |fiber| {
            for i in 0..8u64 {
                let d = done2.clone();
                fiber
                    .spawn(move |f| {
                        f.await_timeout(Duration::from_millis(i)).unwrap();
                        d.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            }
            // Children block on timers, so the root must wait for them too
            fiber.await_timeout(Duration::from_millis(50)).unwrap();
        });
        if ring_unavailable(&result) {
            return;
        }
        result.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_block_on_survives_root_panic() {
        let result = block_on(ReactorConfig::new(), |_| panic!("root fiber failure"));
        if ring_unavailable(&result) {
            return;
        }
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = block_on(ReactorConfig::new().pool_workers(0), |_| {});
        assert!(matches!(result, Err(FiberError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_on_reuses_reactor() {
        let reactor = match Reactor::new(ReactorConfig::new()) {
            Ok(r) => r,
            Err(e) => {
                kwarn!("io_uring unavailable, skipping: {}", e);
                return;
            }
        };
        let runs = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let r = runs.clone();
            run_on(&reactor, move |fiber| {
                fiber.yield_now();
                r.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(reactor.live_fibers(), 0);
    }
}
