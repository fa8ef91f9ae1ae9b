//! Basic fiber example
//!
//! Spawns a handful of fibers that yield, sleep on ring timers and hand a
//! CPU-heavy job to the worker pool, all on one reactor thread.
//!
//! # Environment Variables
//!
//! - `FIBER_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `FIBER_FLUSH_EPRINT=1` - Flush log output immediately
//! - `FIBER_POOL_WORKERS=4` - Worker pool size (see `ReactorConfig::from_env`)

use fiber::{block_on, kinfo, LogLevel, ReactorConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// FIBER_LOG_LEVEL=debug cargo run -p fiber-basic
fn main() {
    println!("=== Fiber Basic Example ===\n");

    let config = ReactorConfig::from_env();
    config.print();

    let completed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let c = completed.clone();
    let result = block_on(config, move |fiber| {
        kinfo!("Spawning fibers...");

        // Three fibers interleaving through yield_now
        for i in 1..=3 {
            let c = c.clone();
            let id = fiber
                .spawn(move |f| {
                    for j in 0..3 {
                        f.log(LogLevel::Info, format_args!("worker {} iteration {}", i, j));
                        f.yield_now();
                    }
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .expect("spawn");
            println!("Spawned fiber {} (ID={})", i, id);
        }

        // Sleepers finish in deadline order regardless of spawn order
        for ms in [30u64, 10, 20] {
            let c = c.clone();
            fiber
                .spawn(move |f| {
                    f.await_timeout(Duration::from_millis(ms)).expect("timer");
                    f.log(LogLevel::Info, format_args!("woke after {}ms", ms));
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .expect("spawn");
        }

        // Delegated work does not stall the reactor
        let n = 30u64;
        let fib = fiber
            .compute(move || {
                let (mut a, mut b) = (0u64, 1u64);
                for _ in 0..n {
                    let t = a + b;
                    a = b;
                    b = t;
                }
                a
            })
            .expect("compute");
        fiber.log(LogLevel::Info, format_args!("fib({}) = {} from the pool", n, fib));
        c.fetch_add(1, Ordering::SeqCst);
    });

    if let Err(e) = result {
        eprintln!("reactor failed: {}", e);
        std::process::exit(1);
    }

    kinfo!(
        "{} fiber(s) completed in {:?}",
        completed.load(Ordering::SeqCst),
        start.elapsed()
    );
    println!("\n=== Example Complete ===");
}
