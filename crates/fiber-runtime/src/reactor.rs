//! # Reactor: single-threaded fiber scheduler over io_uring
//!
//! One reactor owns one OS thread's worth of fibers. The thread that calls
//! `start()` becomes the driving thread: it switches into a bootstrap fiber
//! and only gets control back once the reactor shuts down.
//!
//! From then on the scheduling loop runs on whichever fiber gives up the
//! CPU. `reschedule()` parks the caller (yield, await, terminate), pulls the
//! next runnable fiber from the FIFO run queue and switches straight into
//! it. When the queue is empty it waits on the ring and routes completions:
//!
//! ```text
//!   token == NOTIFIER  → drain channel: Shutdown | Spawn(task) | Resume{id, outcome}
//!   token == IGNORED   → drop
//!   token == fiber id  → store event, Blocked → Runnable, enqueue
//! ```
//!
//! A terminated fiber cannot free its own block while still running on its
//! stack, so it is recorded as the zombie and released by whichever context
//! resumes after the switch.
//!
//! Shutdown is graceful for runnable fibers: the loop exits to the driving
//! thread once the flag is set and the run queue is empty. Fibers still
//! blocked at that point are abandoned.

use std::any::Any;
use std::cell::UnsafeCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use fiber_core::{
    kdebug, kerror, ktrace, kwarn, BlockError, ControlBlockQueue, ControlBlockTable, FiberId, FiberState,
};
use fiber_ring::{CompletionRing, RingConfig, RingError, Route, UringEvent};

use crate::arch::{self, SavedContext};
use crate::body::{FiberBody, Outcome, Task};
use crate::channel::{Channel, Message, ReactorHandle};
use crate::config::ReactorConfig;
use crate::error::{FiberError, FiberResult};
use crate::fiber::Fiber;
use crate::pool::WorkerPool;
use crate::resolver::Resolver;
use crate::stack::FiberStack;

/// Why the active fiber is giving up the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reason {
    /// Stay runnable, go to the back of the queue
    Yield,
    /// Sleep until a completion or delegated outcome arrives
    Await,
    /// Body finished; never resumes
    Terminate,
}

/// Everything only the reactor thread touches.
struct SchedState {
    // Dropped before the table so in-flight requests are torn down
    // before the stacks they point into are unmapped.
    ring: CompletionRing,
    table: ControlBlockTable<FiberBody>,
    run_queue: ControlBlockQueue<FiberBody>,
    shutdown: bool,
    running: bool,
    /// A POLLIN watch on the channel doorbell is in flight
    notifier_armed: bool,
    active: FiberId,
    /// Terminated fiber awaiting release
    zombie: FiberId,
    /// Driving thread's checkpoint inside `start()`
    root: SavedContext,
}

pub(crate) struct ReactorCore {
    state: UnsafeCell<SchedState>,
    channel: Arc<Channel>,
    pool: WorkerPool,
    resolver: Option<Box<dyn Resolver>>,
    config: ReactorConfig,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// First code every fiber runs on its own stack.
extern "C" fn fiber_entry(arg: usize) -> ! {
    // Safety: `arg` is the boxed ReactorCore that initialized this context;
    // it outlives every fiber it runs.
    let core = unsafe { &*(arg as *const ReactorCore) };
    core.after_switch();

    let id = core.active();
    let task = core.body(id).launch.take();
    if let Some(task) = task {
        let fiber = Fiber::new(id, core);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task(&fiber))) {
            kerror!("fiber {} panicked: {}", id, panic_message(&*payload));
        }
    }

    core.reschedule(id, Reason::Terminate);
    kerror!("terminated fiber {} was resumed", id);
    std::process::abort()
}

impl ReactorCore {
    // Only the reactor thread gets here, and no caller holds the reference
    // across a context switch.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    fn sched(&self) -> &mut SchedState {
        unsafe { &mut *self.state.get() }
    }

    #[inline]
    pub(crate) fn config(&self) -> &ReactorConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    #[inline]
    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    #[inline]
    pub(crate) fn resolver(&self) -> Option<&dyn Resolver> {
        self.resolver.as_deref()
    }

    /// The ring, for submitting a request right before `reschedule`.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub(crate) fn ring(&self) -> &mut CompletionRing {
        &mut self.sched().ring
    }

    #[inline]
    fn active(&self) -> FiberId {
        self.sched().active
    }

    #[allow(clippy::mut_from_ref)]
    fn body(&self, id: FiberId) -> &mut FiberBody {
        body_of(self.sched(), id)
    }

    pub(crate) fn take_event(&self, id: FiberId) -> Option<UringEvent> {
        self.body(id).event.take()
    }

    pub(crate) fn take_delegated(&self, id: FiberId) -> Option<Outcome> {
        self.body(id).delegated.take()
    }

    /// Allocate a fiber around `task` and queue it. No switch happens.
    pub(crate) fn spawn(&self, task: Task) -> FiberResult<FiberId> {
        let st = self.sched();
        let id = self.materialize(st, task)?;
        make_runnable(st, id);
        Ok(id)
    }

    fn materialize(&self, st: &mut SchedState, task: Task) -> FiberResult<FiberId> {
        let (id, block) = st.table.get_or_allocate()?;
        if block.body.stack.is_none() {
            match FiberStack::new(self.config.stack_size) {
                Ok(stack) => block.body.stack = Some(stack),
                Err(e) => {
                    st.table.release(id)?;
                    return Err(e);
                }
            }
        }

        let body = body_of(st, id);
        let top = match &body.stack {
            Some(stack) => stack.top(),
            None => return Err(FiberError::Inconsistent),
        };
        body.launch = Some(task);
        body.state = FiberState::Embryonic;
        unsafe {
            arch::init_context(&mut body.context, top, fiber_entry, self as *const ReactorCore as usize);
        }
        ktrace!("materialized fiber {}", id);
        Ok(id)
    }

    /// Release the fiber that terminated before the last switch.
    fn after_switch(&self) {
        let st = self.sched();
        if st.zombie.is_some() {
            let zombie = std::mem::replace(&mut st.zombie, FiberId::NONE);
            if let Err(e) = st.table.release(zombie) {
                scheduler_fault(format_args!("reaping fiber {}: {}", zombie, e));
            }
        }
    }

    /// Park fiber `me` for `reason` and run something else until `me` is
    /// resumed. Returns immediately to `me` if it is the next runnable fiber.
    pub(crate) fn reschedule(&self, me: FiberId, reason: Reason) {
        let st = self.sched();
        let body = body_of(st, me);
        match reason {
            Reason::Yield => {
                body.state = FiberState::Yielding;
                body.yielding = true;
                // Let completions that are already in queue ahead of us
                self.drain_ready(st);
                let body = body_of(st, me);
                body.yielding = false;
                make_runnable(st, me);
            }
            Reason::Await => {
                body.state = FiberState::Blocked;
                body.awaiting = true;
            }
            Reason::Terminate => {
                body.state = FiberState::Terminated;
                st.zombie = me;
            }
        }
        self.dispatch(me);
    }

    fn dispatch(&self, me: FiberId) {
        let mut first_wait = true;
        loop {
            let st = self.sched();
            match st.run_queue.dequeue(&mut st.table) {
                Ok(next) if next == me => {
                    body_of(st, me).state = FiberState::Active;
                    st.active = me;
                    return;
                }
                Ok(next) => {
                    let from: *mut SavedContext = &mut body_of(st, me).context;
                    let next_body = body_of(st, next);
                    next_body.state = FiberState::Active;
                    let to: *const SavedContext = &next_body.context;
                    st.active = next;
                    unsafe { arch::switch_context(from, to) };
                    self.after_switch();
                    return;
                }
                Err(BlockError::EmptyQueue) => {
                    if st.shutdown {
                        let from: *mut SavedContext = &mut body_of(st, me).context;
                        let to: *const SavedContext = &st.root;
                        st.active = FiberId::NONE;
                        unsafe { arch::switch_context(from, to) };
                        self.after_switch();
                        return;
                    }
                    let timeout = if first_wait {
                        Some(Duration::ZERO)
                    } else {
                        self.config.wait_timeout
                    };
                    first_wait = false;
                    self.wait_once(st, timeout);
                }
                Err(e) => scheduler_fault(format_args!("run queue corrupted: {}", e)),
            }
        }
    }

    fn wait_once(&self, st: &mut SchedState, timeout: Option<Duration>) {
        match st.ring.await_event(timeout) {
            Ok(Some(event)) => {
                self.route(st, event);
                self.drain_ready(st);
            }
            Ok(None) => {}
            Err(e) => self.ring_failed(st, e),
        }
    }

    /// Route every completion that is ready without blocking.
    fn drain_ready(&self, st: &mut SchedState) {
        loop {
            match st.ring.await_event(Some(Duration::ZERO)) {
                Ok(Some(event)) => self.route(st, event),
                Ok(None) => break,
                Err(e) => {
                    self.ring_failed(st, e);
                    break;
                }
            }
        }
    }

    fn ring_failed(&self, st: &mut SchedState, e: RingError) {
        kerror!("ring wait failed, stopping reactor: {}", e);
        st.shutdown = true;
    }

    fn route(&self, st: &mut SchedState, event: UringEvent) {
        ktrace!("completion {:?} result {}", event.token, event.result);
        match event.token.route() {
            Route::Notifier => {
                st.notifier_armed = false;
                self.drain_channel(st);
            }
            Route::Ignored => {}
            Route::Fiber(id) => {
                let body = expect_waiting(st, id, "completion");
                body.event = Some(event);
                wake(st, id);
            }
            Route::Unknown(raw) => scheduler_fault(format_args!("completion with unknown token {:#x}", raw)),
        }
    }

    fn drain_channel(&self, st: &mut SchedState) {
        if let Err(e) = self.channel.ack() {
            kerror!("doorbell drain failed: {}", e);
        }

        while let Some(msg) = self.channel.try_recv() {
            match msg {
                Message::Shutdown => {
                    kdebug!("shutdown requested");
                    st.shutdown = true;
                }
                Message::Spawn(task) => match self.materialize(st, task) {
                    Ok(id) => make_runnable(st, id),
                    Err(e) => kerror!("dropping posted fiber: {}", e),
                },
                Message::Resume { id, outcome } => {
                    let body = expect_waiting(st, id, "delegated outcome");
                    body.delegated = Some(outcome);
                    wake(st, id);
                }
            }
        }

        match st.ring.register_event_notifier(self.channel.fd()) {
            Ok(()) => st.notifier_armed = true,
            Err(e) => kerror!("notifier re-arm failed: {}", e),
        }
    }
}

/// Scheduler bookkeeping is broken. Unwinding from here would cross the
/// `extern "C"` fiber entry or leave the run queue half-linked, so log and
/// stop the process.
#[cold]
fn scheduler_fault(args: fmt::Arguments<'_>) -> ! {
    kerror!("scheduler fault: {}", args);
    std::process::abort()
}

fn body_of(st: &mut SchedState, id: FiberId) -> &mut FiberBody {
    match st.table.get_block(id) {
        Ok(block) => &mut block.body,
        Err(e) => scheduler_fault(format_args!("fiber {}: {}", id, e)),
    }
}

/// Mark `id` Runnable and append it to the run queue.
fn make_runnable(st: &mut SchedState, id: FiberId) {
    body_of(st, id).state = FiberState::Runnable;
    if let Err(e) = st.run_queue.enqueue(&mut st.table, id) {
        scheduler_fault(format_args!("enqueue fiber {}: {}", id, e));
    }
}

/// Body of fiber `id`, which must be blocked waiting for `what`.
fn expect_waiting<'a>(st: &'a mut SchedState, id: FiberId, what: &str) -> &'a mut FiberBody {
    let body = body_of(st, id);
    if !body.state.accepts_completion() || !body.awaiting {
        scheduler_fault(format_args!(
            "{} for fiber {} in state {} (awaiting: {})",
            what, id, body.state, body.awaiting
        ));
    }
    body
}

fn wake(st: &mut SchedState, id: FiberId) {
    let body = body_of(st, id);
    body.awaiting = false;
    make_runnable(st, id);
}

/// A fiber scheduler bound to the thread that calls `start()`.
pub struct Reactor {
    core: Box<ReactorCore>,
}

impl Reactor {
    pub fn new(config: ReactorConfig) -> FiberResult<Self> {
        config.validate()?;
        let ring = CompletionRing::new(RingConfig {
            entries: config.ring_entries,
        })?;
        let channel = Arc::new(Channel::new()?);
        let pool = WorkerPool::new(config.pool_workers, config.pool_queue)?;

        kdebug!(
            "reactor created: ring_entries={} max_fibers={} pool_workers={}",
            config.ring_entries,
            config.max_fibers,
            config.pool_workers
        );

        let state = SchedState {
            ring,
            table: ControlBlockTable::with_limit(config.max_fibers),
            run_queue: ControlBlockQueue::new(),
            shutdown: false,
            running: false,
            notifier_armed: false,
            active: FiberId::NONE,
            zombie: FiberId::NONE,
            root: SavedContext::default(),
        };

        Ok(Self {
            core: Box::new(ReactorCore {
                state: UnsafeCell::new(state),
                channel,
                pool,
                resolver: None,
                config,
            }),
        })
    }

    /// Thread-safe handle for `post`/`execute`/`shutdown`.
    pub fn handle(&self) -> ReactorHandle {
        ReactorHandle::new(Arc::clone(&self.core.channel))
    }

    /// Install the name resolver used by `Fiber::lookup_network_endpoints`.
    pub fn set_resolver(&mut self, resolver: Box<dyn Resolver>) {
        self.core.resolver = Some(resolver);
    }

    pub fn post<F>(&self, f: F) -> FiberResult<()>
    where
        F: FnOnce(&Fiber) + Send + 'static,
    {
        self.handle().post(f)
    }

    pub fn shutdown(&self) -> FiberResult<()> {
        self.handle().shutdown()
    }

    /// Run fibers on the calling thread until shutdown.
    pub fn start(&self) -> FiberResult<()> {
        let core = &*self.core;
        let st = core.sched();
        if st.running {
            return Err(FiberError::AlreadyRunning);
        }
        if !st.notifier_armed {
            st.ring.register_event_notifier(core.channel.fd())?;
            st.notifier_armed = true;
        }
        let boot = core.materialize(st, Box::new(|_: &Fiber| {}))?;

        st.running = true;
        st.shutdown = false;
        st.active = boot;
        let boot_body = body_of(st, boot);
        boot_body.state = FiberState::Active;
        let to: *const SavedContext = &boot_body.context;
        let from: *mut SavedContext = &mut st.root;
        kdebug!("reactor started, bootstrap fiber {}", boot);
        unsafe { arch::switch_context(from, to) };

        // Back on the driving thread after shutdown
        core.after_switch();
        let st = core.sched();
        st.running = false;
        let abandoned = st.table.count();
        if abandoned > 0 {
            kwarn!("reactor stopped with {} blocked fibers abandoned", abandoned);
        } else {
            kdebug!("reactor stopped");
        }
        Ok(())
    }

    /// Live fibers (queued, blocked or running)
    pub fn live_fibers(&self) -> usize {
        self.core.sched().table.count()
    }

    pub fn is_running(&self) -> bool {
        self.core.sched().running
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.core.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiber_ring::Token;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::time::Instant;

    fn reactor_or_skip() -> Option<Reactor> {
        match Reactor::new(ReactorConfig::new().pool_workers(2)) {
            Ok(reactor) => Some(reactor),
            Err(e) => {
                kwarn!("io_uring unavailable, skipping: {}", e);
                None
            }
        }
    }

    /// Post `f`, shut down once it returns, drive the reactor to completion.
    fn run<F>(reactor: &Reactor, f: F)
    where
        F: FnOnce(&Fiber) + Send + 'static,
    {
        let handle = reactor.handle();
        reactor
            .post(move |fiber| {
                f(fiber);
                handle.shutdown().unwrap();
            })
            .unwrap();
        reactor.start().unwrap();
    }

    #[test]
    fn test_post_and_shutdown_from_foreign_thread() {
        let Some(reactor) = reactor_or_skip() else { return };
        let ran = Arc::new(AtomicUsize::new(0));
        let handle = reactor.handle();
        let (done_tx, done_rx) = mpsc::channel();

        let ran2 = ran.clone();
        let poster = std::thread::spawn(move || {
            handle
                .post(move |_| {
                    ran2.fetch_add(1, Ordering::SeqCst);
                    done_tx.send(()).unwrap();
                })
                .unwrap();
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            handle.shutdown().unwrap();
        });

        reactor.start().unwrap();
        poster.join().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(reactor.live_fibers(), 0);
        assert!(!reactor.is_running());
    }

    #[test]
    fn test_terminated_id_reused() {
        let Some(reactor) = reactor_or_skip() else { return };
        let ids = Arc::new(Mutex::new(Vec::new()));

        let ids2 = ids.clone();
        run(&reactor, move |fiber| {
            ids2.lock().unwrap().push(fiber.id());
            let ids3 = ids2.clone();
            let child = fiber
                .spawn(move |f| ids3.lock().unwrap().push(f.id()))
                .unwrap();
            // Bootstrap fiber 0 was released before we started
            assert_eq!(child, FiberId::new(0));
            fiber.yield_now();
        });

        let ids = ids.lock().unwrap();
        assert_eq!(*ids, vec![FiberId::new(1), FiberId::new(0)]);
        assert_eq!(reactor.live_fibers(), 0);
    }

    #[test]
    fn test_queued_fibers_are_runnable() {
        let Some(reactor) = reactor_or_skip() else { return };
        let seen = Arc::new(Mutex::new(Vec::new()));

        // Both posted fibers are queued from the channel before either runs
        let seen2 = seen.clone();
        reactor
            .post(move |fiber| {
                let st = fiber.core().sched();
                for block in st.table.iter_live().filter(|b| b.id() != fiber.id()) {
                    seen2.lock().unwrap().push((block.body.state(), block.is_queued()));
                }
            })
            .unwrap();
        let seen3 = seen.clone();
        let handle = reactor.handle();
        reactor
            .post(move |fiber| {
                let child = fiber.spawn(|_| {}).unwrap();
                let block = fiber.core().sched().table.get(child).unwrap();
                seen3.lock().unwrap().push((block.body.state(), block.is_queued()));
                handle.shutdown().unwrap();
            })
            .unwrap();
        reactor.start().unwrap();

        let queued = (FiberState::Runnable, true);
        assert_eq!(*seen.lock().unwrap(), vec![queued, queued]);
        assert_eq!(reactor.live_fibers(), 0);
    }

    #[test]
    fn test_scheduler_fault_aborts() {
        const CHILD_ENV: &str = "FIBER_SCHEDULER_FAULT_CHILD";
        let Some(reactor) = reactor_or_skip() else { return };

        if std::env::var_os(CHILD_ENV).is_some() {
            // A completion nobody issued must take the process down, not
            // just the fiber that happened to route it
            run(&reactor, |fiber| {
                fiber.core().ring().nop(Some(Token(1 << 40)), false).unwrap();
                fiber.await_timeout(Duration::from_millis(50)).unwrap();
            });
            return;
        }
        drop(reactor);

        let exe = std::env::current_exe().unwrap();
        let status = std::process::Command::new(exe)
            .args(["--exact", "reactor::tests::test_scheduler_fault_aborts", "--test-threads=1"])
            .env(CHILD_ENV, "1")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(libc::SIGABRT), "child exited with {}", status);
    }

    #[test]
    fn test_yield_interleaves_fifo() {
        let Some(reactor) = reactor_or_skip() else { return };
        let log = Arc::new(Mutex::new(Vec::new()));

        let log2 = log.clone();
        run(&reactor, move |fiber| {
            for name in ["a", "b"] {
                let log = log2.clone();
                fiber
                    .spawn(move |f| {
                        log.lock().unwrap().push(format!("{}1", name));
                        f.yield_now();
                        log.lock().unwrap().push(format!("{}2", name));
                    })
                    .unwrap();
            }
        });

        assert_eq!(*log.lock().unwrap(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn test_yield_alone_resumes_in_place() {
        let Some(reactor) = reactor_or_skip() else { return };
        let count = Arc::new(AtomicUsize::new(0));

        let count2 = count.clone();
        run(&reactor, move |fiber| {
            for _ in 0..100 {
                fiber.yield_now();
                count2.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(count.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_timeout_suspends_fiber() {
        let Some(reactor) = reactor_or_skip() else { return };
        let elapsed = Arc::new(Mutex::new(Duration::ZERO));

        let elapsed2 = elapsed.clone();
        run(&reactor, move |fiber| {
            let start = Instant::now();
            fiber.await_timeout(Duration::from_millis(20)).unwrap();
            fiber.await_deadline(Instant::now() + Duration::from_millis(10)).unwrap();
            *elapsed2.lock().unwrap() = start.elapsed();
        });
        assert!(*elapsed.lock().unwrap() >= Duration::from_millis(30));
    }

    #[test]
    fn test_panicking_fiber_is_contained() {
        let Some(reactor) = reactor_or_skip() else { return };
        let after = Arc::new(AtomicUsize::new(0));

        let after2 = after.clone();
        run(&reactor, move |fiber| {
            fiber.spawn(|_| panic!("fiber body failure")).unwrap();
            fiber.yield_now();
            after2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert_eq!(reactor.live_fibers(), 0);
    }

    #[test]
    fn test_compute_result_and_panic() {
        let Some(reactor) = reactor_or_skip() else { return };
        let results = Arc::new(Mutex::new((0u64, String::new())));

        let results2 = results.clone();
        run(&reactor, move |fiber| {
            let sum = fiber.compute(|| (1..=100u64).sum::<u64>()).unwrap();
            let caught = panic::catch_unwind(AssertUnwindSafe(|| {
                fiber.compute(|| -> u32 { panic!("worker boom") })
            }));
            let msg = match caught {
                Err(payload) => panic_message(&*payload).to_string(),
                Ok(_) => String::from("no panic"),
            };
            *results2.lock().unwrap() = (sum, msg);
        });

        let results = results.lock().unwrap();
        assert_eq!(results.0, 5050);
        assert_eq!(results.1, "worker boom");
    }

    #[test]
    fn test_execute_runs_on_pool_thread() {
        let Some(reactor) = reactor_or_skip() else { return };
        let name = Arc::new(Mutex::new(String::new()));

        let name2 = name.clone();
        run(&reactor, move |fiber| {
            let inner = name2.clone();
            fiber
                .execute(move || {
                    let current = std::thread::current();
                    *inner.lock().unwrap() = current.name().unwrap_or("").to_string();
                })
                .unwrap();
        });
        assert!(name.lock().unwrap().starts_with("fiber-pool-"));
    }

    #[test]
    fn test_exhausted_table_drops_posted_fiber() {
        let config = ReactorConfig::new().max_fibers(2).pool_workers(1);
        let reactor = match Reactor::new(config) {
            Ok(r) => r,
            Err(e) => {
                kwarn!("io_uring unavailable, skipping: {}", e);
                return;
            }
        };
        let ran = Arc::new(AtomicUsize::new(0));

        let ran2 = ran.clone();
        run(&reactor, move |fiber| {
            // Bootstrap is gone; this fiber holds one slot
            let r = ran2.clone();
            fiber.spawn(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
            }).unwrap();
            let r = ran2.clone();
            let err = fiber.spawn(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(err, Err(FiberError::Block(BlockError::Exhausted)));
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
