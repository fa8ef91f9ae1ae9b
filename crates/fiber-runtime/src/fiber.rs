//! `Fiber`: the handle a fiber body receives.
//!
//! Every blocking-looking call here follows the same shape: push one request
//! tagged with this fiber's token, give up the CPU with `Reason::Await`, and
//! decode the completion the reactor stored on wakeup. A fiber never has more
//! than one request outstanding.
//!
//! Socket operations live in `net.rs`, name lookup in `resolver.rs`.

use std::any::Any;
use std::ffi::CString;
use std::fmt;
use std::os::unix::io::RawFd;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fiber_core::kprint::{self, LogLevel};
use fiber_core::{kerror, FiberId};
use fiber_ring::{sys, CompletionRing, RingResult, Token};

use crate::body::Outcome;
use crate::channel::{Message, ReactorHandle};
use crate::error::{FiberError, FiberResult};
use crate::reactor::{Reason, ReactorCore};

/// Largest single read/write handed to the ring
const MAX_IO_CHUNK: usize = u32::MAX as usize;

/// Execution context of one fiber. Only valid inside the fiber body it was
/// passed to; it is neither `Send` nor `Sync`.
pub struct Fiber {
    id: FiberId,
    core: NonNull<ReactorCore>,
}

impl Fiber {
    pub(crate) fn new(id: FiberId, core: &ReactorCore) -> Self {
        Self {
            id,
            core: NonNull::from(core),
        }
    }

    #[inline]
    pub(crate) fn core(&self) -> &ReactorCore {
        // The reactor outlives every fiber it runs
        unsafe { self.core.as_ref() }
    }

    #[inline]
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Handle for posting fibers or requesting shutdown from inside a fiber.
    pub fn handle(&self) -> ReactorHandle {
        ReactorHandle::new(Arc::clone(self.core().channel()))
    }

    /// Go to the back of the run queue.
    pub fn yield_now(&self) {
        self.core().reschedule(self.id, Reason::Yield);
    }

    /// Create a fiber on this reactor. It runs after the caller next gives
    /// up the CPU.
    pub fn spawn<F>(&self, f: F) -> FiberResult<FiberId>
    where
        F: FnOnce(&Fiber) + Send + 'static,
    {
        self.core().spawn(Box::new(f))
    }

    /// Log a line tagged with this fiber's id.
    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        kprint::_klog_tagged_impl(level, &format_args!("fiber {}", self.id), args);
    }

    // ── Submit → reschedule → decode ──

    /// Push one request tagged with this fiber's token and sleep until its
    /// completion arrives. Returns the raw result (`-errno` on failure).
    pub(crate) fn submit_and_await<S>(&self, submit: S) -> FiberResult<i32>
    where
        S: FnOnce(&mut CompletionRing, Option<Token>) -> RingResult<()>,
    {
        let core = self.core();
        submit(core.ring(), Some(Token::fiber(self.id)))?;
        core.reschedule(self.id, Reason::Await);
        match core.take_event(self.id) {
            Some(event) => Ok(event.result),
            None => Err(FiberError::Inconsistent),
        }
    }

    /// `submit_and_await` with negative results mapped to `FiberError::Os`.
    pub(crate) fn await_ok<S>(&self, submit: S) -> FiberResult<i32>
    where
        S: FnOnce(&mut CompletionRing, Option<Token>) -> RingResult<()>,
    {
        let res = self.submit_and_await(submit)?;
        if res < 0 {
            Err(FiberError::Os(-res))
        } else {
            Ok(res)
        }
    }

    // ── Delegated work ──

    /// Run `f` on the worker pool and sleep until it returns.
    ///
    /// A panic in `f` is re-raised in this fiber.
    pub fn compute<R, F>(&self, f: F) -> FiberResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let core = self.core();
        let channel = Arc::clone(core.channel());
        let id = self.id;

        core.pool().submit(Box::new(move || {
            let outcome: Outcome =
                panic::catch_unwind(AssertUnwindSafe(f)).map(|value| Box::new(value) as Box<dyn Any + Send>);
            if let Err(e) = channel.send(Message::Resume { id, outcome }) {
                kerror!("fiber {}: delegated result lost: {}", id, e);
            }
        }))?;

        core.reschedule(id, Reason::Await);
        match core.take_delegated(id) {
            Some(Ok(value)) => value
                .downcast::<R>()
                .map(|value| *value)
                .map_err(|_| FiberError::Inconsistent),
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => Err(FiberError::Inconsistent),
        }
    }

    /// `compute` for jobs without a result.
    pub fn execute<F>(&self, f: F) -> FiberResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.compute(f)
    }

    // ── Timers ──

    /// Sleep for `after`.
    pub fn await_timeout(&self, after: Duration) -> FiberResult<()> {
        let res = self.submit_and_await(|ring, token| ring.relative_timer(token, after, false))?;
        timer_result(res)
    }

    /// Sleep until `deadline`. Returns at once if it already passed.
    pub fn await_deadline(&self, deadline: Instant) -> FiberResult<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let at = sys::monotonic_now() + remaining;
        let res = self.submit_and_await(|ring, token| ring.absolute_timer(token, at, false))?;
        timer_result(res)
    }

    // ── Descriptors ──

    /// `openat(AT_FDCWD, path, flags, mode)`
    pub fn open(&self, path: &str, flags: i32, mode: u32) -> FiberResult<RawFd> {
        let path = CString::new(path).map_err(|_| FiberError::Os(libc::EINVAL))?;
        // path lives on this stack until the completion is decoded
        self.await_ok(|ring, token| unsafe { ring.open(token, path.as_ptr(), flags | libc::O_CLOEXEC, mode, false) })
    }

    pub fn close(&self, fd: RawFd) -> FiberResult<()> {
        self.await_ok(|ring, token| ring.close(token, fd, false))?;
        Ok(())
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` is end of file.
    pub fn read(&self, fd: RawFd, buf: &mut [u8]) -> FiberResult<usize> {
        let len = buf.len().min(MAX_IO_CHUNK) as u32;
        let ptr = buf.as_mut_ptr();
        let n = self.await_ok(|ring, token| unsafe { ring.read(token, fd, ptr, len, false) })?;
        Ok(n as usize)
    }

    pub fn write(&self, fd: RawFd, buf: &[u8]) -> FiberResult<usize> {
        let len = buf.len().min(MAX_IO_CHUNK) as u32;
        let ptr = buf.as_ptr();
        let n = self.await_ok(|ring, token| unsafe { ring.write(token, fd, ptr, len, false) })?;
        Ok(n as usize)
    }

    /// Fill `buf` completely. End of file first is `Os(EPIPE)`.
    pub fn read_exact(&self, fd: RawFd, mut buf: &mut [u8]) -> FiberResult<()> {
        while !buf.is_empty() {
            match self.read(fd, buf)? {
                0 => return Err(FiberError::Os(libc::EPIPE)),
                n => buf = &mut buf[n..],
            }
        }
        Ok(())
    }

    pub fn write_all(&self, fd: RawFd, mut buf: &[u8]) -> FiberResult<()> {
        while !buf.is_empty() {
            match self.write(fd, buf)? {
                0 => return Err(FiberError::Os(libc::EPIPE)),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

/// A timer that fires reports `-ETIME`; that is the success case.
fn timer_result(res: i32) -> FiberResult<()> {
    if res == -libc::ETIME || res >= 0 {
        Ok(())
    } else {
        Err(FiberError::Os(-res))
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber").field("id", &self.id).finish()
    }
}
