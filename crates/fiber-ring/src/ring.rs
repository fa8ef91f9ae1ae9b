//! `CompletionRing`: the reactor's io_uring instance.
//!
//! One ring per reactor, touched only by the reactor thread. Requests are
//! built with typed builders that stamp the correlation token into
//! `user_data`; completions come back through `await_event()`.
//!
//! Every builder takes:
//! - `token`: `Some(t)` to receive a completion tagged `t`, `None` for a
//!   fire-and-forget request (completion tagged `Token::IGNORED`).
//! - `delay`: queue the SQE without calling `io_uring_enter`. The next
//!   non-delayed request, `submit()` or `await_event()` flushes it.
//!
//! `socket`, `bind`, `listen` and `set_socket_option` never block, so they
//! run inline and their completion is pushed onto a local list that
//! `await_event()` drains first. Callers see the same submit/await/decode
//! contract on every kernel.
//!
//! Builders taking raw pointers are `unsafe`: the memory must stay valid
//! and unmoved until the matching completion is returned.

use std::collections::VecDeque;
use std::net::SocketAddrV4;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use io_uring::{opcode, squeue, types};

use crate::error::{RingError, RingResult};
use crate::event::UringEvent;
use crate::sys;
use crate::token::Token;

/// Ring sizing.
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Number of SQ entries. Rounded up to a power of two by the kernel.
    pub entries: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { entries: 256 }
    }
}

pub struct CompletionRing {
    ring: io_uring::IoUring,
    /// SQEs pushed but not yet passed to io_uring_enter
    pending: u32,
    /// Submitted requests with no completion reaped yet
    inflight: usize,
    /// Completions of inline operations
    synthetic: VecDeque<UringEvent>,
    /// Timeout operands; the kernel reads them at submission
    timespecs: Vec<Box<types::Timespec>>,
    ext_arg: bool,
}

#[inline]
fn user_data(token: Option<Token>) -> u64 {
    token.unwrap_or(Token::IGNORED).as_u64()
}

#[inline]
fn timespec(d: Duration) -> types::Timespec {
    types::Timespec::new().sec(d.as_secs()).nsec(d.subsec_nanos())
}

impl CompletionRing {
    pub fn new(config: RingConfig) -> RingResult<Self> {
        let ring = io_uring::IoUring::builder()
            .build(config.entries)
            .map_err(|e| RingError::from_io(e, RingError::Setup))?;
        let ext_arg = ring.params().is_feature_ext_arg();

        Ok(Self {
            ring,
            pending: 0,
            inflight: 0,
            synthetic: VecDeque::new(),
            timespecs: Vec::new(),
            ext_arg,
        })
    }

    /// Ring descriptor
    pub fn fd(&self) -> RawFd {
        self.ring.as_raw_fd()
    }

    /// SQ capacity
    pub fn capacity(&self) -> usize {
        self.ring.params().sq_entries() as usize
    }

    /// Requests submitted to the kernel and not yet completed
    pub fn inflight(&self) -> usize {
        self.inflight
    }

    /// Requests queued with `delay` and not yet submitted
    pub fn pending(&self) -> usize {
        self.pending as usize
    }

    // ── Submission plumbing ──

    fn push(&mut self, entry: squeue::Entry, delay: bool) -> RingResult<()> {
        if self.ring.submission().is_full() {
            self.submit()?;
        }
        // Safety: operands were validated by the calling builder
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| RingError::RingExhausted)?;
        }
        self.pending += 1;
        if !delay {
            self.submit()?;
        }
        Ok(())
    }

    fn after_enter(&mut self, submitted: usize) {
        self.inflight += submitted;
        self.pending = self.ring.submission().len() as u32;
        if self.pending == 0 {
            self.timespecs.clear();
        }
    }

    /// Flush delayed requests to the kernel. Returns the number submitted.
    pub fn submit(&mut self) -> RingResult<usize> {
        if self.pending == 0 {
            return Ok(0);
        }
        let submitted = self
            .ring
            .submit()
            .map_err(|e| RingError::from_io(e, RingError::Submit))?;
        self.after_enter(submitted);
        Ok(submitted)
    }

    fn synthesize(&mut self, token: Option<Token>, result: i32) {
        if let Some(token) = token {
            self.synthetic.push_back(UringEvent::new(token, result));
        }
    }

    // ── File and stream I/O ──

    /// Read into `buf[..len]` at the current position.
    ///
    /// # Safety
    /// `buf` must stay valid for writes of `len` bytes until completion.
    pub unsafe fn read(&mut self, token: Option<Token>, fd: RawFd, buf: *mut u8, len: u32, delay: bool) -> RingResult<()> {
        let sqe = opcode::Read::new(types::Fd(fd), buf, len)
            .offset(u64::MAX)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// Write `buf[..len]` at the current position.
    ///
    /// # Safety
    /// `buf` must stay valid for reads of `len` bytes until completion.
    pub unsafe fn write(&mut self, token: Option<Token>, fd: RawFd, buf: *const u8, len: u32, delay: bool) -> RingResult<()> {
        let sqe = opcode::Write::new(types::Fd(fd), buf, len)
            .offset(u64::MAX)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// # Safety
    /// `buf` must stay valid for reads of `len` bytes until completion.
    pub unsafe fn send(&mut self, token: Option<Token>, fd: RawFd, buf: *const u8, len: u32, flags: i32, delay: bool) -> RingResult<()> {
        let sqe = opcode::Send::new(types::Fd(fd), buf, len)
            .flags(flags)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// # Safety
    /// `buf` must stay valid for writes of `len` bytes until completion.
    pub unsafe fn recv(&mut self, token: Option<Token>, fd: RawFd, buf: *mut u8, len: u32, flags: i32, delay: bool) -> RingResult<()> {
        let sqe = opcode::Recv::new(types::Fd(fd), buf, len)
            .flags(flags)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// `openat(AT_FDCWD, path, flags, mode)`
    ///
    /// # Safety
    /// `path` must be NUL-terminated and stay valid until completion.
    pub unsafe fn open(&mut self, token: Option<Token>, path: *const libc::c_char, flags: i32, mode: u32, delay: bool) -> RingResult<()> {
        let sqe = opcode::OpenAt::new(types::Fd(libc::AT_FDCWD), path)
            .flags(flags)
            .mode(mode)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    pub fn close(&mut self, token: Option<Token>, fd: RawFd, delay: bool) -> RingResult<()> {
        let sqe = opcode::Close::new(types::Fd(fd))
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    // ── Sockets ──

    /// # Safety
    /// `addr` must stay valid until completion.
    pub unsafe fn connect(&mut self, token: Option<Token>, fd: RawFd, addr: *const libc::sockaddr, len: libc::socklen_t, delay: bool) -> RingResult<()> {
        let sqe = opcode::Connect::new(types::Fd(fd), addr, len)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// # Safety
    /// `addr` and `len` must stay valid for writes until completion;
    /// `*len` holds the capacity of `addr` on entry.
    pub unsafe fn accept(&mut self, token: Option<Token>, fd: RawFd, addr: *mut libc::sockaddr, len: *mut libc::socklen_t, delay: bool) -> RingResult<()> {
        let sqe = opcode::Accept::new(types::Fd(fd), addr, len)
            .flags(libc::SOCK_CLOEXEC)
            .build()
            .user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// Inline `socket(2)`; result is the new fd or `-errno`.
    pub fn socket(&mut self, token: Option<Token>, domain: i32, ty: i32, protocol: i32) -> RingResult<()> {
        let res = sys::socket(domain, ty | libc::SOCK_CLOEXEC, protocol);
        self.synthesize(token, res);
        Ok(())
    }

    /// Inline `bind(2)` to an IPv4 address.
    pub fn bind(&mut self, token: Option<Token>, fd: RawFd, addr: &SocketAddrV4) -> RingResult<()> {
        let res = sys::bind_v4(fd, addr);
        self.synthesize(token, res);
        Ok(())
    }

    /// Inline `listen(2)`.
    pub fn listen(&mut self, token: Option<Token>, fd: RawFd, backlog: i32) -> RingResult<()> {
        let res = sys::listen(fd, backlog);
        self.synthesize(token, res);
        Ok(())
    }

    /// Inline `setsockopt(2)` with a raw option value.
    pub fn set_socket_option(&mut self, token: Option<Token>, fd: RawFd, level: i32, name: i32, value: &[u8]) -> RingResult<()> {
        let res = sys::setsockopt(fd, level, name, value);
        self.synthesize(token, res);
        Ok(())
    }

    // ── Timers ──

    /// Completes with `-ETIME` after `after` has elapsed.
    pub fn relative_timer(&mut self, token: Option<Token>, after: Duration, delay: bool) -> RingResult<()> {
        self.timer(token, after, types::TimeoutFlags::empty(), delay)
    }

    /// Completes with `-ETIME` once CLOCK_MONOTONIC reaches `deadline`.
    pub fn absolute_timer(&mut self, token: Option<Token>, deadline: Duration, delay: bool) -> RingResult<()> {
        self.timer(token, deadline, types::TimeoutFlags::ABS, delay)
    }

    fn timer(&mut self, token: Option<Token>, when: Duration, flags: types::TimeoutFlags, delay: bool) -> RingResult<()> {
        let ts = Box::new(timespec(when));
        let sqe = opcode::Timeout::new(&*ts as *const types::Timespec)
            .flags(flags)
            .build()
            .user_data(user_data(token));
        self.timespecs.push(ts);
        self.push(sqe, delay)
    }

    pub fn nop(&mut self, token: Option<Token>, delay: bool) -> RingResult<()> {
        let sqe = opcode::Nop::new().build().user_data(user_data(token));
        self.push(sqe, delay)
    }

    /// Arm a one-shot POLLIN watch on `fd`, tagged `Token::NOTIFIER`.
    /// Must be re-armed after each firing.
    pub fn register_event_notifier(&mut self, fd: RawFd) -> RingResult<()> {
        let sqe = opcode::PollAdd::new(types::Fd(fd), libc::POLLIN as u32)
            .build()
            .user_data(Token::NOTIFIER.as_u64());
        self.push(sqe, false)
    }

    // ── Completion ──

    fn pop_completion(&mut self) -> Option<UringEvent> {
        let event = self.ring.completion().next().map(|cqe| UringEvent::from(&cqe));
        if event.is_some() {
            self.inflight = self.inflight.saturating_sub(1);
        }
        event
    }

    /// Next completion, waiting at most `timeout`.
    ///
    /// `None` waits indefinitely; `Some(Duration::ZERO)` only polls.
    /// Returns `Ok(None)` when nothing completed in time or the wait was
    /// interrupted.
    pub fn await_event(&mut self, timeout: Option<Duration>) -> RingResult<Option<UringEvent>> {
        if let Some(event) = self.synthetic.pop_front() {
            return Ok(Some(event));
        }
        self.submit()?;
        if let Some(event) = self.pop_completion() {
            return Ok(Some(event));
        }

        let waited = match timeout {
            Some(t) if t.is_zero() => return Ok(None),
            Some(t) if self.ext_arg => {
                let ts = timespec(t);
                let args = types::SubmitArgs::new().timespec(&ts);
                self.ring.submitter().submit_with_args(1, &args)
            }
            Some(t) => {
                // Pre-5.11 kernels: bound the wait with an ignored timeout
                self.relative_timer(None, t, true)?;
                self.ring.submit_and_wait(1)
            }
            None => self.ring.submit_and_wait(1),
        };

        match waited {
            Ok(submitted) => self.after_enter(submitted),
            Err(e) => match e.raw_os_error() {
                Some(libc::ETIME) | Some(libc::EINTR) => return Ok(self.pop_completion()),
                _ => return Err(RingError::from_io(e, RingError::Wait)),
            },
        }
        Ok(self.pop_completion())
    }
}
