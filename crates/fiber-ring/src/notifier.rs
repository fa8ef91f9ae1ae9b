//! Cross-thread doorbell.
//!
//! A `Notifier` wakes the reactor thread from any other thread. The ring
//! watches the notifier's fd with a one-shot POLLIN request tagged
//! `Token::NOTIFIER`; the reactor drains the fd and re-arms the watch.
//!
//! Multiple `notify()` calls before the reactor drains coalesce into a
//! single wakeup (eventfd counter semantics).

use std::os::unix::io::RawFd;

use crate::error::{RingError, RingResult};
use crate::sys::last_errno;

/// Wakes the reactor thread.
///
/// `notify()` must never block and must be callable from any thread.
pub trait Notifier: Send + Sync {
    /// Ring the doorbell once.
    fn notify(&self) -> RingResult<()>;

    /// Descriptor the ring polls.
    fn fd(&self) -> RawFd;
}

/// `Notifier` over a non-blocking eventfd. Owns the fd.
pub struct EventFdNotifier {
    fd: RawFd,
}

impl EventFdNotifier {
    pub fn create() -> RingResult<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(RingError::Notifier(last_errno()));
        }
        Ok(Self { fd })
    }

    /// Reset the counter and return how many notifications it held.
    /// Returns 0 when nothing was pending.
    pub fn drain(&self) -> RingResult<u64> {
        let mut val: u64 = 0;
        let ret = unsafe {
            libc::read(
                self.fd,
                &mut val as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            let errno = last_errno();
            if errno == libc::EAGAIN {
                return Ok(0);
            }
            return Err(RingError::Notifier(errno));
        }
        Ok(val)
    }
}

impl Notifier for EventFdNotifier {
    fn notify(&self) -> RingResult<()> {
        let val: u64 = 1;
        let ret = unsafe {
            libc::write(
                self.fd,
                &val as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            let errno = last_errno();
            // Counter saturated: a wakeup is already pending
            if errno == libc::EAGAIN {
                return Ok(());
            }
            return Err(RingError::Notifier(errno));
        }
        Ok(())
    }

    fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for EventFdNotifier {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
            self.fd = -1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_coalesces() {
        let n = EventFdNotifier::create().unwrap();
        assert_eq!(n.drain().unwrap(), 0);

        n.notify().unwrap();
        n.notify().unwrap();
        n.notify().unwrap();
        assert_eq!(n.drain().unwrap(), 3);
        assert_eq!(n.drain().unwrap(), 0);
    }

    #[test]
    fn test_notify_from_other_thread() {
        let n = std::sync::Arc::new(EventFdNotifier::create().unwrap());
        let n2 = n.clone();
        std::thread::spawn(move || n2.notify().unwrap()).join().unwrap();
        assert_eq!(n.drain().unwrap(), 1);
    }
}
