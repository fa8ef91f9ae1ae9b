//! Ring error types.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// io_uring_setup failed.
    Setup(i32),
    /// Submission queue still full after a flush.
    RingExhausted,
    /// io_uring_enter (submit) failed.
    Submit(i32),
    /// io_uring_enter (wait) failed.
    Wait(i32),
    /// eventfd create/read/write failed.
    Notifier(i32),
    /// Other OS error with errno.
    Os(i32),
}

impl RingError {
    /// errno carried by the error, if any
    pub fn errno(&self) -> Option<i32> {
        match *self {
            Self::RingExhausted => None,
            Self::Setup(e) | Self::Submit(e) | Self::Wait(e) | Self::Notifier(e) | Self::Os(e) => Some(e),
        }
    }

    pub(crate) fn from_io(err: std::io::Error, wrap: fn(i32) -> RingError) -> RingError {
        wrap(err.raw_os_error().unwrap_or(-1))
    }
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "io_uring setup: errno {}", e),
            Self::RingExhausted => write!(f, "submission queue full"),
            Self::Submit(e) => write!(f, "io_uring submit: errno {}", e),
            Self::Wait(e) => write!(f, "io_uring wait: errno {}", e),
            Self::Notifier(e) => write!(f, "eventfd: errno {}", e),
            Self::Os(e) => write!(f, "OS error: errno {}", e),
        }
    }
}

impl std::error::Error for RingError {}

pub type RingResult<T> = std::result::Result<T, RingError>;
