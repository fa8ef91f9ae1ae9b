//! Fiber-facing error type.

use std::fmt;
use std::io;

use fiber_core::BlockError;
use fiber_ring::RingError;

use crate::config::ConfigError;

pub type FiberResult<T> = Result<T, FiberError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiberError {
    /// Control-block table or run queue failure
    Block(BlockError),
    /// Ring setup/submit/wait failure
    Ring(RingError),
    /// Operation completed with `-errno`
    Os(i32),
    /// Host or address text could not be parsed
    MalformedAddress,
    /// Name lookup produced no IPv4 endpoint
    Unresolvable,
    /// Scheduler handed back something the fiber did not ask for
    Inconsistent,
    /// Worker pool is shut down or its queue is full
    PoolUnavailable,
    /// Stack mapping failed (errno)
    Stack(i32),
    /// `start()` while the reactor is already running
    AlreadyRunning,
    InvalidConfig(ConfigError),
}

impl FiberError {
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Os(e) | Self::Stack(e) => Some(*e),
            Self::Ring(r) => r.errno(),
            _ => None,
        }
    }
}

impl fmt::Display for FiberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(e) => write!(f, "{}", e),
            Self::Ring(e) => write!(f, "{}", e),
            Self::Os(e) => write!(f, "{}", io::Error::from_raw_os_error(*e)),
            Self::MalformedAddress => write!(f, "malformed address"),
            Self::Unresolvable => write!(f, "no IPv4 endpoint for host"),
            Self::Inconsistent => write!(f, "scheduler delivered an unexpected completion"),
            Self::PoolUnavailable => write!(f, "worker pool unavailable"),
            Self::Stack(e) => write!(f, "fiber stack mmap: errno {}", e),
            Self::AlreadyRunning => write!(f, "reactor already running"),
            Self::InvalidConfig(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FiberError {}

impl From<BlockError> for FiberError {
    fn from(e: BlockError) -> Self {
        Self::Block(e)
    }
}

impl From<RingError> for FiberError {
    fn from(e: RingError) -> Self {
        Self::Ring(e)
    }
}

impl From<ConfigError> for FiberError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

impl From<FiberError> for io::Error {
    fn from(e: FiberError) -> Self {
        match e {
            FiberError::Os(errno) => io::Error::from_raw_os_error(errno),
            FiberError::MalformedAddress => io::Error::new(io::ErrorKind::InvalidInput, e),
            FiberError::Unresolvable => io::Error::new(io::ErrorKind::NotFound, e),
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: io::Error = FiberError::Os(libc::ECONNREFUSED).into();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);

        let err: io::Error = FiberError::MalformedAddress.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_errno() {
        assert_eq!(FiberError::Os(libc::EBADF).errno(), Some(libc::EBADF));
        assert_eq!(FiberError::Ring(RingError::Submit(libc::EBUSY)).errno(), Some(libc::EBUSY));
        assert_eq!(FiberError::Unresolvable.errno(), None);
        assert_eq!(FiberError::from(BlockError::Exhausted), FiberError::Block(BlockError::Exhausted));
    }
}
