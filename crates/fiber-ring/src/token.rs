//! Correlation tokens carried in io_uring `user_data`.

use std::fmt;

use fiber_core::FiberId;

/// 64-bit correlation value attached to every request.
///
/// Values below `u16::MAX` name a fiber. Two values at the top of the range
/// are reserved for the reactor.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Token(pub u64);

/// What a completion's token refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Cross-thread doorbell fired
    Notifier,
    /// Fire-and-forget request; drop the completion
    Ignored,
    /// Wake this fiber
    Fiber(FiberId),
    /// Nothing the reactor ever issued
    Unknown(u64),
}

impl Token {
    /// Completion of the eventfd watch
    pub const NOTIFIER: Token = Token(u64::MAX - 1);

    /// Request whose completion nobody waits for
    pub const IGNORED: Token = Token(u64::MAX);

    #[inline]
    pub const fn fiber(id: FiberId) -> Token {
        Token(id.as_token())
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub fn route(self) -> Route {
        match self {
            Token::NOTIFIER => Route::Notifier,
            Token::IGNORED => Route::Ignored,
            Token(raw) => match FiberId::from_token(raw) {
                Some(id) => Route::Fiber(id),
                None => Route::Unknown(raw),
            },
        }
    }
}

impl From<FiberId> for Token {
    #[inline]
    fn from(id: FiberId) -> Self {
        Token::fiber(id)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.route() {
            Route::Notifier => write!(f, "Token(NOTIFIER)"),
            Route::Ignored => write!(f, "Token(IGNORED)"),
            Route::Fiber(id) => write!(f, "Token(fiber {})", id),
            Route::Unknown(raw) => write!(f, "Token({:#x})", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_routes() {
        assert_eq!(Token::NOTIFIER.route(), Route::Notifier);
        assert_eq!(Token::IGNORED.route(), Route::Ignored);
        assert_eq!(Token::fiber(FiberId::new(9)).route(), Route::Fiber(FiberId::new(9)));
        assert_eq!(Token(70_000).route(), Route::Unknown(70_000));
        assert_eq!(Token(u16::MAX as u64).route(), Route::Unknown(u16::MAX as u64));
    }
}
