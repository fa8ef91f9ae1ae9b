//! # fiber-ring
//!
//! The reactor's io_uring plumbing.
//!
//! - `ring` - `CompletionRing`: typed request builders and `await_event`
//! - `token` - correlation tokens and their routing
//! - `event` - `UringEvent`, a completion copied out of the CQ
//! - `notifier` - `Notifier` trait and the eventfd doorbell
//! - `sys` - libc helpers (errno, `sockaddr_in`, inline socket calls)
//! - `error` - `RingError`

pub mod error;
pub mod event;
pub mod notifier;
pub mod ring;
pub mod sys;
pub mod token;

pub use error::{RingError, RingResult};
pub use event::UringEvent;
pub use notifier::{EventFdNotifier, Notifier};
pub use ring::{CompletionRing, RingConfig};
pub use token::{Route, Token};
