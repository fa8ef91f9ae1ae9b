//! Architecture-specific context switching
//!
//! Each backend exposes the same surface:
//! - `SavedContext`: callee-saved registers plus stack and resume pointers
//! - `init_context`: prepare a fresh context that enters `entry_fn(entry_arg)`
//!   on a new stack
//! - `switch_context`: save the current registers into `old`, load `new`

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use self::x86_64::*;
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use self::aarch64::*;
    } else {
        compile_error!("fiber-runtime supports x86_64 and aarch64 only");
    }
}

/// Signature of a fiber entry point. It must never return.
pub type EntryFn = extern "C" fn(usize) -> !;
