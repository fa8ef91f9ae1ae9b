//! Environment variable helpers
//!
//! ```ignore
//! use fiber_core::env::{env_get, env_get_bool};
//!
//! let entries: u32 = env_get("FIBER_RING_ENTRIES", 256);
//! let flush = env_get_bool("FIBER_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Parse `key` as `T`, falling back to `default` when unset or malformed
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Millisecond duration; `0` maps to `None` (wait forever)
pub fn env_get_millis(key: &str, default_ms: u64) -> Option<Duration> {
    match env_get(key, default_ms) {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__FIBER_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        assert!(env_get_bool("__FIBER_TEST_UNSET__", true));
        assert!(env_get_opt::<u32>("__FIBER_TEST_UNSET__").is_none());
    }

    #[test]
    fn test_env_get_parsed() {
        std::env::set_var("__FIBER_TEST_NUM__", " 123 ");
        let val: usize = env_get("__FIBER_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::set_var("__FIBER_TEST_NUM__", "lots");
        let val: usize = env_get("__FIBER_TEST_NUM__", 9);
        assert_eq!(val, 9);
        std::env::remove_var("__FIBER_TEST_NUM__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        for (raw, want) in [("1", true), ("TRUE", true), ("on", true), ("0", false), ("junk", false)] {
            std::env::set_var("__FIBER_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__FIBER_TEST_BOOL__", !want), want, "value {raw}");
        }
        std::env::remove_var("__FIBER_TEST_BOOL__");
    }

    #[test]
    fn test_env_get_millis() {
        assert_eq!(env_get_millis("__FIBER_TEST_MS_UNSET__", 0), None);
        assert_eq!(
            env_get_millis("__FIBER_TEST_MS_UNSET__", 250),
            Some(Duration::from_millis(250))
        );
    }
}
