//! Reactor configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! ```rust,ignore
//! use fiber_runtime::config::ReactorConfig;
//!
//! let config = ReactorConfig::from_env()
//!     .pool_workers(4)
//!     .wait_timeout(Some(Duration::from_millis(50)));
//! config.validate()?;
//! ```

pub mod defaults;

use std::time::Duration;

use fiber_core::env::{env_get, env_get_millis};
use fiber_core::kprintln;

/// Reactor configuration with builder setters.
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// io_uring SQ entries
    pub ring_entries: u32,
    /// Usable stack bytes per fiber
    pub stack_size: usize,
    /// Maximum live fibers
    pub max_fibers: usize,
    /// Worker pool threads for `compute`/`execute`
    pub pool_workers: usize,
    /// Worker pool queue depth
    pub pool_queue: usize,
    /// Bound on each scheduler wait; `None` blocks until a completion
    pub wait_timeout: Option<Duration>,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ReactorConfig {
    /// Defaults with environment overrides.
    ///
    /// - `FIBER_RING_ENTRIES`
    /// - `FIBER_STACK_SIZE`
    /// - `FIBER_MAX_FIBERS`
    /// - `FIBER_POOL_WORKERS`
    /// - `FIBER_POOL_QUEUE`
    /// - `FIBER_WAIT_TIMEOUT_MS` (0 = indefinite)
    pub fn from_env() -> Self {
        Self {
            ring_entries: env_get("FIBER_RING_ENTRIES", defaults::RING_ENTRIES),
            stack_size: env_get("FIBER_STACK_SIZE", defaults::STACK_SIZE),
            max_fibers: env_get("FIBER_MAX_FIBERS", defaults::MAX_FIBERS),
            pool_workers: env_get("FIBER_POOL_WORKERS", defaults::POOL_WORKERS),
            pool_queue: env_get("FIBER_POOL_QUEUE", defaults::POOL_QUEUE),
            wait_timeout: env_get_millis("FIBER_WAIT_TIMEOUT_MS", defaults::WAIT_TIMEOUT_MS),
        }
    }

    /// Library defaults only, ignoring the environment.
    pub fn new() -> Self {
        Self {
            ring_entries: defaults::RING_ENTRIES,
            stack_size: defaults::STACK_SIZE,
            max_fibers: defaults::MAX_FIBERS,
            pool_workers: defaults::POOL_WORKERS,
            pool_queue: defaults::POOL_QUEUE,
            wait_timeout: None,
        }
    }

    pub fn ring_entries(mut self, n: u32) -> Self {
        self.ring_entries = n;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn max_fibers(mut self, n: usize) -> Self {
        self.max_fibers = n;
        self
    }

    pub fn pool_workers(mut self, n: usize) -> Self {
        self.pool_workers = n;
        self
    }

    pub fn pool_queue(mut self, depth: usize) -> Self {
        self.pool_queue = depth;
        self
    }

    pub fn wait_timeout(mut self, d: Option<Duration>) -> Self {
        self.wait_timeout = d;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_entries == 0 || self.ring_entries > 32_768 {
            return Err(ConfigError::InvalidValue("ring_entries must be in 1..=32768"));
        }
        if self.stack_size < defaults::MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 64KB"));
        }
        if self.max_fibers == 0 || self.max_fibers > defaults::MAX_FIBERS {
            return Err(ConfigError::InvalidValue("max_fibers must be in 1..=65535"));
        }
        if self.pool_workers == 0 {
            return Err(ConfigError::InvalidValue("pool_workers must be > 0"));
        }
        if self.pool_queue == 0 {
            return Err(ConfigError::InvalidValue("pool_queue must be > 0"));
        }
        Ok(())
    }

    pub fn print(&self) {
        kprintln!("Reactor Configuration:");
        kprintln!("  ring_entries:  {}", self.ring_entries);
        kprintln!("  stack_size:    {}", self.stack_size);
        kprintln!("  max_fibers:    {}", self.max_fibers);
        kprintln!("  pool_workers:  {}", self.pool_workers);
        kprintln!("  pool_queue:    {}", self.pool_queue);
        kprintln!("  wait_timeout:  {:?}", self.wait_timeout);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
