//! Registry and worker configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults (`config::defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use reqtrack_runtime::config::RegistryConfig;
//!
//! let config = RegistryConfig::from_env()
//!     .deferred_destroy_delay(Duration::from_secs(2))
//!     .idle_frame_time(Duration::from_millis(50));
//! ```

pub mod defaults;

use std::time::Duration;

use reqtrack_core::env::{env_get, env_get_secs};
use reqtrack_core::hprintln;

/// Worker thread pacing and spawn options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Frame time while requests are running. Zero disables the frame budget.
    pub active_frame_time: Duration,
    /// Minimum sleep between active cycles
    pub active_min_sleep: Duration,
    /// Frame time while idle. Zero disables the frame budget.
    pub idle_frame_time: Duration,
    /// Minimum sleep between idle cycles
    pub idle_min_sleep: Duration,
    /// Name given to the worker thread
    pub thread_name: String,
    /// Worker stack size (None = platform default)
    pub stack_size: Option<usize>,
}

impl WorkerConfig {
    /// Library defaults, no environment overrides
    pub fn new() -> Self {
        Self {
            active_frame_time: defaults::ACTIVE_FRAME_TIME,
            active_min_sleep: defaults::ACTIVE_MIN_SLEEP,
            idle_frame_time: defaults::IDLE_FRAME_TIME,
            idle_min_sleep: defaults::IDLE_MIN_SLEEP,
            thread_name: defaults::WORKER_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }

    /// Sleep after an active cycle that took `cycle_time`
    #[inline]
    pub fn active_sleep(&self, cycle_time: Duration) -> Duration {
        self.active_frame_time
            .saturating_sub(cycle_time)
            .max(self.active_min_sleep)
    }

    /// Sleep after an idle pass that took `loop_time`
    #[inline]
    pub fn idle_sleep(&self, loop_time: Duration) -> Duration {
        self.idle_frame_time
            .saturating_sub(loop_time)
            .max(self.idle_min_sleep)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Request registry configuration with builder pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How long a removed request stays alive before its handle is released
    pub deferred_destroy_delay: Duration,
    /// Sleep between iterations of a blocking flush
    pub flush_sleep: Duration,
    /// Worker thread options
    pub worker: WorkerConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RegistryConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional, seconds may be fractional):
    /// - `REQTRACK_DEFERRED_DESTROY_SECS` - Deferred destroy grace period
    /// - `REQTRACK_ACTIVE_FRAME_SECS` - Worker frame time while active
    /// - `REQTRACK_ACTIVE_MIN_SLEEP_SECS` - Worker minimum sleep while active
    /// - `REQTRACK_IDLE_FRAME_SECS` - Worker frame time while idle
    /// - `REQTRACK_IDLE_MIN_SLEEP_SECS` - Worker minimum sleep while idle
    /// - `REQTRACK_FLUSH_SLEEP_SECS` - Sleep between flush iterations
    /// - `REQTRACK_WORKER_STACK_SIZE` - Worker stack bytes (0 = default)
    pub fn from_env() -> Self {
        let base = Self::new();
        let stack_size: usize = env_get("REQTRACK_WORKER_STACK_SIZE", defaults::WORKER_STACK_SIZE);

        Self {
            deferred_destroy_delay: env_get_secs(
                "REQTRACK_DEFERRED_DESTROY_SECS",
                base.deferred_destroy_delay,
            ),
            flush_sleep: env_get_secs("REQTRACK_FLUSH_SLEEP_SECS", base.flush_sleep),
            worker: WorkerConfig {
                active_frame_time: env_get_secs(
                    "REQTRACK_ACTIVE_FRAME_SECS",
                    base.worker.active_frame_time,
                ),
                active_min_sleep: env_get_secs(
                    "REQTRACK_ACTIVE_MIN_SLEEP_SECS",
                    base.worker.active_min_sleep,
                ),
                idle_frame_time: env_get_secs(
                    "REQTRACK_IDLE_FRAME_SECS",
                    base.worker.idle_frame_time,
                ),
                idle_min_sleep: env_get_secs(
                    "REQTRACK_IDLE_MIN_SLEEP_SECS",
                    base.worker.idle_min_sleep,
                ),
                thread_name: base.worker.thread_name,
                stack_size: (stack_size != 0).then_some(stack_size),
            },
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            deferred_destroy_delay: defaults::DEFERRED_DESTROY_DELAY,
            flush_sleep: defaults::FLUSH_SLEEP,
            worker: WorkerConfig::new(),
        }
    }

    // Builder methods

    pub fn deferred_destroy_delay(mut self, d: Duration) -> Self {
        self.deferred_destroy_delay = d;
        self
    }

    pub fn flush_sleep(mut self, d: Duration) -> Self {
        self.flush_sleep = d;
        self
    }

    pub fn active_frame_time(mut self, d: Duration) -> Self {
        self.worker.active_frame_time = d;
        self
    }

    pub fn active_min_sleep(mut self, d: Duration) -> Self {
        self.worker.active_min_sleep = d;
        self
    }

    pub fn idle_frame_time(mut self, d: Duration) -> Self {
        self.worker.idle_frame_time = d;
        self
    }

    pub fn idle_min_sleep(mut self, d: Duration) -> Self {
        self.worker.idle_min_sleep = d;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, size: Option<usize>) -> Self {
        self.worker.stack_size = size;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_sleep > defaults::MAX_FLUSH_SLEEP {
            return Err(ConfigError::InvalidValue("flush_sleep must be <= 1s"));
        }
        if self.worker.thread_name.is_empty() {
            return Err(ConfigError::InvalidValue("thread_name must not be empty"));
        }
        if self.worker.thread_name.contains('\0') {
            return Err(ConfigError::InvalidValue("thread_name must not contain NUL"));
        }
        if let Some(size) = self.worker.stack_size {
            if size < defaults::MIN_WORKER_STACK_SIZE {
                return Err(ConfigError::InvalidValue("stack_size must be >= 64KB"));
            }
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        hprintln!("reqtrack configuration:");
        hprintln!("  deferred_destroy_delay: {:?}", self.deferred_destroy_delay);
        hprintln!("  flush_sleep:            {:?}", self.flush_sleep);
        hprintln!("  active_frame_time:      {:?}", self.worker.active_frame_time);
        hprintln!("  active_min_sleep:       {:?}", self.worker.active_min_sleep);
        hprintln!("  idle_frame_time:        {:?}", self.worker.idle_frame_time);
        hprintln!("  idle_min_sleep:         {:?}", self.worker.idle_min_sleep);
        hprintln!("  thread_name:            {}", self.worker.thread_name);
        hprintln!("  stack_size:             {:?}", self.worker.stack_size);
    }
}

/// Configuration error
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

impl From<ConfigError> for reqtrack_core::HttpError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => reqtrack_core::HttpError::InvalidConfig(msg),
        }
    }
}
