//! Library defaults for [`RegistryConfig`](super::RegistryConfig)
//!
//! Zero durations mean "no artificial pacing".

use std::time::Duration;

/// Grace period a removed request stays alive before release
pub const DEFERRED_DESTROY_DELAY: Duration = Duration::from_secs(10);

/// Target worker frame time while requests are running (200 Hz)
pub const ACTIVE_FRAME_TIME: Duration = Duration::from_millis(5);

/// Minimum worker sleep between active cycles
pub const ACTIVE_MIN_SLEEP: Duration = Duration::ZERO;

/// Target worker frame time while idle (30 Hz)
pub const IDLE_FRAME_TIME: Duration = Duration::from_nanos(33_333_333);

/// Minimum worker sleep between idle cycles
pub const IDLE_MIN_SLEEP: Duration = Duration::ZERO;

/// Sleep between iterations of a blocking flush
pub const FLUSH_SLEEP: Duration = Duration::from_millis(1);

/// Upper bound accepted for the flush sleep
pub const MAX_FLUSH_SLEEP: Duration = Duration::from_secs(1);

/// Worker thread name
pub const WORKER_THREAD_NAME: &str = "reqtrack-worker";

/// Worker stack size in bytes, 0 = platform default
pub const WORKER_STACK_SIZE: usize = 0;

/// Smallest non-default worker stack accepted by validation
pub const MIN_WORKER_STACK_SIZE: usize = 64 * 1024;
