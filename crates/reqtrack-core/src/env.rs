//! Environment variable utilities
//!
//! Parsing helpers used by `RegistryConfig::from_env()`.
//!
//! ```ignore
//! use reqtrack_core::env::{env_get, env_get_secs};
//!
//! let stack: usize = env_get("REQTRACK_WORKER_STACK_SIZE", 0);
//! let delay = env_get_secs("REQTRACK_DEFERRED_DESTROY_SECS", Duration::from_secs(10));
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Everything else returns false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as fractional seconds, or return default
///
/// Negative, non-finite, or unparsable values fall back to the default.
pub fn env_get_secs(key: &str, default: Duration) -> Duration {
    env_get_opt::<f64>(key)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}
