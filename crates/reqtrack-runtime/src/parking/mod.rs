//! Worker thread parking
//!
//! The worker sleeps between cycles in an interruptible park so that new
//! requests and shutdown wake it immediately instead of waiting out the
//! idle frame.
//!
//! Parking uses token semantics: an `unpark()` that arrives while the worker
//! is busy is remembered and makes the next `park_timeout()` return at once.

use std::time::Duration;

/// Platform-specific single-waiter park/unpark
pub trait WorkerParker: Send + Sync {
    /// Park the calling thread until unparked or `timeout` elapses
    ///
    /// Returns `true` if a wake token was consumed, `false` on timeout or
    /// spurious wakeup. Callers re-check their state either way.
    fn park_timeout(&self, timeout: Duration) -> bool;

    /// Deposit a wake token and wake the parked thread, if any
    fn unpark(&self);

    /// True while a thread is inside `park_timeout()` (hint, may be stale)
    fn is_parked(&self) -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexParker as PlatformParker;
    } else {
        mod fallback;
        pub use fallback::CondvarParker as PlatformParker;
    }
}

/// Create a new platform-appropriate parker
pub fn new_parker() -> Box<dyn WorkerParker> {
    Box::new(PlatformParker::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_park_timeout() {
        let parker = new_parker();
        let start = Instant::now();
        let woken = parker.park_timeout(Duration::from_millis(50));
        let elapsed = start.elapsed();

        assert!(!woken);
        assert!(elapsed >= Duration::from_millis(40));
        assert!(!parker.is_parked());
    }

    #[test]
    fn test_unpark_wakes_parked_thread() {
        let parker = Arc::new(PlatformParker::new());
        let parker2 = Arc::clone(&parker);

        let start = Instant::now();
        let handle = thread::spawn(move || parker2.park_timeout(Duration::from_secs(10)));

        thread::sleep(Duration::from_millis(50));
        parker.unpark();

        assert!(handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_token_not_lost() {
        let parker = new_parker();

        // Unpark before anyone parks: the next park returns immediately
        parker.unpark();
        let start = Instant::now();
        assert!(parker.park_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));

        // Token was consumed
        assert!(!parker.park_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_tokens_do_not_accumulate() {
        let parker = new_parker();
        parker.unpark();
        parker.unpark();

        assert!(parker.park_timeout(Duration::from_millis(10)));
        assert!(!parker.park_timeout(Duration::from_millis(10)));
    }
}
