//! Fallback parking using std::sync::Condvar
//!
//! Used on platforms without futex support.

use super::WorkerParker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Condvar-based parker
pub struct CondvarParker {
    /// Wake token
    token: Mutex<bool>,
    condvar: Condvar,
    parked: AtomicBool,
}

impl CondvarParker {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(false),
            condvar: Condvar::new(),
            parked: AtomicBool::new(false),
        }
    }
}

impl Default for CondvarParker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerParker for CondvarParker {
    fn park_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);

        if !*guard && !timeout.is_zero() {
            self.parked.store(true, Ordering::SeqCst);
            let (g, _) = self
                .condvar
                .wait_timeout_while(guard, timeout, |token| !*token)
                .unwrap_or_else(PoisonError::into_inner);
            guard = g;
            self.parked.store(false, Ordering::SeqCst);
        }

        std::mem::replace(&mut *guard, false)
    }

    fn unpark(&self) {
        {
            let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = true;
        }
        self.condvar.notify_one();
    }

    fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condvar_token() {
        let parker = CondvarParker::new();
        assert!(!parker.park_timeout(Duration::ZERO));
        parker.unpark();
        assert!(parker.park_timeout(Duration::ZERO));
        assert!(!parker.park_timeout(Duration::from_millis(5)));
    }
}
