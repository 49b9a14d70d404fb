//! Linux futex-based worker parking
//!
//! Futex word semantics:
//! - 0 = no wake token
//! - 1 = wake token pending
//!
//! `park_timeout` consumes the token with a swap and only sleeps in
//! FUTEX_WAIT while the word is still 0, so a token deposited between the
//! swap and the syscall makes the wait return EAGAIN.

use super::WorkerParker;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Linux futex-based parker
pub struct FutexParker {
    /// Futex word: 0 = sleep, 1 = wake pending
    futex: AtomicU32,

    /// Set while the worker is inside FUTEX_WAIT
    parked: AtomicBool,
}

impl FutexParker {
    pub fn new() -> Self {
        Self {
            futex: AtomicU32::new(0),
            parked: AtomicBool::new(false),
        }
    }

    #[inline]
    fn take_token(&self) -> bool {
        self.futex.swap(0, Ordering::AcqRel) == 1
    }
}

impl Default for FutexParker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerParker for FutexParker {
    fn park_timeout(&self, timeout: Duration) -> bool {
        if self.take_token() {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        let timespec = libc::timespec {
            tv_sec: timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: timeout.subsec_nanos() as libc::c_long,
        };

        self.parked.store(true, Ordering::SeqCst);

        // FUTEX_WAIT: sleep only if futex == 0. Timeout is relative.
        // ETIMEDOUT, EAGAIN and EINTR all land in the token check below.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                0u32,
                &timespec as *const libc::timespec,
                std::ptr::null::<u32>(),
                0u32,
            );
        }

        self.parked.store(false, Ordering::SeqCst);
        self.take_token()
    }

    fn unpark(&self) {
        // Token already pending: the waiter (if any) was already woken
        if self.futex.swap(1, Ordering::AcqRel) == 1 {
            return;
        }
        if !self.parked.load(Ordering::SeqCst) {
            return;
        }

        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Relaxed)
    }
}
