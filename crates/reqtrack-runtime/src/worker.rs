//! Request worker thread
//!
//! A single background thread that drives threaded requests through
//! start → tick → complete. The owner thread talks to it only through
//! four hand-off queues:
//!
//! ```text
//!   owner ──add_request()──► Pending ──start──► Running ──complete──► Completed ──► owner
//!   owner ──cancel_request()──► Cancelled ──abort──────────────────────┘
//! ```
//!
//! Pending, Cancelled and Completed share one lock that is never held
//! across a request hook. Running is owned by whoever runs a cycle (the
//! worker thread, or the owner through [`HttpWorker::tick`]) and lives
//! behind a separate cycle lock. Lock order is cycle → queues.
//!
//! # Pacing
//!
//! While requests are running the worker cycles at the active frame rate;
//! once Running drains it falls back to the idle frame rate and parks, so
//! new work or shutdown wakes it immediately.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use reqtrack_core::{hdebug, herror, htrace, RequestKey, WorkerError};

use crate::config::WorkerConfig;
use crate::lease::RequestLease;
use crate::parking::{new_parker, WorkerParker};

/// The worker seam the registry talks to
///
/// [`WorkerThread`] is the production implementation. Owner-thread
/// methods must not block on request I/O.
pub trait HttpWorker: Send + Sync {
    /// Spawn the worker thread
    fn start(&self) -> Result<(), WorkerError>;

    /// Signal exit, wake and join the worker thread
    ///
    /// Leases still pending or running stay queued for a manual
    /// [`tick`](HttpWorker::tick).
    fn stop(&self) -> Result<(), WorkerError>;

    /// Queue a request to be started on the next cycle
    ///
    /// Cancellations queued for the same request before this call belong
    /// to an earlier attempt and are dropped.
    fn add_request(&self, lease: RequestLease);

    /// Queue a cancellation for a running request
    fn cancel_request(&self, key: RequestKey);

    /// Move every completed lease into `out`
    fn completed_requests(&self, out: &mut Vec<RequestLease>);

    /// Run one cycle on the calling thread, unless the worker is mid-cycle
    fn tick(&self);

    fn is_running(&self) -> bool;

    fn stats(&self) -> WorkerStats;
}

/// Worker statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Cycles run (thread and manual)
    pub cycles: u64,
    /// Requests whose start succeeded
    pub started: u64,
    /// Requests whose start failed
    pub start_failures: u64,
    /// Running requests aborted by cancellation
    pub cancelled: u64,
    /// Leases handed to Completed
    pub completed: u64,
    /// Largest Running set seen
    pub max_running: usize,
}

impl fmt::Display for WorkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} started={} start_failures={} cancelled={} completed={} max_running={}",
            self.cycles,
            self.started,
            self.start_failures,
            self.cancelled,
            self.completed,
            self.max_running
        )
    }
}

#[derive(Default)]
struct StatCounters {
    cycles: AtomicU64,
    started: AtomicU64,
    start_failures: AtomicU64,
    cancelled: AtomicU64,
    completed: AtomicU64,
    max_running: AtomicUsize,
}

impl StatCounters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            start_failures: self.start_failures.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            max_running: self.max_running.load(Ordering::Relaxed),
        }
    }
}

/// Owner/worker hand-off queues
#[derive(Default)]
struct Queues {
    pending: Vec<RequestLease>,
    cancelled: Vec<RequestKey>,
    completed: Vec<RequestLease>,
}

/// State owned by whoever runs a cycle
#[derive(Default)]
struct CycleState {
    running: Vec<RequestLease>,
    last_cycle: Option<Instant>,
}

struct Shared {
    queues: Mutex<Queues>,
    cycle: Mutex<CycleState>,
    parker: Box<dyn WorkerParker>,
    exit: AtomicBool,
    stats: StatCounters,
}

impl Shared {
    fn queues(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cycle(&self) -> MutexGuard<'_, CycleState> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one cycle. Returns true while requests are still running.
    fn run_cycle(&self, cycle: &mut CycleState) -> bool {
        let now = Instant::now();
        let delta = cycle
            .last_cycle
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        cycle.last_cycle = Some(now);

        let (pending, cancelled) = {
            let mut queues = self.queues();
            (
                mem::take(&mut queues.pending),
                mem::take(&mut queues.cancelled),
            )
        };

        let mut done = Vec::new();

        for lease in pending {
            if lease.request().start_threaded_request() {
                self.stats.started.fetch_add(1, Ordering::Relaxed);
                cycle.running.push(lease);
            } else {
                htrace!("worker: start failed for {}", lease.key());
                self.stats.start_failures.fetch_add(1, Ordering::Relaxed);
                done.push(lease);
            }
        }
        self.stats
            .max_running
            .fetch_max(cycle.running.len(), Ordering::Relaxed);

        for key in cancelled {
            // Keys no longer (or never) running are ignored
            if let Some(pos) = cycle.running.iter().position(|l| l.key() == key) {
                let lease = cycle.running.remove(pos);
                lease.request().abort_threaded_request();
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                done.push(lease);
            }
        }

        for lease in &cycle.running {
            lease.request().tick_threaded_request(delta);
        }
        let (finished, running): (Vec<_>, Vec<_>) = mem::take(&mut cycle.running)
            .into_iter()
            .partition(|l| l.request().is_threaded_request_complete());
        cycle.running = running;
        done.extend(finished);

        if !done.is_empty() {
            self.stats
                .completed
                .fetch_add(done.len() as u64, Ordering::Relaxed);
            self.queues().completed.append(&mut done);
        }
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        !cycle.running.is_empty()
    }
}

/// Production [`HttpWorker`]: one named OS thread
pub struct WorkerThread {
    shared: Arc<Shared>,
    config: WorkerConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(Queues::default()),
                cycle: Mutex::new(CycleState::default()),
                parker: new_parker(),
                exit: AtomicBool::new(false),
                stats: StatCounters::default(),
            }),
            config,
            handle: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Leases waiting in Pending (for diagnostics)
    pub fn pending_count(&self) -> usize {
        self.shared.queues().pending.len()
    }
}

impl Default for WorkerThread {
    fn default() -> Self {
        Self::new(WorkerConfig::default())
    }
}

impl HttpWorker for WorkerThread {
    fn start(&self) -> Result<(), WorkerError> {
        let mut handle = self.handle();
        if handle.is_some() {
            return Err(WorkerError::AlreadyRunning);
        }
        self.shared.exit.store(false, Ordering::Release);

        let mut builder = thread::Builder::new().name(self.config.thread_name.clone());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let spawned = builder
            .spawn(move || worker_loop(shared, config))
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        hdebug!("worker '{}' started", self.config.thread_name);
        *handle = Some(spawned);
        Ok(())
    }

    fn stop(&self) -> Result<(), WorkerError> {
        let Some(handle) = self.handle().take() else {
            return Ok(());
        };

        self.shared.exit.store(true, Ordering::Release);
        self.shared.parker.unpark();

        match handle.join() {
            Ok(()) => {
                hdebug!(
                    "worker '{}' stopped: {}",
                    self.config.thread_name,
                    self.shared.stats.snapshot()
                );
                Ok(())
            }
            Err(_) => {
                herror!("worker '{}' panicked", self.config.thread_name);
                Err(WorkerError::Panicked)
            }
        }
    }

    fn add_request(&self, lease: RequestLease) {
        {
            let mut queues = self.shared.queues();
            let key = lease.key();
            queues.cancelled.retain(|k| *k != key);
            queues.pending.push(lease);
        }
        self.shared.parker.unpark();
    }

    fn cancel_request(&self, key: RequestKey) {
        self.shared.queues().cancelled.push(key);
    }

    fn completed_requests(&self, out: &mut Vec<RequestLease>) {
        let mut queues = self.shared.queues();
        if out.is_empty() {
            mem::swap(out, &mut queues.completed);
        } else {
            out.append(&mut queues.completed);
        }
    }

    fn tick(&self) {
        let mut cycle = match self.shared.cycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        self.shared.run_cycle(&mut cycle);
    }

    fn is_running(&self) -> bool {
        self.handle().is_some()
    }

    fn stats(&self) -> WorkerStats {
        self.shared.stats.snapshot()
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Zero means yield
fn pause(duration: Duration) {
    if duration.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(duration);
    }
}

/// Main worker loop
///
/// The outer loop is the idle regime, the inner loop the active one.
fn worker_loop(shared: Arc<Shared>, config: WorkerConfig) {
    while !shared.exit.load(Ordering::Acquire) {
        let loop_start = Instant::now();

        loop {
            let cycle_start = Instant::now();
            let busy = shared.run_cycle(&mut shared.lock_cycle());
            if !busy || shared.exit.load(Ordering::Acquire) {
                break;
            }
            pause(config.active_sleep(cycle_start.elapsed()));
        }

        if shared.exit.load(Ordering::Acquire) {
            break;
        }

        let sleep = config.idle_sleep(loop_start.elapsed());
        if sleep.is_zero() {
            thread::yield_now();
        } else {
            shared.parker.park_timeout(sleep);
        }
    }
}
