//! Request registry
//!
//! Authoritative list of active requests. Ticked from the owner thread, it
//! advances every tracked request, hands threaded requests to the worker,
//! reclaims the ones the worker reports complete, and keeps every removed
//! request alive for a grace period before its handle is released.
//!
//! ```text
//!   add ──► Active ──remove / worker completion──► PendingDestroy(time_left) ──► released
//! ```
//!
//! The registry lock is never held while a request is ticked or finished:
//! both run on a snapshot taken under the lock.

use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use reqtrack_core::{
    hdebug, herror, hinfo, htrace, hwarn, HttpBase, HttpError, HttpRequest, HttpResult,
    RequestKey, RequestStatus, ThreadedHttpRequest,
};

use crate::config::RegistryConfig;
use crate::lease::RequestLease;
use crate::worker::{HttpWorker, WorkerStats, WorkerThread};

/// Registry record for an active request
struct TrackedRequest {
    request: Arc<dyn HttpRequest>,
    key: RequestKey,
    threaded: bool,
}

/// A removed request waiting out its grace period
struct DeferredDestroyEntry {
    time_left: Duration,
    request: Arc<dyn HttpRequest>,
}

#[derive(Default)]
struct RegistryState {
    active: Vec<TrackedRequest>,
    pending_destroy: Vec<DeferredDestroyEntry>,
    /// Requests whose lease is with the worker, tracked or not
    leased: HashSet<RequestKey>,
}

impl RegistryState {
    fn is_active(&self, key: RequestKey) -> bool {
        self.active.iter().any(|t| t.key == key)
    }

    fn is_active_threaded(&self, key: RequestKey) -> bool {
        self.active.iter().any(|t| t.key == key && t.threaded)
    }

    /// Drop every active entry for `key`, returning the first handle
    fn take_active(&mut self, key: RequestKey) -> Option<Arc<dyn HttpRequest>> {
        let mut taken: Option<Arc<dyn HttpRequest>> = None;
        self.active.retain(|t| {
            if t.key != key {
                return true;
            }
            if taken.is_none() {
                taken = Some(Arc::clone(&t.request));
            }
            false
        });
        taken
    }

    /// Stop a pending destruction when the request comes back
    fn revive(&mut self, key: RequestKey) -> bool {
        let before = self.pending_destroy.len();
        self.pending_destroy
            .retain(|e| RequestKey::of_arc(&e.request) != key);
        before != self.pending_destroy.len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn HttpRequest>> {
        self.active.iter().map(|t| Arc::clone(&t.request)).collect()
    }
}

/// Point-in-time view of an active request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub key: RequestKey,
    pub verb: String,
    pub url: String,
    pub status: RequestStatus,
    pub threaded: bool,
    pub elapsed: Duration,
}

impl RequestSnapshot {
    fn of(request: &dyn HttpRequest, key: RequestKey, threaded: bool) -> Self {
        Self {
            key,
            verb: request.verb(),
            url: request.url(),
            status: request.status(),
            threaded,
            elapsed: request.elapsed_time(),
        }
    }
}

impl fmt::Display for RequestSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "verb={} url={} status={}", self.verb, self.url, self.status)
    }
}

/// Tracks every in-flight request on behalf of the owner thread
///
/// # Example
///
/// ```ignore
/// let registry = RequestRegistry::new(RegistryConfig::from_env());
/// registry.initialize()?;
///
/// let req = ScriptedRequest::shared("GET", "http://sim/a", Script::default());
/// registry.process_threaded_request(req.clone());
///
/// // every frame
/// registry.tick(frame_delta);
/// ```
pub struct RequestRegistry {
    config: RegistryConfig,
    worker: Box<dyn HttpWorker>,
    state: Mutex<RegistryState>,
    initialized: AtomicBool,
    shut_down: AtomicBool,
}

impl RequestRegistry {
    /// Registry backed by a [`WorkerThread`]
    pub fn new(config: RegistryConfig) -> Self {
        let worker = WorkerThread::new(config.worker.clone());
        Self::with_worker(config, Box::new(worker))
    }

    /// Registry backed by a caller-provided worker
    pub fn with_worker(config: RegistryConfig, worker: Box<dyn HttpWorker>) -> Self {
        Self {
            config,
            worker,
            state: Mutex::new(RegistryState::default()),
            initialized: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start the worker. Must be called exactly once.
    pub fn initialize(&self) -> HttpResult<()> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(HttpError::AlreadyInitialized);
        }
        if let Err(e) = self.worker.start() {
            self.initialized.store(false, Ordering::Release);
            herror!("registry: worker failed to start: {}", e);
            return Err(e.into());
        }
        hdebug!("registry initialized");
        Ok(())
    }

    #[inline]
    fn accepting_threaded(&self) -> bool {
        self.initialized.load(Ordering::Acquire) && !self.shut_down.load(Ordering::Acquire)
    }

    fn track(&self, request: Arc<dyn HttpRequest>, threaded: bool) {
        let key = RequestKey::of_arc(&request);
        let mut state = self.state();
        if state.revive(key) {
            htrace!("registry: {} re-added while pending destroy", key);
        }
        state.active.push(TrackedRequest {
            request,
            key,
            threaded,
        });
    }

    /// Track a request. Duplicates are accepted.
    pub fn add_request(&self, request: Arc<dyn HttpRequest>) {
        self.track(request, false);
    }

    /// Track a threaded request and queue it on the worker
    ///
    /// Returns false, without tracking, before `initialize()`, after
    /// `shutdown()`, or while the worker still holds this request.
    pub fn add_threaded_request(&self, request: Arc<dyn ThreadedHttpRequest>) -> bool {
        if !self.accepting_threaded() {
            hwarn!("registry: threaded request {} added while not initialized", request.url());
            return false;
        }

        let key = RequestKey::of_arc(&request);
        if !self.state().leased.insert(key) {
            hwarn!("registry: {} is already with the worker", key);
            return false;
        }

        let shared: Arc<dyn HttpRequest> = request.clone();
        self.track(shared, true);
        self.worker.add_request(RequestLease::new(request));
        true
    }

    /// `process_request()` then `add_threaded_request()`
    pub fn process_threaded_request(&self, request: Arc<dyn ThreadedHttpRequest>) -> bool {
        if !self.accepting_threaded() {
            hwarn!("registry: threaded request {} processed while not initialized", request.url());
            return false;
        }
        request.process_request() && self.add_threaded_request(request)
    }

    /// Stop tracking a request and start its grace period
    ///
    /// Neither cancels nor notifies. Returns false if it was not active.
    pub fn remove_request<R: HttpRequest + ?Sized>(&self, request: &R) -> bool {
        let key = RequestKey::of(request);
        let delay = self.config.deferred_destroy_delay;

        let mut state = self.state();
        let Some(handle) = state.take_active(key) else {
            return false;
        };
        if state.leased.contains(&key) {
            hwarn!("registry: {} removed while the worker still holds it", key);
        }
        state.pending_destroy.push(DeferredDestroyEntry {
            time_left: delay,
            request: handle,
        });
        true
    }

    /// Ask the worker to abort a running threaded request
    ///
    /// The request stays tracked until the worker hands it back. Returns
    /// false if the worker does not hold it.
    pub fn cancel_threaded_request<R: HttpRequest + ?Sized>(&self, request: &R) -> bool {
        let key = RequestKey::of(request);
        if !self.state().leased.contains(&key) {
            return false;
        }
        self.worker.cancel_request(key);
        true
    }

    /// Is the request in the active list
    pub fn is_valid_request(&self, key: RequestKey) -> bool {
        self.state().is_active(key)
    }

    pub fn is_pending_destroy(&self, key: RequestKey) -> bool {
        self.state()
            .pending_destroy
            .iter()
            .any(|e| RequestKey::of_arc(&e.request) == key)
    }

    pub fn active_count(&self) -> usize {
        self.state().active.len()
    }

    pub fn pending_destroy_count(&self) -> usize {
        self.state().pending_destroy.len()
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    /// Advance the registry by `delta`
    ///
    /// Ticks every active request, ages pending destructions, then
    /// finalizes the requests the worker reported complete.
    pub fn tick(&self, delta: Duration) -> bool {
        let snapshot = self.state().snapshot();
        for request in snapshot {
            request.tick(delta);
        }

        let released: Vec<DeferredDestroyEntry> = {
            let mut state = self.state();
            let (expired, alive): (Vec<_>, Vec<_>) = mem::take(&mut state.pending_destroy)
                .into_iter()
                .map(|mut entry| {
                    entry.time_left = entry.time_left.saturating_sub(delta);
                    entry
                })
                .partition(|entry| entry.time_left.is_zero());
            state.pending_destroy = alive;
            expired
        };
        // Handles drop outside the lock
        drop(released);

        let mut completed = Vec::new();
        self.worker.completed_requests(&mut completed);
        if completed.is_empty() {
            return true;
        }

        let finished: Vec<Arc<dyn ThreadedHttpRequest>> = {
            let mut state = self.state();
            let mut finished = Vec::with_capacity(completed.len());
            for lease in completed {
                let key = lease.key();
                state.leased.remove(&key);
                // A request removed and re-added as plain is not finalized
                let handle = if state.is_active_threaded(key) {
                    state.take_active(key)
                } else {
                    None
                };
                let Some(handle) = handle else {
                    htrace!("registry: completed {} is no longer active", key);
                    continue;
                };
                state.pending_destroy.push(DeferredDestroyEntry {
                    time_left: self.config.deferred_destroy_delay,
                    request: handle,
                });
                finished.push(lease.into_inner());
            }
            finished
        };

        for request in finished {
            request.finish_request();
        }
        true
    }

    /// Tick until the active list is empty
    ///
    /// On shutdown, both handler slots of every active request are cleared
    /// first so no handler fires during teardown. The worker is pumped
    /// manually between ticks. Blocks forever if a request never completes.
    pub fn flush(&self, shutdown: bool) {
        if shutdown {
            let snapshot = self.snapshots();
            if !snapshot.is_empty() {
                hinfo!("registry: flushing {} requests on shutdown", snapshot.len());
            }
            for (request, info) in snapshot {
                request.clear_handlers();
                hinfo!("  {}", info);
            }
        }

        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            self.tick(now.saturating_duration_since(last));
            last = now;

            if self.active_count() == 0 {
                break;
            }
            self.worker.tick();

            if self.config.flush_sleep.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(self.config.flush_sleep);
            }
        }
    }

    fn snapshots(&self) -> Vec<(Arc<dyn HttpRequest>, RequestSnapshot)> {
        let state = self.state();
        state
            .active
            .iter()
            .map(|t| {
                let info = RequestSnapshot::of(&*t.request, t.key, t.threaded);
                (Arc::clone(&t.request), info)
            })
            .collect()
    }

    /// Snapshot of the active list, also written to the log
    pub fn dump_requests(&self) -> Vec<RequestSnapshot> {
        let snapshot: Vec<RequestSnapshot> =
            self.snapshots().into_iter().map(|(_, info)| info).collect();

        hinfo!("registry: {} active requests", snapshot.len());
        for info in &snapshot {
            hinfo!("  {}", info);
        }
        snapshot
    }

    /// Shutdown flush, then stop the worker
    ///
    /// Later calls are no-ops.
    pub fn shutdown(&self) -> HttpResult<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(HttpError::NotInitialized);
        }
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.flush(true);
        self.worker.stop()?;
        hdebug!("registry shut down: {}", self.worker.stats());
        Ok(())
    }
}

impl Drop for RequestRegistry {
    fn drop(&mut self) {
        if self.shut_down.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.worker.stop() {
            herror!("registry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Script, ScriptedRequest};
    use reqtrack_core::log::{self, LogLevel, LogSink};
    use reqtrack_core::WorkerError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::OnceLock;

    /// Worker double: never spawns, cycles only when pumped
    struct ManualWorker {
        inner: WorkerThread,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        fail_start: bool,
    }

    impl ManualWorker {
        fn new() -> Self {
            Self {
                inner: WorkerThread::default(),
                starts: Arc::new(AtomicUsize::new(0)),
                stops: Arc::new(AtomicUsize::new(0)),
                fail_start: false,
            }
        }
    }

    impl HttpWorker for ManualWorker {
        fn start(&self) -> Result<(), WorkerError> {
            if self.fail_start {
                return Err(WorkerError::SpawnFailed("no threads here".into()));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<(), WorkerError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn add_request(&self, lease: RequestLease) {
            self.inner.add_request(lease);
        }

        fn cancel_request(&self, key: RequestKey) {
            self.inner.cancel_request(key);
        }

        fn completed_requests(&self, out: &mut Vec<RequestLease>) {
            self.inner.completed_requests(out);
        }

        fn tick(&self) {
            self.inner.tick();
        }

        fn is_running(&self) -> bool {
            self.starts.load(Ordering::SeqCst) > self.stops.load(Ordering::SeqCst)
        }

        fn stats(&self) -> WorkerStats {
            self.inner.stats()
        }
    }

    fn config() -> RegistryConfig {
        RegistryConfig::new()
            .deferred_destroy_delay(Duration::from_secs(1))
            .flush_sleep(Duration::ZERO)
    }

    fn manual_registry() -> RequestRegistry {
        let registry = RequestRegistry::with_worker(config(), Box::new(ManualWorker::new()));
        registry.initialize().unwrap();
        registry
    }

    fn scripted(url: &str, script: Script) -> Arc<ScriptedRequest> {
        ScriptedRequest::shared("GET", url, script)
    }

    /// Captures log lines for every test in this binary
    struct CaptureSink(Mutex<Vec<String>>);

    impl LogSink for CaptureSink {
        fn write_line(&self, _level: LogLevel, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn capture() -> &'static Arc<CaptureSink> {
        static SINK: OnceLock<Arc<CaptureSink>> = OnceLock::new();
        SINK.get_or_init(|| {
            let sink = Arc::new(CaptureSink(Mutex::new(Vec::new())));
            log::set_log_level(LogLevel::Info);
            log::set_sink(sink.clone());
            sink
        })
    }

    fn captured_containing(needle: &str) -> Vec<String> {
        capture()
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .cloned()
            .collect()
    }

    #[test]
    fn test_unprocessed_requests_stay_active() {
        let registry = manual_registry();
        let reqs: Vec<_> = (0..3)
            .map(|i| scripted(&format!("http://sim/idle-{}", i), Script::default()))
            .collect();
        for req in &reqs {
            registry.add_request(req.clone());
        }

        assert!(registry.tick(Duration::from_millis(16)));

        assert_eq!(registry.active_count(), 3);
        assert_eq!(registry.pending_destroy_count(), 0);
        for req in &reqs {
            assert!(registry.is_valid_request(RequestKey::of_arc(req)));
            assert_eq!(req.status(), RequestStatus::NotStarted);
        }
    }

    #[test]
    fn test_threaded_completion_finishes_once() {
        let registry = manual_registry();
        let req = scripted("http://sim/once", Script::succeed_after(1));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        req.set_completion_handler(Some(Box::new(move |_, response| {
            assert!(response.is_some());
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(registry.process_threaded_request(req.clone()));
        registry.worker.tick();
        registry.tick(Duration::from_millis(16));

        let key = RequestKey::of_arc(&req);
        assert!(!registry.is_valid_request(key));
        assert!(registry.is_pending_destroy(key));
        assert_eq!(req.finish_count(), 1);
        assert_eq!(req.status(), RequestStatus::Succeeded);

        for _ in 0..5 {
            registry.worker.tick();
            registry.tick(Duration::from_millis(16));
        }
        assert_eq!(req.finish_count(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deferred_destroy_timing() {
        let registry = manual_registry();
        let req = scripted("http://sim/grace", Script::default());
        registry.add_request(req.clone());
        assert!(registry.remove_request(&*req));
        assert_eq!(Arc::strong_count(&req), 2);

        registry.tick(Duration::from_millis(500));
        assert!(registry.is_pending_destroy(RequestKey::of_arc(&req)));
        assert_eq!(Arc::strong_count(&req), 2);

        registry.tick(Duration::from_millis(500));
        assert_eq!(registry.pending_destroy_count(), 0);
        assert_eq!(Arc::strong_count(&req), 1);
    }

    #[test]
    fn test_remove_is_single_owner() {
        let registry = manual_registry();
        let req = scripted("http://sim/owner", Script::default());
        let key = RequestKey::of_arc(&req);

        registry.add_request(req.clone());
        registry.add_request(req.clone());
        assert_eq!(registry.active_count(), 2);

        assert!(registry.remove_request(&*req));
        assert!(!registry.remove_request(&*req));
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.pending_destroy_count(), 1);

        // Re-adding pulls it out of the deferred list
        registry.add_request(req.clone());
        assert!(registry.is_valid_request(key));
        assert!(!registry.is_pending_destroy(key));
    }

    #[test]
    fn test_cancel_running_request() {
        let registry = manual_registry();
        let req = scripted("http://sim/cancel", Script::hang());
        assert!(registry.process_threaded_request(req.clone()));
        registry.worker.tick();

        req.cancel_request();
        assert!(registry.cancel_threaded_request(&*req));
        registry.worker.tick();
        registry.tick(Duration::ZERO);

        assert_eq!(req.abort_count(), 1);
        assert_eq!(req.worker_tick_count(), 1);
        assert_eq!(req.finish_count(), 1);
        assert_eq!(req.status(), RequestStatus::Failed);
        assert!(!registry.cancel_threaded_request(&*req));
    }

    #[test]
    fn test_threaded_before_initialize() {
        let registry = RequestRegistry::with_worker(config(), Box::new(ManualWorker::new()));
        let req = scripted("http://sim/early", Script::default());
        assert_eq!(registry.shutdown(), Err(HttpError::NotInitialized));

        assert!(!registry.add_threaded_request(req.clone()));
        assert!(!registry.process_threaded_request(req.clone()));
        assert_eq!(registry.active_count(), 0);
        assert_eq!(req.status(), RequestStatus::NotStarted);
    }

    #[test]
    fn test_initialize_once() {
        let registry = manual_registry();
        assert_eq!(registry.initialize(), Err(HttpError::AlreadyInitialized));

        let failing = ManualWorker {
            fail_start: true,
            ..ManualWorker::new()
        };
        let registry = RequestRegistry::with_worker(config(), Box::new(failing));
        assert!(matches!(
            registry.initialize(),
            Err(HttpError::Worker(WorkerError::SpawnFailed(_)))
        ));
    }

    #[test]
    fn test_leased_request_not_resubmitted() {
        let registry = manual_registry();
        let req = scripted("http://sim/twice", Script::hang());

        assert!(registry.process_threaded_request(req.clone()));
        assert!(!registry.add_threaded_request(req.clone()));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_remove_while_leased() {
        let registry = manual_registry();
        let req = scripted("http://sim/leased", Script::succeed_after(1));
        assert!(registry.process_threaded_request(req.clone()));
        assert!(registry.remove_request(&*req));

        // Lease comes back for a request that is no longer active
        registry.worker.tick();
        registry.tick(Duration::ZERO);

        assert_eq!(req.finish_count(), 0);
        assert_eq!(registry.pending_destroy_count(), 1);
    }

    #[test]
    fn test_resubmit_while_worker_holds_removed_request() {
        let registry = manual_registry();
        let req = scripted("http://sim/held", Script::hang());
        assert!(registry.process_threaded_request(req.clone()));
        registry.worker.tick();
        assert!(registry.remove_request(&*req));

        // The worker still holds the first lease
        assert!(!registry.add_threaded_request(req.clone()));
        registry.worker.tick();
        assert_eq!(req.start_count(), 1);
        assert_eq!(registry.worker_stats().max_running, 1);

        // Once the lease is back the request may be submitted again
        assert!(registry.cancel_threaded_request(&*req));
        registry.worker.tick();
        registry.tick(Duration::ZERO);
        assert_eq!(req.finish_count(), 0);
        assert!(!registry.cancel_threaded_request(&*req));

        assert!(registry.add_threaded_request(req.clone()));
        assert!(!registry.is_pending_destroy(RequestKey::of_arc(&req)));
        registry.worker.tick();
        assert_eq!(req.start_count(), 2);
    }

    #[test]
    fn test_returned_lease_skips_plain_entry() {
        let registry = manual_registry();
        let req = scripted("http://sim/replain", Script::succeed_after(1));
        assert!(registry.process_threaded_request(req.clone()));
        assert!(registry.remove_request(&*req));
        registry.add_request(req.clone());

        registry.worker.tick();
        registry.tick(Duration::ZERO);

        assert_eq!(req.finish_count(), 0);
        assert!(registry.is_valid_request(RequestKey::of_arc(&req)));
    }

    #[test]
    fn test_progress_reported_before_finish_in_one_tick() {
        let registry = manual_registry();
        let req = scripted("http://sim/order", Script::succeed_after(1).with_progress(8));
        let events = Arc::new(Mutex::new(Vec::new()));

        let progress = events.clone();
        req.set_progress_handler(Some(Box::new(move |_, _, received| {
            progress.lock().unwrap().push(format!("progress {}", received));
        })));
        let complete = events.clone();
        req.set_completion_handler(Some(Box::new(move |_, _| {
            complete.lock().unwrap().push("complete".to_string());
        })));

        assert!(registry.process_threaded_request(req.clone()));
        registry.worker.tick();
        assert!(events.lock().unwrap().is_empty());

        registry.tick(Duration::from_millis(16));

        assert_eq!(*events.lock().unwrap(), vec!["progress 8", "complete"]);
        assert_eq!(req.status(), RequestStatus::Succeeded);
    }

    #[test]
    fn test_dump_requests() {
        capture();
        let registry = manual_registry();
        let req = scripted("http://sim/dump-me", Script::default());
        registry.add_request(req.clone());

        let dump = registry.dump_requests();
        assert_eq!(dump.len(), 1);
        assert_eq!(dump[0].to_string(), "verb=GET url=http://sim/dump-me status=NotStarted");
        assert!(!dump[0].threaded);
        assert_eq!(captured_containing("url=http://sim/dump-me").len(), 1);
    }

    #[test]
    fn test_shutdown_flush_clears_handlers() {
        capture();
        let registry = manual_registry();
        let fired = Arc::new(AtomicUsize::new(0));

        let reqs: Vec<_> = ["http://sim/shutdown-a", "http://sim/shutdown-b"]
            .iter()
            .map(|url| {
                let req = scripted(url, Script::succeed_after(3));
                let counter = fired.clone();
                req.set_completion_handler(Some(Box::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })));
                req.set_progress_handler(Some(Box::new(|_, _, _| {})));
                assert!(registry.process_threaded_request(req.clone()));
                req
            })
            .collect();

        registry.shutdown().unwrap();

        for req in &reqs {
            assert!(!req.has_completion_handler());
            assert!(!req.has_progress_handler());
            assert_eq!(req.finish_count(), 1);
            let line = format!("verb=GET url={} status=Processing", req.url());
            assert_eq!(captured_containing(&line).len(), 1);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(registry.active_count(), 0);

        // Closed for new threaded work
        let late = scripted("http://sim/late", Script::default());
        assert!(!registry.process_threaded_request(late));
    }

    #[test]
    fn test_flush_with_running_worker() {
        let registry = RequestRegistry::new(config().idle_frame_time(Duration::from_millis(2)));
        registry.initialize().unwrap();

        let reqs: Vec<_> = (1..=4)
            .map(|n| scripted(&format!("http://sim/flush-{}", n), Script::succeed_after(n)))
            .collect();
        for req in &reqs {
            assert!(registry.process_threaded_request(req.clone()));
        }

        registry.flush(false);

        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.pending_destroy_count(), 4);
        for req in &reqs {
            assert_eq!(req.finish_count(), 1);
            assert_eq!(req.status(), RequestStatus::Succeeded);
        }
        registry.shutdown().unwrap();
        assert_eq!(registry.worker_stats().completed, 4);
    }

    #[test]
    fn test_drop_stops_worker() {
        let worker = ManualWorker::new();
        let stops = worker.stops.clone();
        {
            let registry = RequestRegistry::with_worker(config(), Box::new(worker));
            registry.initialize().unwrap();
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
