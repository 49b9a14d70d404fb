//! Simulated threaded backend
//!
//! [`ScriptedRequest`] performs no I/O. Its outcome is fixed up front by a
//! [`Script`]: how many worker ticks until completion, whether the start
//! fails, the final status, response code and body, and how many bytes of
//! progress each tick reports. Every worker/owner hook bumps a counter so
//! tests and the demo can observe exactly what the runtime did.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqtrack_core::codes;
use reqtrack_core::{
    impl_http_request, BasicResponse, HttpBase, HttpRequest, HttpResponse, RequestState, RequestStatus,
    ThreadedHttpRequest,
};

/// Scripted outcome of a [`ScriptedRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Worker ticks until the request reports complete
    pub ticks_to_complete: u32,
    /// Fail `start_threaded_request()`
    pub fail_start: bool,
    /// Terminal status reported by `finish_request()`
    pub status: RequestStatus,
    /// Response code of the generated response
    pub response_code: i32,
    /// Response payload
    pub body: Vec<u8>,
    /// Bytes received per worker tick, reported as progress
    pub bytes_per_tick: u64,
}

impl Script {
    /// Succeed with `200 OK` after `ticks` worker ticks
    pub fn succeed_after(ticks: u32) -> Self {
        Self {
            ticks_to_complete: ticks,
            fail_start: false,
            status: RequestStatus::Succeeded,
            response_code: codes::OK,
            body: Vec::new(),
            bytes_per_tick: 0,
        }
    }

    /// Fail immediately in `start_threaded_request()`
    pub fn fail_start() -> Self {
        Self {
            fail_start: true,
            ..Self::succeed_after(0)
        }
    }

    /// Never complete on its own
    pub fn hang() -> Self {
        Self::succeed_after(u32::MAX)
    }

    pub fn with_response(mut self, code: i32, body: impl Into<Vec<u8>>) -> Self {
        self.response_code = code;
        self.body = body.into();
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_progress(mut self, bytes_per_tick: u64) -> Self {
        self.bytes_per_tick = bytes_per_tick;
        self
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::succeed_after(1)
    }
}

/// Hook invocation counters
#[derive(Debug, Default)]
struct Hooks {
    starts: AtomicUsize,
    worker_ticks: AtomicUsize,
    aborts: AtomicUsize,
    finishes: AtomicUsize,
}

/// Simulated [`ThreadedHttpRequest`]
pub struct ScriptedRequest {
    state: RequestState,
    script: Mutex<Script>,

    // Per-attempt worker state
    ticks_done: AtomicU32,
    done: AtomicBool,
    start_failed: AtomicBool,
    aborted: AtomicBool,

    hooks: Hooks,
}

impl_http_request!(ScriptedRequest, state);

impl ScriptedRequest {
    /// `GET url` with the default script (succeed after one worker tick)
    pub fn new(url: &str) -> Self {
        Self::with_script("GET", url, Script::default())
    }

    pub fn with_script(verb: &str, url: &str, script: Script) -> Self {
        Self {
            state: RequestState::with_target(verb, url),
            script: Mutex::new(script),
            ticks_done: AtomicU32::new(0),
            done: AtomicBool::new(false),
            start_failed: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            hooks: Hooks::default(),
        }
    }

    /// Shared handle, ready to hand to the registry
    pub fn shared(verb: &str, url: &str, script: Script) -> Arc<Self> {
        Arc::new(Self::with_script(verb, url, script))
    }

    /// Replace the script used by the next attempt
    pub fn set_script(&self, script: Script) {
        *self.script() = script;
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start_count(&self) -> usize {
        self.hooks.starts.load(Ordering::SeqCst)
    }

    pub fn worker_tick_count(&self) -> usize {
        self.hooks.worker_ticks.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> usize {
        self.hooks.aborts.load(Ordering::SeqCst)
    }

    pub fn finish_count(&self) -> usize {
        self.hooks.finishes.load(Ordering::SeqCst)
    }

    /// Outcome of the current attempt
    fn outcome(&self) -> (RequestStatus, Option<Arc<dyn HttpResponse>>) {
        if self.start_failed.load(Ordering::SeqCst) {
            return (RequestStatus::FailedConnectionError, None);
        }
        if !self.done.load(Ordering::SeqCst)
            && (self.aborted.load(Ordering::SeqCst) || self.state.is_cancelled())
        {
            return (RequestStatus::Failed, None);
        }

        let script = self.script().clone();
        if script.status == RequestStatus::FailedConnectionError {
            return (script.status, None);
        }
        let response = BasicResponse::new(script.response_code, self.url())
            .with_header("Content-Length", &script.body.len().to_string())
            .with_content(script.body);
        (script.status, Some(Arc::new(response)))
    }
}

impl ThreadedHttpRequest for ScriptedRequest {
    fn start_threaded_request(&self) -> bool {
        self.hooks.starts.fetch_add(1, Ordering::SeqCst);
        self.ticks_done.store(0, Ordering::SeqCst);
        self.done.store(false, Ordering::SeqCst);
        self.aborted.store(false, Ordering::SeqCst);

        let failed = self.script().fail_start;
        self.start_failed.store(failed, Ordering::SeqCst);
        !failed
    }

    fn is_threaded_request_complete(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn tick_threaded_request(&self, _delta: Duration) {
        self.hooks.worker_ticks.fetch_add(1, Ordering::SeqCst);
        if self.done.load(Ordering::SeqCst) {
            return;
        }

        let ticks = self.ticks_done.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let (target, per_tick, total) = {
            let script = self.script();
            (script.ticks_to_complete, script.bytes_per_tick, script.body.len() as u64)
        };

        if per_tick > 0 {
            let received = per_tick.saturating_mul(u64::from(ticks));
            let received = if total > 0 { received.min(total) } else { received };
            self.state.set_progress(self.content_length() as u64, received);
        }
        if ticks >= target {
            self.done.store(true, Ordering::SeqCst);
        }
    }

    fn abort_threaded_request(&self) {
        self.hooks.aborts.fetch_add(1, Ordering::SeqCst);
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn finish_request(&self) {
        self.hooks.finishes.fetch_add(1, Ordering::SeqCst);
        let (status, response) = self.outcome();
        self.state.finish(self, status, response);
    }
}

impl std::fmt::Debug for ScriptedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRequest")
            .field("state", &self.state)
            .field("script", &*self.script())
            .field("ticks_done", &self.ticks_done.load(Ordering::Relaxed))
            .finish()
    }
}
