//! # reqtrack - request lifecycle manager
//!
//! Tracks every in-flight request, ticks it to completion from an owning
//! thread, and coordinates a background worker thread that performs the
//! blocking request/response work. reqtrack never opens a socket: backends
//! implement [`ThreadedHttpRequest`] and the runtime drives them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use reqtrack::{HttpModule, RegistryConfig, Script, ScriptedRequest};
//! use std::time::Duration;
//!
//! let module = HttpModule::new(RegistryConfig::from_env())?;
//!
//! let req = ScriptedRequest::shared("GET", "http://sim/status", Script::default());
//! req.set_completion_handler(Some(Box::new(|req, response| {
//!     hinfo!("{} finished: {:?}", req.url(), response.map(|r| r.response_code()));
//! })));
//! module.registry().process_threaded_request(req.clone());
//!
//! // Owner loop
//! while module.registry().is_valid_request(RequestKey::of_arc(&req)) {
//!     module.tick(Duration::from_millis(16));
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//!
//! module.shutdown()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Owner thread (tick)                  │
//! │      HttpModule ─► RequestRegistry ─► requests       │
//! └──────────────────────────────────────────────────────┘
//!              │ RequestLease            ▲ RequestLease
//!              ▼                         │
//! ┌──────────────────────────────────────────────────────┐
//! │                    WorkerThread                      │
//! │   Pending ─► Running ─► Completed     (Cancelled)    │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

// Re-export core types
pub use reqtrack_core::{
    codes, BasicResponse, CompletionHandler, HeaderMap, HttpBase, HttpError, HttpRequest,
    HttpResponse, HttpResult, ProgressHandler, RequestKey, RequestState, RequestStatus,
    ThreadedHttpRequest, WorkerError,
};
pub use reqtrack_core::url_parameter;

// Re-export logging macros
pub use reqtrack_core::{herror, hwarn, hinfo, hdebug, htrace, hprintln, impl_http_request};
pub use reqtrack_core::log::{
    init as init_logging, set_flush_enabled, set_log_level, set_sink, set_time_enabled, LogLevel,
    LogSink,
};

// Re-export env utilities
pub use reqtrack_core::{env_get, env_get_bool, env_get_opt, env_get_secs};

// Re-export runtime types
pub use reqtrack_runtime::{
    ConfigError, HttpWorker, RegistryConfig, RequestLease, RequestRegistry, RequestSnapshot,
    Script, ScriptedRequest, WorkerConfig, WorkerStats, WorkerThread,
};

/// Owner handle for the request machinery
///
/// Builds and initializes a [`RequestRegistry`] backed by a worker thread.
/// Dropping a module that was never shut down stops the worker without
/// flushing.
pub struct HttpModule {
    registry: RequestRegistry,
}

impl HttpModule {
    /// Validate `config`, then start a registry with the production worker
    pub fn new(config: RegistryConfig) -> HttpResult<Self> {
        config.validate()?;
        let worker = WorkerThread::new(config.worker.clone());
        Self::with_worker(config, Box::new(worker))
    }

    /// Same as [`new`](Self::new) with a caller-provided worker
    pub fn with_worker(config: RegistryConfig, worker: Box<dyn HttpWorker>) -> HttpResult<Self> {
        reqtrack_core::log::init();
        let registry = RequestRegistry::with_worker(config, worker);
        registry.initialize()?;
        Ok(Self { registry })
    }

    #[inline]
    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// Advance the registry by `delta`. Call once per owner frame.
    #[inline]
    pub fn tick(&self, delta: Duration) -> bool {
        self.registry.tick(delta)
    }

    /// Shutdown flush, then stop the worker
    pub fn shutdown(self) -> HttpResult<()> {
        self.registry.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn test_config() -> RegistryConfig {
        RegistryConfig::new()
            .deferred_destroy_delay(Duration::from_millis(10))
            .idle_frame_time(Duration::from_millis(2))
    }

    #[test]
    fn test_module_round_trip() {
        let module = HttpModule::new(test_config()).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let req = ScriptedRequest::shared(
            "GET",
            "http://sim/module?id=3",
            Script::succeed_after(2).with_response(codes::OK, "done"),
        );
        let counter = done.clone();
        req.set_completion_handler(Some(Box::new(move |req, response| {
            assert_eq!(req.url_parameter("id").as_deref(), Some("3"));
            assert_eq!(response.unwrap().content_as_string(), "done");
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(module.registry().process_threaded_request(req.clone()));

        let key = RequestKey::of_arc(&req);
        let deadline = Instant::now() + Duration::from_secs(5);
        while module.registry().is_valid_request(key) && Instant::now() < deadline {
            module.tick(Duration::from_millis(1));
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(req.status(), RequestStatus::Succeeded);
        assert!(module.registry().is_pending_destroy(key));
        module.shutdown().unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = test_config().thread_name("");
        assert!(matches!(
            HttpModule::new(config),
            Err(HttpError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_drop_without_shutdown() {
        let module = HttpModule::new(test_config()).unwrap();
        let req = ScriptedRequest::shared("GET", "http://sim/dropped", Script::hang());
        assert!(module.registry().process_threaded_request(req.clone()));
        drop(module);

        // Registry and worker released their handles
        let deadline = Instant::now() + Duration::from_secs(1);
        while Arc::strong_count(&req) > 1 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(Arc::strong_count(&req), 1);
        assert_eq!(req.status(), RequestStatus::Processing);
    }
}
