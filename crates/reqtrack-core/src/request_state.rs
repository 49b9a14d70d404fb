//! Shared request bookkeeping for backends
//!
//! `RequestState` holds everything the request contract exposes except the
//! backend's own I/O: verb, URL, headers, payload, status, response,
//! timers, cancellation intent, and the two handler slots. A backend embeds
//! one and lets [`impl_http_request!`](crate::impl_http_request) generate
//! the `HttpBase`/`HttpRequest` impls.
//!
//! Handlers are always invoked with the internal lock released, so a
//! handler may call back into the request (read its status, re-arm it,
//! replace its own handler).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::headers::{url_parameter, HeaderMap};
use crate::request::{CompletionHandler, HttpRequest, HttpResponse, ProgressHandler};
use crate::status::RequestStatus;

/// Verb assumed when none was set
pub const DEFAULT_VERB: &str = "GET";

struct Fields {
    verb: Option<String>,
    url: String,
    headers: HeaderMap,
    content: Vec<u8>,
    status: RequestStatus,
    response: Option<Arc<dyn HttpResponse>>,
    elapsed: Duration,
    completion: Option<CompletionHandler>,
    completion_generation: u64,
    progress: Option<ProgressHandler>,
    progress_generation: u64,
    reported_progress: (u64, u64),
}

impl Default for Fields {
    fn default() -> Self {
        Self {
            verb: None,
            url: String::new(),
            headers: HeaderMap::new(),
            content: Vec::new(),
            status: RequestStatus::NotStarted,
            response: None,
            elapsed: Duration::ZERO,
            completion: None,
            completion_generation: 0,
            progress: None,
            progress_generation: 0,
            reported_progress: (0, 0),
        }
    }
}

/// Reusable request lifecycle state
#[derive(Default)]
pub struct RequestState {
    fields: Mutex<Fields>,
    cancelled: AtomicBool,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a verb + URL pair
    pub fn with_target(verb: &str, url: &str) -> Self {
        let state = Self::new();
        state.set_verb(verb);
        state.set_url(url);
        state
    }

    fn lock(&self) -> MutexGuard<'_, Fields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Target and payload
    // ========================================================================

    pub fn verb(&self) -> String {
        self.lock()
            .verb
            .clone()
            .unwrap_or_else(|| DEFAULT_VERB.to_string())
    }

    pub fn set_verb(&self, verb: &str) {
        self.lock().verb = Some(verb.to_uppercase());
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    pub fn set_url(&self, url: &str) {
        self.lock().url = url.to_string();
    }

    pub fn url_parameter(&self, name: &str) -> Option<String> {
        url_parameter(&self.lock().url, name)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.lock().headers.get(name).map(str::to_string)
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.lock().headers.set(name, value);
    }

    pub fn append_to_header(&self, name: &str, value: &str) {
        self.lock().headers.append(name, value);
    }

    pub fn all_headers(&self) -> Vec<String> {
        self.lock().headers.lines()
    }

    /// Snapshot of the header map, for backends building the wire request
    pub fn headers(&self) -> HeaderMap {
        self.lock().headers.clone()
    }

    pub fn content(&self) -> Vec<u8> {
        self.lock().content.clone()
    }

    pub fn content_length(&self) -> usize {
        self.lock().content.len()
    }

    pub fn set_content(&self, content: Vec<u8>) {
        self.lock().content = content;
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn status(&self) -> RequestStatus {
        self.lock().status
    }

    pub fn response(&self) -> Option<Arc<dyn HttpResponse>> {
        self.lock().response.clone()
    }

    pub fn elapsed_time(&self) -> Duration {
        self.lock().elapsed
    }

    /// Start a new processing attempt
    ///
    /// Fails if already processing or the URL is empty. Otherwise resets
    /// the response, timers, progress counters, and cancel flag.
    pub fn begin(&self) -> bool {
        let mut fields = self.lock();
        if fields.status == RequestStatus::Processing || fields.url.is_empty() {
            return false;
        }
        fields.status = RequestStatus::Processing;
        fields.response = None;
        fields.elapsed = Duration::ZERO;
        fields.reported_progress = (0, 0);
        drop(fields);

        self.cancelled.store(false, Ordering::Release);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        true
    }

    /// Return a finished request to `NotStarted`
    ///
    /// Refused while processing.
    pub fn reset(&self) -> bool {
        let mut fields = self.lock();
        if !fields.status.can_transition_to(RequestStatus::NotStarted) {
            return false;
        }
        fields.status = RequestStatus::NotStarted;
        fields.response = None;
        fields.elapsed = Duration::ZERO;
        true
    }

    /// Record cancellation intent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Publish transfer progress. Safe from the worker thread.
    pub fn set_progress(&self, bytes_sent: u64, bytes_received: u64) {
        self.bytes_sent.store(bytes_sent, Ordering::Relaxed);
        self.bytes_received.store(bytes_received, Ordering::Relaxed);
    }

    /// Bytes sent and received so far in this attempt
    pub fn progress(&self) -> (u64, u64) {
        (
            self.bytes_sent.load(Ordering::Relaxed),
            self.bytes_received.load(Ordering::Relaxed),
        )
    }

    /// Owner-thread tick: accumulate elapsed time and report progress
    ///
    /// The progress handler fires only when the counters changed since the
    /// last report.
    pub fn tick(&self, request: &dyn HttpRequest, delta: Duration) {
        let current = self.progress();
        let (handler, generation) = {
            let mut fields = self.lock();
            if fields.status != RequestStatus::Processing {
                return;
            }
            fields.elapsed += delta;
            if fields.reported_progress == current {
                return;
            }
            fields.reported_progress = current;
            match fields.progress.take() {
                Some(handler) => (handler, fields.progress_generation),
                None => return,
            }
        };

        let mut handler = handler;
        handler(request, current.0, current.1);

        let mut fields = self.lock();
        if fields.progress.is_none() && fields.progress_generation == generation {
            fields.progress = Some(handler);
        }
    }

    /// Move a processing request to its terminal `status` and run the
    /// completion handler
    ///
    /// Returns false, without touching the handler, if the request is not
    /// processing or `status` is not terminal.
    pub fn finish(
        &self,
        request: &dyn HttpRequest,
        status: RequestStatus,
        response: Option<Arc<dyn HttpResponse>>,
    ) -> bool {
        let (handler, generation, response) = {
            let mut fields = self.lock();
            if fields.status != RequestStatus::Processing || !status.is_terminal() {
                return false;
            }
            fields.status = status;
            fields.response = response;
            (
                fields.completion.take(),
                fields.completion_generation,
                fields.response.clone(),
            )
        };

        if let Some(mut handler) = handler {
            handler(request, response);

            let mut fields = self.lock();
            if fields.completion.is_none() && fields.completion_generation == generation {
                fields.completion = Some(handler);
            }
        }
        true
    }

    // ========================================================================
    // Handler slots
    // ========================================================================

    pub fn set_completion_handler(&self, handler: Option<CompletionHandler>) {
        let mut fields = self.lock();
        fields.completion = handler;
        fields.completion_generation += 1;
    }

    pub fn set_progress_handler(&self, handler: Option<ProgressHandler>) {
        let mut fields = self.lock();
        fields.progress = handler;
        fields.progress_generation += 1;
    }

    pub fn has_completion_handler(&self) -> bool {
        self.lock().completion.is_some()
    }

    pub fn has_progress_handler(&self) -> bool {
        self.lock().progress.is_some()
    }
}

impl std::fmt::Debug for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self.lock();
        f.debug_struct("RequestState")
            .field("verb", &fields.verb)
            .field("url", &fields.url)
            .field("status", &fields.status)
            .field("elapsed", &fields.elapsed)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Implement `HttpBase` and `HttpRequest` for a backend type by delegating
/// to one of its [`RequestState`] fields
///
/// ```ignore
/// struct MyRequest { state: RequestState, /* backend fields */ }
/// reqtrack_core::impl_http_request!(MyRequest, state);
/// ```
#[macro_export]
macro_rules! impl_http_request {
    ($ty:ty, $field:ident) => {
        impl $crate::HttpBase for $ty {
            fn url(&self) -> String {
                self.$field.url()
            }

            fn url_parameter(&self, name: &str) -> Option<String> {
                self.$field.url_parameter(name)
            }

            fn header(&self, name: &str) -> Option<String> {
                self.$field.header(name)
            }

            fn all_headers(&self) -> Vec<String> {
                self.$field.all_headers()
            }

            fn content_length(&self) -> usize {
                self.$field.content_length()
            }

            fn content(&self) -> Vec<u8> {
                self.$field.content()
            }
        }

        impl $crate::HttpRequest for $ty {
            fn verb(&self) -> String {
                self.$field.verb()
            }

            fn set_verb(&self, verb: &str) {
                self.$field.set_verb(verb)
            }

            fn set_url(&self, url: &str) {
                self.$field.set_url(url)
            }

            fn set_content(&self, content: Vec<u8>) {
                self.$field.set_content(content)
            }

            fn set_header(&self, name: &str, value: &str) {
                self.$field.set_header(name, value)
            }

            fn append_to_header(&self, name: &str, value: &str) {
                self.$field.append_to_header(name, value)
            }

            fn process_request(&self) -> bool {
                self.$field.begin()
            }

            fn set_completion_handler(&self, handler: Option<$crate::CompletionHandler>) {
                self.$field.set_completion_handler(handler)
            }

            fn set_progress_handler(&self, handler: Option<$crate::ProgressHandler>) {
                self.$field.set_progress_handler(handler)
            }

            fn has_completion_handler(&self) -> bool {
                self.$field.has_completion_handler()
            }

            fn has_progress_handler(&self) -> bool {
                self.$field.has_progress_handler()
            }

            fn cancel_request(&self) {
                self.$field.cancel()
            }

            fn status(&self) -> $crate::RequestStatus {
                self.$field.status()
            }

            fn response(&self) -> Option<::std::sync::Arc<dyn $crate::HttpResponse>> {
                self.$field.response()
            }

            fn tick(&self, delta: ::std::time::Duration) {
                self.$field.tick(self, delta)
            }

            fn elapsed_time(&self) -> ::std::time::Duration {
                self.$field.elapsed_time()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use crate::request::HttpBase;
    use crate::response::BasicResponse;
    use std::sync::atomic::AtomicUsize;

    /// Plain (non-threaded) request used to exercise the macro
    struct InlineRequest {
        state: RequestState,
    }

    crate::impl_http_request!(InlineRequest, state);

    fn request(url: &str) -> InlineRequest {
        InlineRequest {
            state: RequestState::with_target("get", url),
        }
    }

    #[test]
    fn test_defaults_and_accessors() {
        let req = InlineRequest {
            state: RequestState::new(),
        };
        assert_eq!(req.verb(), "GET");
        assert_eq!(req.status(), RequestStatus::NotStarted);
        assert!(req.response().is_none());

        req.set_url("http://host/x?q=1");
        req.set_header("Accept", "a");
        req.append_to_header("Accept", "b");
        req.set_content_as_string("body");

        assert_eq!(req.url_parameter("q").as_deref(), Some("1"));
        assert_eq!(req.header("accept").as_deref(), Some("a, b"));
        assert_eq!(req.content_length(), 4);
        assert_eq!(req.all_headers(), vec!["Accept: a, b"]);
    }

    #[test]
    fn test_process_requires_url_and_not_processing() {
        let req = InlineRequest {
            state: RequestState::new(),
        };
        assert!(!req.process_request());

        req.set_url("http://host/");
        assert!(req.process_request());
        assert_eq!(req.status(), RequestStatus::Processing);
        assert!(!req.process_request());
    }

    #[test]
    fn test_finish_runs_completion_once_per_attempt() {
        let req = request("http://host/");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        req.set_completion_handler(Some(Box::new(move |r, response| {
            assert_eq!(r.status(), RequestStatus::Succeeded);
            assert_eq!(response.map(|x| x.response_code()), Some(codes::OK));
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })));

        // Not processing yet
        assert!(!req.state.finish(&req, RequestStatus::Succeeded, None));

        assert!(req.process_request());
        let response: Arc<dyn HttpResponse> = Arc::new(BasicResponse::new(codes::OK, req.url()));
        assert!(req.state.finish(&req, RequestStatus::Succeeded, Some(response)));
        assert!(!req.state.finish(&req, RequestStatus::Failed, None));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(req.status(), RequestStatus::Succeeded);
        assert!(req.has_completion_handler(), "handler is restored after running");
    }

    #[test]
    fn test_finish_rejects_non_terminal() {
        let req = request("http://host/");
        assert!(req.process_request());
        assert!(!req.state.finish(&req, RequestStatus::NotStarted, None));
        assert_eq!(req.status(), RequestStatus::Processing);
    }

    #[test]
    fn test_handler_may_replace_itself() {
        let req = request("http://host/");
        req.set_completion_handler(Some(Box::new(|r, _| {
            r.set_completion_handler(None);
        })));

        assert!(req.process_request());
        assert!(req.state.finish(&req, RequestStatus::Failed, None));
        assert!(!req.has_completion_handler());
    }

    #[test]
    fn test_tick_reports_progress_on_change() {
        let req = request("http://host/");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        req.set_progress_handler(Some(Box::new(move |_, sent, received| {
            seen_clone.lock().unwrap().push((sent, received));
        })));

        // Not processing: no time accumulates, no progress
        req.tick(Duration::from_millis(5));
        assert_eq!(req.elapsed_time(), Duration::ZERO);

        assert!(req.process_request());
        req.tick(Duration::from_millis(10));
        req.state.set_progress(10, 0);
        req.tick(Duration::from_millis(10));
        req.tick(Duration::from_millis(10));
        req.state.set_progress(10, 64);
        req.tick(Duration::from_millis(10));

        assert_eq!(*seen.lock().unwrap(), vec![(10, 0), (10, 64)]);
        assert_eq!(req.elapsed_time(), Duration::from_millis(40));
    }

    #[test]
    fn test_reuse_after_finish() {
        let req = request("http://host/");
        assert!(req.process_request());
        req.cancel_request();
        assert!(req.state.is_cancelled());
        assert!(req.state.finish(&req, RequestStatus::Failed, None));

        assert!(req.process_request());
        assert!(!req.state.is_cancelled());
        assert_eq!(req.state.progress(), (0, 0));

        assert!(!req.state.reset(), "cannot reset while processing");
        assert!(req.state.finish(&req, RequestStatus::Succeeded, None));
        assert!(req.state.reset());
        assert_eq!(req.status(), RequestStatus::NotStarted);
    }

    #[test]
    fn test_clear_handlers() {
        let req = request("http://host/");
        req.set_completion_handler(Some(Box::new(|_, _| {})));
        req.set_progress_handler(Some(Box::new(|_, _, _| {})));
        assert!(req.has_completion_handler() && req.has_progress_handler());

        req.clear_handlers();
        assert!(!req.has_completion_handler());
        assert!(!req.has_progress_handler());
    }
}
