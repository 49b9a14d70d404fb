//! Request and response contracts
//!
//! Every backend realizes these traits. The registry and the worker thread
//! only ever talk to requests through them.
//!
//! All methods take `&self`: requests are shared between the owner thread
//! and the worker thread behind `Arc`, so implementations keep their
//! mutable state behind their own lock (see [`RequestState`](crate::RequestState)).
//!
//! # Thread affinity
//!
//! | Method group | Called on |
//! |---|---|
//! | accessors, `process_request`, `tick`, `cancel_request` | owner thread |
//! | `start_threaded_request`, `tick_threaded_request`, `is_threaded_request_complete`, `abort_threaded_request` | worker thread |
//! | `finish_request` | owner thread, once, after the worker hands the request back |

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::status::RequestStatus;

/// Handler invoked when a request completes
///
/// Receives the request and its response, if one was received.
pub type CompletionHandler =
    Box<dyn FnMut(&dyn HttpRequest, Option<Arc<dyn HttpResponse>>) + Send + 'static>;

/// Handler invoked per tick with bytes sent and bytes received so far
pub type ProgressHandler = Box<dyn FnMut(&dyn HttpRequest, u64, u64) + Send + 'static>;

/// Accessors shared by requests and responses
pub trait HttpBase: Send + Sync {
    /// URL used to send the request
    fn url(&self) -> String;

    /// Parameter from the `?key=value&key=value` part of the URL
    ///
    /// `None` if absent or not in that format.
    fn url_parameter(&self, name: &str) -> Option<String>;

    /// Value of a header, `None` if not set
    fn header(&self, name: &str) -> Option<String>;

    /// All headers in `"Name: Value"` format
    fn all_headers(&self) -> Vec<String>;

    /// Shortcut for the `Content-Type` header
    fn content_type(&self) -> Option<String> {
        self.header("Content-Type")
    }

    /// Length of the payload in bytes
    fn content_length(&self) -> usize;

    /// Copy of the payload
    fn content(&self) -> Vec<u8>;
}

/// A request tracked by the registry
pub trait HttpRequest: HttpBase {
    /// Verb used by the request (`GET`, `PUT`, `POST`, ...)
    fn verb(&self) -> String;

    /// Set the verb. Defaults to `GET` when never set.
    fn set_verb(&self, verb: &str);

    /// Set the URL. Must be non-empty before `process_request()`.
    fn set_url(&self, url: &str);

    /// Set the payload
    fn set_content(&self, content: Vec<u8>);

    /// Set the payload from a string, encoded as UTF-8
    fn set_content_as_string(&self, content: &str) {
        self.set_content(content.as_bytes().to_vec());
    }

    /// Set a header, overwriting any previous value
    fn set_header(&self, name: &str, value: &str);

    /// Append to a header with a `", "` delimiter, or set it if unset
    fn append_to_header(&self, name: &str, value: &str);

    /// Begin processing
    ///
    /// Returns false if the request is already processing or has no URL.
    /// A finished request may be processed again.
    fn process_request(&self) -> bool;

    /// Replace the completion handler (`None` clears it)
    fn set_completion_handler(&self, handler: Option<CompletionHandler>);

    /// Replace the progress handler (`None` clears it)
    fn set_progress_handler(&self, handler: Option<ProgressHandler>);

    fn has_completion_handler(&self) -> bool;

    fn has_progress_handler(&self) -> bool;

    /// Clear both handler slots
    fn clear_handlers(&self) {
        self.set_completion_handler(None);
        self.set_progress_handler(None);
    }

    /// Request termination. Cooperative; status may not change immediately.
    fn cancel_request(&self);

    fn status(&self) -> RequestStatus;

    /// Response, available once a terminal status is reached
    fn response(&self) -> Option<Arc<dyn HttpResponse>>;

    /// Advance internal timers. Safe to call in any status.
    fn tick(&self, delta: Duration);

    /// Time spent processing the current (or last) attempt
    fn elapsed_time(&self) -> Duration;
}

/// A request whose I/O runs on the worker thread
pub trait ThreadedHttpRequest: HttpRequest {
    /// Begin backend I/O. Worker thread. False on immediate failure.
    fn start_threaded_request(&self) -> bool;

    /// Non-blocking completion poll. Worker thread.
    fn is_threaded_request_complete(&self) -> bool;

    /// Advance the backend state machine. Worker thread.
    fn tick_threaded_request(&self, delta: Duration);

    /// Backend cancellation hook, run before a cancelled request leaves
    /// the running set. Worker thread.
    fn abort_threaded_request(&self) {}

    /// Finalize status and response and run the completion handler.
    /// Owner thread, exactly once per attempt.
    fn finish_request(&self);
}

/// Response received for a request
pub trait HttpResponse: HttpBase {
    /// Response code returned by the server, see [`codes`](crate::codes)
    fn response_code(&self) -> i32;

    /// Payload as a string, assuming UTF-8 (lossy)
    fn content_as_string(&self) -> String {
        String::from_utf8_lossy(&self.content()).into_owned()
    }
}

/// Identity of a request object
///
/// Derived from the address of the shared allocation, so every `Arc`
/// handle to the same request, whether typed as `HttpRequest` or
/// `ThreadedHttpRequest`, yields the same key. A key does not keep the
/// request alive and can be stored or compared from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(usize);

impl RequestKey {
    /// Key of a request reached through a reference
    #[inline]
    pub fn of<R: ?Sized>(request: &R) -> Self {
        RequestKey((request as *const R).cast::<()>() as usize)
    }

    /// Key of a request behind an `Arc`
    #[inline]
    pub fn of_arc<R: ?Sized>(request: &Arc<R>) -> Self {
        RequestKey(Arc::as_ptr(request).cast::<()>() as usize)
    }

    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{:x}", self.0)
    }
}
