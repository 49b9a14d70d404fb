//! # reqtrack-core
//!
//! Core types and contracts for reqtrack, the request lifecycle manager.
//!
//! This crate spawns no threads and performs no I/O. The worker thread and
//! the request registry live in `reqtrack-runtime`.
//!
//! ## Modules
//!
//! - `status` - Request status enum
//! - `codes` - Response code constants
//! - `request` - Request/response contracts, handler types, request keys
//! - `headers` - Header map and URL query helpers
//! - `request_state` - Reusable request bookkeeping for backends
//! - `response` - Buffered response value
//! - `error` - Error types
//! - `log` - Kernel-style leveled logging macros
//! - `env` - Environment variable utilities

pub mod status;
pub mod codes;
pub mod request;
pub mod headers;
pub mod request_state;
pub mod response;
pub mod error;
pub mod log;
pub mod env;

// Re-exports for convenience
pub use status::RequestStatus;
pub use request::{
    CompletionHandler, HttpBase, HttpRequest, HttpResponse, ProgressHandler, RequestKey,
    ThreadedHttpRequest,
};
pub use headers::{url_parameter, HeaderMap};
pub use request_state::RequestState;
pub use response::BasicResponse;
pub use error::{HttpError, HttpResult, WorkerError};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_secs};
