//! Response codes that can come back from a request
//!
//! Plain `i32` constants rather than an enum: backends report whatever the
//! server sent, including codes not listed here.

/// Status code not set yet
pub const UNKNOWN: i32 = 0;

pub const CONTINUE: i32 = 100;
pub const SWITCH_PROTOCOL: i32 = 101;

pub const OK: i32 = 200;
pub const CREATED: i32 = 201;
pub const ACCEPTED: i32 = 202;
pub const PARTIAL: i32 = 203;
pub const NO_CONTENT: i32 = 204;
pub const RESET_CONTENT: i32 = 205;
pub const PARTIAL_CONTENT: i32 = 206;

pub const AMBIGUOUS: i32 = 300;
pub const MOVED: i32 = 301;
pub const REDIRECT: i32 = 302;
pub const REDIRECT_METHOD: i32 = 303;
pub const NOT_MODIFIED: i32 = 304;
pub const USE_PROXY: i32 = 305;
pub const REDIRECT_KEEP_VERB: i32 = 307;

pub const BAD_REQUEST: i32 = 400;
pub const DENIED: i32 = 401;
pub const PAYMENT_REQ: i32 = 402;
pub const FORBIDDEN: i32 = 403;
pub const NOT_FOUND: i32 = 404;
pub const BAD_METHOD: i32 = 405;
pub const NONE_ACCEPTABLE: i32 = 406;
pub const PROXY_AUTH_REQ: i32 = 407;
pub const REQUEST_TIMEOUT: i32 = 408;
pub const CONFLICT: i32 = 409;
pub const GONE: i32 = 410;
pub const LENGTH_REQUIRED: i32 = 411;
pub const PRECOND_FAILED: i32 = 412;
pub const REQUEST_TOO_LARGE: i32 = 413;
pub const URI_TOO_LONG: i32 = 414;
pub const UNSUPPORTED_MEDIA: i32 = 415;
pub const TOO_MANY_REQUESTS: i32 = 429;
pub const RETRY_WITH: i32 = 449;

pub const SERVER_ERROR: i32 = 500;
pub const NOT_SUPPORTED: i32 = 501;
pub const BAD_GATEWAY: i32 = 502;
pub const SERVICE_UNAVAIL: i32 = 503;
pub const GATEWAY_TIMEOUT: i32 = 504;
pub const VERSION_NOT_SUP: i32 = 505;

/// True if the status code is one of the 2xx codes above
#[inline]
pub const fn is_ok(code: i32) -> bool {
    code >= OK && code <= PARTIAL_CONTENT
}
