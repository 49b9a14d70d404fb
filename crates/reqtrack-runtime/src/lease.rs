//! Exclusive worker-side handle to a threaded request
//!
//! A [`RequestLease`] is created by the registry when a threaded request is
//! submitted and travels Pending → Running → Completed → back to the
//! registry. It is not `Clone`, so a request can only ever sit in one worker
//! queue at a time, and the registry is the only code that creates or
//! consumes leases.

use std::fmt;
use std::sync::Arc;

use reqtrack_core::{HttpRequest, RequestKey, ThreadedHttpRequest};

/// Owning token for a threaded request held by the worker
pub struct RequestLease {
    request: Arc<dyn ThreadedHttpRequest>,
    key: RequestKey,
}

impl RequestLease {
    pub(crate) fn new(request: Arc<dyn ThreadedHttpRequest>) -> Self {
        let key = RequestKey::of_arc(&request);
        Self { request, key }
    }

    /// The leased request
    #[inline]
    pub fn request(&self) -> &dyn ThreadedHttpRequest {
        &*self.request
    }

    #[inline]
    pub fn key(&self) -> RequestKey {
        self.key
    }

    /// Give up the lease, returning the shared handle
    pub fn into_inner(self) -> Arc<dyn ThreadedHttpRequest> {
        self.request
    }
}

impl fmt::Debug for RequestLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLease")
            .field("key", &self.key)
            .field("status", &self.request.status())
            .finish()
    }
}
