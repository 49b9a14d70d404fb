//! # reqtrack-runtime
//!
//! Threads and coordination for reqtrack.
//!
//! This crate provides:
//! - Registry and worker configuration (env overrides, builder, validation)
//! - Interruptible worker parking (futex on Linux, condvar elsewhere)
//! - The request worker thread and its hand-off queues
//! - The request registry with deferred destruction
//! - A scripted backend that simulates threaded requests

pub mod config;
pub mod parking;
pub mod lease;
pub mod worker;
pub mod registry;
pub mod scripted;

// Re-exports
pub use config::{ConfigError, RegistryConfig, WorkerConfig};
pub use parking::{new_parker, WorkerParker};
pub use lease::RequestLease;
pub use worker::{HttpWorker, WorkerStats, WorkerThread};
pub use registry::{RequestRegistry, RequestSnapshot};
pub use scripted::{Script, ScriptedRequest};
