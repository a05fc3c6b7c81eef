//! Persistent run state.
//!
//! This module provides:
//! - Output records shared by the executor, cache and log
//! - The content-addressed cache store
//! - The sidecar result log

mod cache;
mod log;
mod output;

pub use cache::{CacheKey, CacheStore, ENGINE_VERSION};
pub use log::{LogRecord, SidecarLog, read_log};
pub use output::{Output, StreamName, has_error, stream_records};
