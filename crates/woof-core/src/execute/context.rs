//! Cancellation, timeouts and progress callbacks for cell execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::state::Output;

/// Handle for cooperative cancellation of one attempt.
///
/// `CancelToken` can be cloned and shared across threads; cancelling any
/// clone is visible to all of them. Interpreters observe it through
/// [`Session::checkpoint`](crate::interp::Session::checkpoint).
///
/// # Example
///
/// ```
/// use woof_core::execute::CancelToken;
///
/// let token = CancelToken::new();
/// let watcher = token.clone();
///
/// assert!(!watcher.is_cancelled());
/// token.cancel();
/// assert!(watcher.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Sleep for `duration`, waking early when cancelled.
    ///
    /// Returns `false` if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(10);
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let step = remaining.min(SLICE);
            thread::sleep(step);
            remaining -= step;
        }
        !self.is_cancelled()
    }
}

/// Supervising timer that cancels a token once its bound expires.
///
/// Dropping the watchdog disarms it; the timer thread is joined on drop.
pub struct Watchdog {
    disarm: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start a timer that cancels `token` after `timeout`.
    pub fn arm(timeout: Duration, token: CancelToken) -> Self {
        let (disarm, disarmed) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = disarmed.recv_timeout(timeout) {
                tracing::debug!("Watchdog fired after {:?}", timeout);
                token.cancel();
            }
        });
        Self {
            disarm: Some(disarm),
            handle: Some(handle),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Closing the channel wakes the timer thread immediately.
        self.disarm.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Callback trait for run progress reporting.
pub trait ExecutionCallback: Send + Sync {
    /// Called before a cell's first attempt.
    fn on_cell_started(&self, cell_id: &str);

    /// Called when a cell's outputs came from the cache.
    fn on_cell_cached(&self, cell_id: &str, outputs: &[Output]);

    /// Called when a cell's final attempt succeeded.
    fn on_cell_completed(&self, cell_id: &str, outputs: &[Output]);

    /// Called when a cell's final attempt failed.
    fn on_cell_failed(&self, cell_id: &str, outputs: &[Output]);

    /// Called for planned cells that are never executed.
    fn on_cell_skipped(&self, _cell_id: &str) {}
}
