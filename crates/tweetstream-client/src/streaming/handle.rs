//! Control handles for a running stream

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tweetstream_core::StatusEvent;

use super::types::SupervisorState;
use crate::error::{Result, StreamClientError};

/// Cloneable stop signal for one stream
///
/// Safe to call from inside a handler: the read loop checks the flag before
/// every dispatch and at every suspension point.
#[derive(Debug, Clone)]
pub struct StopHandle {
    inner: Arc<StopInner>,
}

#[derive(Debug)]
struct StopInner {
    stopped: watch::Sender<bool>,
    last_status: Mutex<Option<StatusEvent>>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            inner: Arc::new(StopInner {
                stopped,
                last_status: Mutex::new(None),
            }),
        }
    }

    /// Request a stop; returns the most recently dispatched status
    ///
    /// Idempotent.
    pub fn stop(&self) -> Option<StatusEvent> {
        self.inner.stopped.send_replace(true);
        self.last_status()
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.borrow()
    }

    /// Most recently dispatched status, if any
    pub fn last_status(&self) -> Option<StatusEvent> {
        self.inner.last_status.lock().clone()
    }

    pub(crate) fn record_status(&self, status: &StatusEvent) {
        *self.inner.last_status.lock() = Some(status.clone());
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        let mut rx = self.inner.stopped.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a stream running in the background
///
/// Dropping the handle detaches the stream; use [`StreamHandle::stop`] or a
/// [`StopHandle`] to end it.
#[derive(Debug)]
pub struct StreamHandle {
    stop: StopHandle,
    state: watch::Receiver<SupervisorState>,
    attempts: Arc<AtomicU32>,
    task: JoinHandle<Result<()>>,
}

impl StreamHandle {
    pub(crate) fn new(
        stop: StopHandle,
        state: watch::Receiver<SupervisorState>,
        attempts: Arc<AtomicU32>,
        task: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            stop,
            state,
            attempts,
            task,
        }
    }

    /// A cloneable stop signal for this stream
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop the stream; returns the most recently dispatched status
    pub fn stop(&self) -> Option<StatusEvent> {
        self.stop.stop()
    }

    /// Current supervisor state
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Watch channel of supervisor states
    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    /// Number of connection attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until the supervisor reaches a state matching `predicate`
    pub async fn wait_for_state<F>(&self, predicate: F) -> SupervisorState
    where
        F: Fn(SupervisorState) -> bool,
    {
        let mut rx = self.state.clone();
        let outcome = rx.wait_for(|s| predicate(*s)).await.map(|state| *state);
        outcome.unwrap_or_else(|_| *rx.borrow())
    }

    /// Wait for the terminal outcome
    ///
    /// `Ok(())` after a stop, `Err(ReconnectExhausted)` after the retry
    /// budget ran out.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(StreamClientError::TaskFailed(e.to_string())),
        }
    }

    /// Whether the background task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
