//! Runs one long operation at a time off the command's own task.
//!
//! A command submits its work with [`Shell::spawn`] and then drains
//! [`ShellEvent`]s with [`Shell::wait`]. Progress reported by the work through
//! its `watch` sender is forwarded as [`ShellEvent::Progress`]; the outcome
//! arrives last, after the busy flag has been cleared.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum ShellEvent<T> {
    Progress(f64),
    Finished(T),
    Aborted(String),
}

#[derive(Debug, PartialEq)]
pub enum ShellError {
    /// Another operation is still running.
    Busy,
    /// The operation panicked or was cancelled.
    Aborted(String),
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellError::Busy => write!(f, "Another operation is already in progress"),
            ShellError::Aborted(reason) => write!(f, "Operation aborted: {}", reason),
        }
    }
}

impl std::error::Error for ShellError {}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Shell<T> {
    busy: Arc<AtomicBool>,
    events_tx: mpsc::UnboundedSender<ShellEvent<T>>,
    events_rx: mpsc::UnboundedReceiver<ShellEvent<T>>,
}

impl<T: Send + 'static> Default for Shell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Shell<T> {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Starts `task` on the runtime, handing it a progress sender.
    pub fn spawn<F, Fut>(&self, task: F) -> Result<(), ShellError>
    where
        F: FnOnce(watch::Sender<f64>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ShellError::Busy);
        }
        let guard = BusyGuard(self.busy.clone());

        let (progress_tx, mut progress_rx) = watch::channel(0.0);
        let work = task(progress_tx);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let progress_events = events.clone();
            let forwarder = tokio::spawn(async move {
                while progress_rx.changed().await.is_ok() {
                    let value = *progress_rx.borrow_and_update();
                    if progress_events.send(ShellEvent::Progress(value)).is_err() {
                        break;
                    }
                }
            });

            let outcome = tokio::spawn(work).await;
            // The work's sender is gone now, so the forwarder drains and stops.
            if let Err(e) = forwarder.await {
                warn!("Progress forwarder failed: {}", e);
            }
            drop(guard);

            let event = match outcome {
                Ok(value) => ShellEvent::Finished(value),
                Err(e) => ShellEvent::Aborted(e.to_string()),
            };
            if events.send(event).is_err() {
                debug!("Shell dropped before operation finished");
            }
        });
        Ok(())
    }

    /// Consumes events until the running operation finishes.
    pub async fn wait(&mut self, mut on_progress: impl FnMut(f64)) -> Result<T, ShellError> {
        loop {
            match self.events_rx.recv().await {
                Some(ShellEvent::Progress(value)) => on_progress(value),
                Some(ShellEvent::Finished(value)) => return Ok(value),
                Some(ShellEvent::Aborted(reason)) => return Err(ShellError::Aborted(reason)),
                None => return Err(ShellError::Aborted("event channel closed".to_string())),
            }
        }
    }
}
