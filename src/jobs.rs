//! The deferred-result protocol for large tables.
//!
//! A table request that exceeds the server's inline size limit comes back
//! with status code 99 (background job running). The flow implemented here:
//! extract the result identifier from the status message, persist the full
//! envelope as a placeholder under that identifier, then poll the `result`
//! endpoint until the job reports a match and the placeholder can be
//! completed in place. Polling runs either on the caller's thread or on a
//! bounded pool of background workers.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::envelope::{Envelope, Status, StatusCode};
use crate::error::Result;
use crate::store::ResultStore;

/// Extracts the result identifier naming a batch job from the status message
/// of a background-running response.
///
/// The upstream API has no structured field for the identifier; it only
/// appears inside a natural-language message. This trait is the seam for
/// hardening or replacing that parsing should the API ever grow one.
pub trait ResultIdExtractor: Send + Sync {
    fn extract(&self, status_message: &str) -> Option<String>;
}

/// Default extractor: the trailing whitespace-separated token of the
/// message. This matches the server's current phrasing, which ends the
/// message with the job name; a phrasing change would silently yield a wrong
/// token, which is why the extraction sits behind [`ResultIdExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingToken;

impl ResultIdExtractor for TrailingToken {
    fn extract(&self, status_message: &str) -> Option<String> {
        status_message.split_whitespace().next_back().map(str::to_string)
    }
}

/// Looks up the current state of a batch job by result identifier.
pub(crate) trait ResultLookup: Send + Sync {
    fn lookup_result(&self, result_id: &str, language: &str) -> Result<Envelope>;
}

/// Cooperative cancellation signal, honored at every poll sleep boundary.
///
/// Cancelling wakes sleeping pollers immediately.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleeps for `duration`; returns `false` if the token was cancelled
    /// before or during the sleep.
    pub(crate) fn sleep(&self, duration: Duration) -> bool {
        let cancelled = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .inner
            .condvar
            .wait_timeout_while(cancelled, duration, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        !*guard
    }
}

/// Polls for the result of a batch job until it completes.
///
/// Each iteration re-issues the results lookup with `result_id` as the name
/// parameter and the original request's `language`. On a match the stored
/// placeholder's content is overwritten with the polled content and its
/// status with the localized success status, then persisted.
///
/// Returns `Ok(true)` on completion and `Ok(false)` when cancelled. Note the
/// inherited gap: a job that never completes, or that regresses to "no
/// match" after having run, keeps the loop polling forever; only a match,
/// cancellation, or a transport/store error ends it.
pub(crate) fn probe_for_result(
    lookup: &dyn ResultLookup,
    store: &dyn ResultStore,
    result_id: &str,
    language: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<bool> {
    loop {
        if cancel.is_cancelled() {
            return Ok(false);
        }

        log::info!("checking for result '{}' every {}s", result_id, interval.as_secs());
        let result = lookup.lookup_result(result_id, language)?;
        if result.status.code == StatusCode::Match {
            let mut placeholder = store.get(result_id)?;
            placeholder.content = result.content;
            placeholder.status = Status::success(language);
            store.put(result_id, &placeholder)?;
            return Ok(true);
        }

        if !cancel.sleep(interval) {
            return Ok(false);
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of polling workers.
///
/// Jobs queue on a channel; a fixed number of worker threads drain it, so
/// many concurrent asynchronous table requests cannot exhaust thread
/// resources. Dropping the runner cancels the shared token (waking any
/// sleeping poller) and joins the workers.
pub(crate) struct JobRunner {
    tx: Option<mpsc::Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl JobRunner {
    pub(crate) fn new(workers: usize, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|_| {
                let rx = Arc::clone(&rx);
                thread::spawn(move || {
                    loop {
                        let job = {
                            let guard = rx.lock().unwrap_or_else(|e| e.into_inner());
                            guard.recv()
                        };
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    }
                })
            })
            .collect();

        JobRunner { tx: Some(tx), handles, cancel }
    }

    pub(crate) fn submit(&self, job: Job) {
        if let Some(tx) = &self.tx {
            // Send only fails after shutdown has begun.
            let _ = tx.send(job);
        }
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
