// SPDX-License-Identifier: MIT
//! Background worker with bounded teardown.
//!
//! Lifecycle calls run on the host's single driving loop and must return
//! quickly; anything with unbounded latency (network, slow disk) belongs
//! on a worker thread. The worker publishes results into instance state
//! under a lock and the next update consumes them — the update call never
//! waits on the worker. There is no host cancellation signal beyond
//! teardown, so the plugin signals its own workers to stop and joins with
//! a bounded wait during finalize.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

struct StopState {
    stopped: Mutex<bool>,
    cv: Condvar,
}

/// Cooperative stop signal handed to the worker closure.
#[derive(Clone)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl StopToken {
    /// Has stop been requested?
    pub fn is_stopped(&self) -> bool {
        *self
            .state
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`, waking early on a stop request. Returns
    /// true when stop was requested — the usual poll-loop shape is
    /// `while !token.wait(interval) { ... }`.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self
            .state
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .state
            .cv
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// A named background thread that can be stopped and joined within a
/// bounded time.
pub struct Worker {
    state: Arc<StopState>,
    done_rx: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl Worker {
    /// Spawn `job` on a dedicated thread. The job should check its
    /// [`StopToken`] regularly and return promptly once stop is
    /// requested.
    pub fn spawn<F>(name: &str, job: F) -> io::Result<Worker>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let state = Arc::new(StopState {
            stopped: Mutex::new(false),
            cv: Condvar::new(),
        });
        let token = StopToken {
            state: Arc::clone(&state),
        };
        let (done_tx, done_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                job(token);
                let _ = done_tx.send(());
            })?;
        Ok(Worker {
            state,
            done_rx,
            handle: Some(handle),
            name: name.to_owned(),
        })
    }

    /// The worker's thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request stop without waiting.
    pub fn request_stop(&self) {
        let mut stopped = self
            .state
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.state.cv.notify_all();
    }

    /// Signal stop and wait up to `timeout` for the worker to finish.
    ///
    /// Returns true once the thread is joined. On timeout the thread is
    /// detached and false is returned — finalize must not block forever,
    /// and a detached worker only holds its own `Arc`s, never freed
    /// instance state.
    pub fn stop_and_join(mut self, timeout: Duration) -> bool {
        self.request_stop();
        match self.done_rx.recv_timeout(timeout) {
            // Done, or the thread is already gone (sender dropped, e.g.
            // after a worker panic) — either way the join is immediate.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                self.handle.take();
                false
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Dropping without stop_and_join still signals the worker; the
        // thread detaches rather than blocking the caller.
        self.request_stop();
    }
}
