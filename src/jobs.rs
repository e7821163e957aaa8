//! Single-worker background job queue
//!
//! Moves slow work (mostly writing the score file) off the tick loop. One
//! dedicated thread runs jobs one at a time; submitters only hold the lock
//! long enough to push onto the pending list.
//!
//! A panicking job is caught and logged, and the worker moves on. The
//! process panic hook still runs first, so binaries that want job panics
//! to go through `log` only should install their own hook.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// A unit of deferred work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

const WORKER_NAME: &str = "traffic-racer-jobs";

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    running: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
}

/// Background job queue with exactly one worker thread
pub struct BackgroundJobQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for BackgroundJobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BackgroundJobQueue")
            .field("pending", &state.pending.len())
            .field("running", &state.running)
            .finish()
    }
}

impl BackgroundJobQueue {
    /// Start the worker thread
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                running: true,
            }),
            wake: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || worker_loop(&worker_shared))
            .map_err(Error::WorkerSpawn)?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queue a job for the worker. Returns false (and drops the job) once the
    /// queue has been shut down.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                log::debug!("Job submitted after shutdown, dropping it");
                return false;
            }
            state.pending.push_back(Box::new(job));
        }
        self.shared.wake.notify_one();
        true
    }

    /// Jobs waiting for the worker (not counting one currently executing)
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Stop accepting jobs, let the worker finish everything already queued,
    /// and join it. Safe to call more than once, from any thread; every call
    /// returns only after the worker has exited.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
        }
        self.shared.wake.notify_all();

        // Held across the join so concurrent callers wait for the exit too
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                log::error!("Job worker thread panicked outside a job");
            } else {
                log::debug!("Job worker stopped");
            }
        }
    }
}

impl Drop for BackgroundJobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            while state.pending.is_empty() && state.running {
                shared.wake.wait(&mut state);
            }
            match state.pending.pop_front() {
                Some(job) => job,
                // Empty and stopped
                None => break,
            }
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            log::warn!("Background job panicked: {message}");
        }
    }
}
