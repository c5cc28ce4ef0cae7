// SPDX-License-Identifier: GPL-3.0-only
//! Single-threaded executor for camera callbacks
//!
//! Every platform callback (device state, session state, capture completion)
//! is posted to one worker thread and runs there in submission order, so
//! callbacks for a device or session never overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Upper bound on barrier rounds in `flush`, for producers that never go idle
const MAX_FLUSH_ROUNDS: usize = 64;

enum Message {
    Run(Job),
    Barrier(mpsc::SyncSender<()>),
    Stop,
}

/// Handle to the callback worker thread
///
/// Cheap to clone; all clones feed the same thread. The thread stops when
/// `shutdown` is called or the last clone is dropped.
#[derive(Clone)]
pub struct CallbackExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    sender: Mutex<Sender<Message>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    name: String,
    /// Queued jobs not yet finished, barriers excluded
    pending: Arc<AtomicUsize>,
}

impl CallbackExecutor {
    /// Spawn the worker thread
    pub fn new(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Message>();
        let name_clone = name.to_string();
        let pending = Arc::new(AtomicUsize::new(0));
        let pending_clone = Arc::clone(&pending);

        info!(name = %name, "Starting callback executor");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(&name_clone, receiver, &pending_clone))?;
        let thread_id = thread_handle.thread().id();

        Ok(Self {
            inner: Arc::new(ExecutorInner {
                sender: Mutex::new(sender),
                thread_handle: Mutex::new(Some(thread_handle)),
                thread_id,
                name: name.to_string(),
                pending,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queue a job. Returns false if the executor has already stopped.
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        if !self.post(Message::Run(Box::new(job))) {
            self.inner.pending.fetch_sub(1, Ordering::SeqCst);
            warn!(name = %self.inner.name, "Callback executor stopped, dropping job");
            return false;
        }
        true
    }

    fn post(&self, message: Message) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(message)
            .is_ok()
    }

    /// True when called from the worker thread itself
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Block until the queue is idle, including jobs that queued jobs post
    /// while running.
    ///
    /// No-op on the worker thread, where waiting would deadlock.
    pub fn flush(&self) {
        if self.is_current() {
            return;
        }
        for _ in 0..MAX_FLUSH_ROUNDS {
            let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
            if !self.post(Message::Barrier(done_tx)) || done_rx.recv().is_err() {
                return;
            }
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
        }
        debug!(name = %self.inner.name, "Callback executor still busy after flush");
    }

    /// Stop the worker after the jobs already queued and wait for it
    pub fn shutdown(&self) {
        self.inner.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for CallbackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackExecutor")
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .finish()
    }
}

impl ExecutorInner {
    fn stop(&self) {
        let handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };

        debug!(name = %self.name, "Stopping callback executor");
        let _ = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(Message::Stop);

        // The last handle may be released by a job on the worker itself
        if thread::current().id() == self.thread_id {
            return;
        }
        if let Err(e) = handle.join() {
            warn!(name = %self.name, "Callback executor thread panicked: {:?}", e);
        } else {
            debug!(name = %self.name, "Callback executor finished");
        }
    }
}

impl Drop for ExecutorInner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(name: &str, receiver: Receiver<Message>, pending: &AtomicUsize) {
    debug!(name = %name, "Callback executor thread started");

    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => {
                // A panicking callback must not take the remaining ones down
                if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                    warn!(name = %name, "Camera callback panicked: {:?}", e);
                }
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            Message::Barrier(done) => {
                let _ = done.send(());
            }
            Message::Stop => {
                debug!(name = %name, "Stop signal received");
                break;
            }
        }
    }

    info!(name = %name, "Callback executor thread exiting");
}
