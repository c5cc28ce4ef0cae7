// SPDX-License-Identifier: GPL-3.0-only
//! Thread driving a repeating capture request
//!
//! A repeating request keeps producing frames until it is replaced or the
//! session goes away. Backends that have no hardware clock of their own use
//! this loop to re-arm the request at a fixed frame interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the tick callback to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep re-arming the request
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a repeating request loop running in its own thread
///
/// Dropping the controller stops the loop and waits for the thread.
pub struct RepeatingLoop {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl RepeatingLoop {
    /// Call `tick` once per `interval` until it returns `LoopAction::Stop`
    /// or `stop` is called.
    pub fn start<F>(name: &str, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting repeating request loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut next_deadline = Instant::now();
                loop {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    if tick() == LoopAction::Stop {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }

                    // Fixed-rate pacing; a late tick does not accumulate debt
                    next_deadline += interval;
                    let now = Instant::now();
                    if next_deadline > now {
                        park_until(&stop_signal_clone, next_deadline);
                    } else {
                        next_deadline = now;
                    }
                }
                info!(name = %name_clone, "Repeating request loop exiting");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting repeating loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.thread_handle {
            handle.thread().unpark();
        }
    }

    /// Stop the loop and wait for its thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    fn join(&mut self) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        // The tick callback may itself release the last reference to the loop
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if let Err(e) = handle.join() {
            warn!(name = %self.name, "Repeating loop thread panicked: {:?}", e);
        }
    }
}

impl Drop for RepeatingLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "RepeatingLoop dropped, stopping loop");
            self.stop();
        }
    }
}

/// Sleep until `deadline`, waking early when stop is requested
fn park_until(stop_signal: &AtomicBool, deadline: Instant) {
    loop {
        if stop_signal.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut repeating = RepeatingLoop::start("test-self-stop", Duration::from_millis(1), move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 4 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        })
        .unwrap();

        repeating.join();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(!repeating.is_running());
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut repeating = RepeatingLoop::start("test-stop", Duration::from_secs(60), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        repeating.stop();

        // Parked on a 60s interval, stop must not wait it out
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let repeating = RepeatingLoop::start("test-drop", Duration::from_millis(1), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        })
        .unwrap();
        thread::sleep(Duration::from_millis(10));
        drop(repeating);

        let after_drop = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(counter.load(Ordering::SeqCst), after_drop);
    }
}
