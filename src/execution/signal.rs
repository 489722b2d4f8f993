//! Completion Signal
//!
//! A set-once, waitable completion flag created fresh for each run. The
//! first `signal` flips the flag and wakes every blocked waiter; later
//! calls are no-ops. Waiting is blocking only for the thread that asks to
//! block; the engine itself never waits on it.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// One-shot completion flag with blocking and timed wait.
pub struct CompletionSignal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl CompletionSignal {
    /// Creates an unsignaled instance.
    pub fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        // A poisoned lock only means a waiter panicked; the flag itself
        // stays valid.
        self.done.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks completion and wakes all waiters. Idempotent.
    pub fn signal(&self) {
        let mut done = self.lock();
        if !*done {
            *done = true;
            self.cond.notify_all();
        }
    }

    /// Returns true once completion has been signaled.
    pub fn is_done(&self) -> bool {
        *self.lock()
    }

    /// Blocks the calling thread until completion is signaled.
    ///
    /// Returns immediately if already signaled.
    pub fn wait(&self) {
        let mut done = self.lock();
        while !*done {
            done = self
                .cond
                .wait(done)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Blocks up to `timeout` or until signaled, whichever comes first.
    ///
    /// Returns without reporting which happened; callers that need to know
    /// query [`is_done`](Self::is_done) afterwards.
    pub fn wait_timeout(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut done = self.lock();
        while !*done {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            let (guard, _timed_out) = self
                .cond
                .wait_timeout(done, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            done = guard;
        }
    }

    /// Always fails: a run, once dispatched, cannot be aborted mid-flight.
    pub fn cancel(&self) -> bool {
        false
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_unsignaled() {
        let signal = CompletionSignal::new();
        assert!(!signal.is_done());
    }

    #[test]
    fn test_signal_is_idempotent() {
        let signal = CompletionSignal::new();
        signal.signal();
        signal.signal();
        assert!(signal.is_done());
    }

    #[test]
    fn test_wait_returns_immediately_when_already_signaled() {
        let signal = CompletionSignal::new();
        signal.signal();

        let start = Instant::now();
        signal.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_wait_timeout_elapses_without_signal() {
        let signal = CompletionSignal::new();

        let start = Instant::now();
        signal.wait_timeout(Duration::from_millis(50));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(!signal.is_done());
    }

    #[test]
    fn test_wait_timeout_returns_early_on_signal() {
        let signal = Arc::new(CompletionSignal::new());
        let signaler = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaler.signal();
        });

        signal.wait_timeout(Duration::from_secs(5));
        assert!(signal.is_done());
        handle.join().unwrap();
    }

    #[test]
    fn test_signal_wakes_multiple_waiters() {
        let signal = Arc::new(CompletionSignal::new());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || {
                    signal.wait();
                    signal.is_done()
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        signal.signal();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }

    #[test]
    fn test_cancel_always_fails() {
        let signal = CompletionSignal::new();
        assert!(!signal.cancel());
        signal.signal();
        assert!(!signal.cancel());
    }
}
