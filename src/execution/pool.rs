//! Worker Pool
//!
//! A bounded pool of worker threads fed by a single channel. The pool is
//! owned and sized by the caller, wrapped in an `Arc`, and shared across
//! every run of a workflow: parallel fan-out tasks and initial run
//! dispatches all land here.
//!
//! Dropping the pool closes the channel; workers drain queued jobs and
//! join.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size thread pool executing submitted jobs.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    sender: Option<Sender<Job>>,
}

impl WorkerPool {
    /// Creates a pool with `size` worker threads.
    ///
    /// A requested size of zero is bumped to one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = channel();
        let receiver = Arc::new(Mutex::new(receiver));

        debug!("Starting worker pool with {} threads", size);

        let workers = (0..size)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("flow-worker-{}", index))
                    .spawn(move || worker_loop(index, receiver))
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread: {}", e))
            })
            .collect();

        Self {
            workers,
            sender: Some(sender),
        }
    }

    /// Creates a pool sized to the number of logical CPUs.
    pub fn with_default_size() -> Self {
        Self::new(num_cpus::get())
    }

    /// Submits a job for execution on some worker thread.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            // Send only fails after every worker is gone, which cannot
            // happen before drop closes the channel.
            if sender.send(Box::new(job)).is_err() {
                error!("Worker pool channel closed; job dropped");
            }
        }
    }

    /// Returns the number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(index: usize, receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = {
            let guard = receiver.lock().unwrap_or_else(|e| e.into_inner());
            guard.recv()
        };

        match job {
            Ok(job) => {
                // A panicking job must not take the worker down with it.
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("Worker {} caught a panicking job", index);
                }
            }
            Err(_) => {
                debug!("Worker {} shutting down", index);
                break;
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Worker thread panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_size_is_bumped_to_one() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_default_size_matches_cpu_count() {
        let pool = WorkerPool::with_default_size();
        assert_eq!(pool.size(), num_cpus::get());
    }

    #[test]
    fn test_all_jobs_run_before_drop_completes() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(4);
            for _ in 0..100 {
                let count = Arc::clone(&count);
                pool.execute(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_jobs_spread_across_threads() {
        let seen = Arc::new(Mutex::new(HashSet::new()));
        {
            let pool = WorkerPool::new(4);
            for _ in 0..32 {
                let seen = Arc::clone(&seen);
                pool.execute(move || {
                    thread::sleep(Duration::from_millis(5));
                    seen.lock().unwrap().insert(thread::current().id());
                });
            }
        }
        assert!(seen.lock().unwrap().len() > 1);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(1);
            pool.execute(|| {
                panic!("boom");
            });
            let count = Arc::clone(&count);
            pool.execute(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
