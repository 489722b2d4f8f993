//! Workflow Execution Module
//!
//! The concurrent core of the crate: per-run scheduling over a shared
//! node tree, the worker pool it dispatches onto, and the completion
//! signal callers wait on.
//!
//! # Architecture
//!
//! - [`engine`]: reusable workflow handle (init once, run many times)
//! - [`scheduler`]: per-run barrier construction and completion cascade
//! - [`pool`]: bounded worker pool shared across runs
//! - [`signal`]: set-once completion flag with blocking and timed wait

pub mod engine;
pub mod pool;
pub mod scheduler;
pub mod signal;

pub use engine::Engine;
pub use pool::WorkerPool;
pub use scheduler::{RunHandle, RunStatus, Scheduler};
pub use signal::CompletionSignal;
