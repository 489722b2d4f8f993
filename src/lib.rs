//! FlowRunner - Tree-Structured Workflow Execution Engine
//!
//! Runs a statically-declared tree of composable units (actions,
//! lifecycle hooks, serial groups, and parallel groups) against a shared
//! run context on a bounded worker pool, with a single completion signal
//! per run.
//!
//! # Architecture
//!
//! The library is organized into three main modules:
//!
//! - [`workflow`]: layout model, action registry, and the immutable node tree
//! - [`execution`]: engine, per-run scheduler, worker pool, completion signal
//! - [`monitoring`]: per-run action timeline
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowrunner::{load_layout, ActionRegistry, Engine, WorkerPool};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a layout from JSON or YAML
//!     let layout = load_layout("workflow.json")?;
//!
//!     // Bind the referenced action ids
//!     let mut registry: ActionRegistry<()> = ActionRegistry::new();
//!     registry.register_fn("ingest.report", |_ctx: &()| println!("report"));
//!
//!     // Build the workflow and run it on a shared pool
//!     let pool = Arc::new(WorkerPool::new(4));
//!     let mut engine = Engine::new(layout, registry, pool);
//!     engine.init()?;
//!
//!     let handle = engine.run(Arc::new(()))?;
//!     handle.wait();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod execution;
pub mod monitoring;
pub mod workflow;

// Re-export commonly used types
pub use error::DefinitionError;
pub use execution::engine::Engine;
pub use execution::pool::WorkerPool;
pub use execution::scheduler::{RunHandle, RunStatus, Scheduler};
pub use execution::signal::CompletionSignal;
pub use monitoring::timeline::{EventKind, TimelineEvent};
pub use workflow::layout::{Layout, LayoutNode};
pub use workflow::parser::load_layout;
pub use workflow::registry::{Action, ActionRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "FlowRunner";
