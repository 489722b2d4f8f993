//! Workflow Engine
//!
//! Ties a layout, a registry, and a shared worker pool into a reusable
//! workflow: `init` builds the immutable tree once, `run` executes it
//! against a caller-supplied context and hands back a completion handle.
//! A workflow may be run many times, concurrently; each run gets its own
//! scheduler and sync state over the shared tree.
//!
//! Every run actually executes Serial[start-hook, declared-tree,
//! exit-hook]: lifecycle ordering falls out of ordinary serial semantics
//! rather than special-cased scheduler code.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;

use crate::error::DefinitionError;
use crate::execution::pool::WorkerPool;
use crate::execution::scheduler::{RunHandle, Scheduler};
use crate::workflow::layout::Layout;
use crate::workflow::node::{FlowTree, TreeBuilder};
use crate::workflow::parser::build_subtree;
use crate::workflow::registry::ActionRegistry;

/// Process-wide run sequence counter.
static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// A reusable workflow: layout + resolved actions + shared pool.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use flowrunner::{ActionRegistry, Engine, WorkerPool};
/// use flowrunner::workflow::parser::parse_layout_json;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let layout = parse_layout_json(
///         r#"{ "name": "demo", "workflow": { "type": "ACTION", "data": "hello" } }"#,
///     )?;
///
///     let mut registry: ActionRegistry<()> = ActionRegistry::new();
///     registry.register_fn("hello", |_ctx: &()| println!("hello"));
///
///     let pool = Arc::new(WorkerPool::with_default_size());
///     let mut engine = Engine::new(layout, registry, pool);
///     engine.init()?;
///
///     let handle = engine.run(Arc::new(()))?;
///     handle.wait();
///     Ok(())
/// }
/// ```
pub struct Engine<C> {
    layout: Layout,
    registry: ActionRegistry<C>,
    pool: Arc<WorkerPool>,
    tree: Option<Arc<FlowTree<C>>>,
}

impl<C: Send + Sync + 'static> Engine<C> {
    /// Creates an engine over a layout, a registry, and a shared pool.
    ///
    /// Nothing is validated until [`init`](Self::init).
    pub fn new(layout: Layout, registry: ActionRegistry<C>, pool: Arc<WorkerPool>) -> Self {
        Self {
            layout,
            registry,
            pool,
            tree: None,
        }
    }

    /// Builds and validates the workflow tree.
    ///
    /// Resolves every action reference, rejects malformed composition, and
    /// wraps the declared tree with the run-start and run-exit hooks. Any
    /// failure leaves the workflow unusable; there is no partial init.
    pub fn init(&mut self) -> Result<(), DefinitionError> {
        let mut builder = TreeBuilder::new();

        let start_name = self.layout.name.clone();
        let start = builder.add_runnable("start", move |sched| {
            info!("Workflow '{}' run {} start", start_name, sched.seq_id());
        });

        let declared = build_subtree(&mut builder, &self.layout.workflow, "0", &self.registry)?;

        let exit_name = self.layout.name.clone();
        let exit = builder.add_runnable("exit", move |sched| {
            info!("Workflow '{}' run {} exit", exit_name, sched.seq_id());
        });

        let root = builder.add_serial("root", vec![start, declared, exit]);
        let tree = builder.finish(root);

        info!(
            "Workflow '{}' initialized: {} nodes",
            self.layout.name,
            tree.len()
        );

        self.tree = Some(Arc::new(tree));
        Ok(())
    }

    /// Starts one run against a context and returns its handle.
    ///
    /// The handle's signal completes exactly once, after the whole wrapped
    /// tree finishes. Fails if the workflow was never initialized or if
    /// sync-state construction detects a malformed tree.
    pub fn run(&self, context: Arc<C>) -> Result<RunHandle<C>, DefinitionError> {
        let tree = self
            .tree
            .as_ref()
            .ok_or(DefinitionError::NotInitialized)?;

        let seq_id = RUN_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        let scheduler = Scheduler::new(seq_id, context, Arc::clone(tree), Arc::clone(&self.pool))?;
        scheduler.start();
        Ok(RunHandle::new(scheduler))
    }

    /// The workflow's declared name.
    pub fn name(&self) -> &str {
        &self.layout.name
    }

    /// Returns true once `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.tree.is_some()
    }

    /// Number of nodes in the built tree, including the lifecycle hooks.
    pub fn node_count(&self) -> Option<usize> {
        self.tree.as_ref().map(|tree| tree.len())
    }
}
