//! Run Scheduler
//!
//! Owns one run's lifecycle from dispatch to completion. A fresh scheduler
//! is created per run; it builds a sync-state arena over the shared,
//! immutable tree, fully and before any dispatch, then drives execution by
//! dispatching nodes to the worker pool and cascading completions.
//!
//! Completion accounting is exactly-once: every node carries an atomic
//! countdown barrier, and the zero crossing is detected from the
//! decrement's own return value, never a separate re-read, so racing
//! sibling workers can neither double-fire nor miss a cascade.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::error::{DefinitionError, InvariantViolation};
use crate::execution::pool::WorkerPool;
use crate::execution::signal::CompletionSignal;
use crate::monitoring::timeline::{EventKind, RunTimeline, TimelineEvent};
use crate::workflow::node::{FlowTree, NodeId, NodeKind};

const STATUS_INIT: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_EXITED: u8 = 2;
const STATUS_FAULTED: u8 = 3;

/// Lifecycle status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Created, nothing dispatched yet
    Init,
    /// Dispatch has begun
    Running,
    /// The whole tree finished and the completion signal fired
    Exited,
    /// A scheduling invariant broke; the run was abandoned
    Faulted,
}

/// Per-node, per-run synchronization state.
///
/// `done` points at the structural node whose own completion this node's
/// completion triggers; `next` at the sibling to start afterwards. Both
/// are wired during construction and never change while the run executes.
struct SyncState {
    barrier: AtomicI64,
    done: Option<NodeId>,
    next: Option<NodeId>,
    error: Mutex<Option<String>>,
}

impl SyncState {
    fn new(barrier: i64) -> Self {
        Self {
            barrier: AtomicI64::new(barrier),
            done: None,
            next: None,
            error: Mutex::new(None),
        }
    }
}

/// Per-run orchestrator over a shared workflow tree.
///
/// Runnable hooks receive a reference to the active scheduler, so they can
/// read the run's sequence id or context for registration purposes.
pub struct Scheduler<C> {
    seq_id: u64,
    context: Arc<C>,
    tree: Arc<FlowTree<C>>,
    states: Vec<Option<SyncState>>,
    status: AtomicU8,
    pool: Arc<WorkerPool>,
    signal: CompletionSignal,
    timeline: RunTimeline,
    started_at: Mutex<Option<Instant>>,
    stopped_at: Mutex<Option<Instant>>,
}

impl<C: Send + Sync + 'static> Scheduler<C> {
    /// Builds the full sync-state arena for a run.
    ///
    /// Fails before anything is dispatched if a node is registered twice:
    /// the tree-is-a-strict-tree check.
    pub(crate) fn new(
        seq_id: u64,
        context: Arc<C>,
        tree: Arc<FlowTree<C>>,
        pool: Arc<WorkerPool>,
    ) -> Result<Arc<Self>, DefinitionError> {
        let mut states: Vec<Option<SyncState>> = Vec::with_capacity(tree.len());
        states.resize_with(tree.len(), || None);
        build_states(&tree, tree.root(), &mut states)?;

        debug!("Run {}: sync state built for {} nodes", seq_id, tree.len());

        Ok(Arc::new(Self {
            seq_id,
            context,
            tree,
            states,
            status: AtomicU8::new(STATUS_INIT),
            pool,
            signal: CompletionSignal::new(),
            timeline: RunTimeline::new(),
            started_at: Mutex::new(None),
            stopped_at: Mutex::new(None),
        }))
    }

    /// The run's externally visible sequence identifier.
    pub fn seq_id(&self) -> u64 {
        self.seq_id
    }

    /// The run's shared context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RunStatus {
        match self.status.load(Ordering::SeqCst) {
            STATUS_INIT => RunStatus::Init,
            STATUS_RUNNING => RunStatus::Running,
            STATUS_EXITED => RunStatus::Exited,
            _ => RunStatus::Faulted,
        }
    }

    pub(crate) fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    pub(crate) fn timeline(&self) -> &RunTimeline {
        &self.timeline
    }

    pub(crate) fn node_error(&self, id: NodeId) -> Option<String> {
        self.states[id.index()].as_ref().and_then(|state| {
            state
                .error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        })
    }

    /// Wall-clock duration of the run, once it has both started and
    /// stopped.
    pub(crate) fn duration(&self) -> Option<Duration> {
        let started = (*self.started_at.lock().unwrap_or_else(|e| e.into_inner()))?;
        let stopped = (*self.stopped_at.lock().unwrap_or_else(|e| e.into_inner()))?;
        Some(stopped.duration_since(started))
    }

    /// Begins the run: marks it running and submits the root dispatch to
    /// the pool. Returns immediately.
    pub(crate) fn start(self: &Arc<Self>) {
        if self
            .status
            .compare_exchange(
                STATUS_INIT,
                STATUS_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
            info!("Run {} started", self.seq_id);

            let scheduler = Arc::clone(self);
            let root = self.tree.root();
            self.pool.execute(move || scheduler.run_node(root));
        }
    }

    /// Type-directed execution of one node.
    ///
    /// Leaves run synchronously on the calling thread; a serial node
    /// dispatches only its first child; a parallel node submits one pool
    /// task per child and returns without blocking.
    fn run_node(self: &Arc<Self>, id: NodeId) {
        let node = self.tree.node(id);
        match &node.kind {
            NodeKind::Action(action) => {
                let label = node.label.as_str();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    if action.should_run(&self.context) {
                        self.timeline.record(label, EventKind::Started);
                        action.execute(&self.context);
                        self.timeline.record(label, EventKind::Completed);
                    } else {
                        debug!("Run {}: action {} skipped by guard", self.seq_id, label);
                        self.timeline.record(label, EventKind::Skipped);
                    }
                }));
                if let Err(payload) = outcome {
                    self.record_failure(id, panic_message(payload));
                }
                self.complete(id);
            }
            NodeKind::Runnable(hook) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| hook(self.as_ref())));
                if let Err(payload) = outcome {
                    self.record_failure(id, panic_message(payload));
                }
                self.complete(id);
            }
            NodeKind::Serial(children) => {
                // Later children start via the completion cascade.
                self.run_node(children[0]);
            }
            NodeKind::Parallel(children) => {
                for &child in children {
                    let scheduler = Arc::clone(self);
                    self.pool.execute(move || scheduler.run_node(child));
                }
            }
        }
    }

    /// Reports a node's completion, abandoning the run if that breaks a
    /// scheduling invariant.
    fn complete(self: &Arc<Self>, id: NodeId) {
        if let Err(violation) = self.on_complete(id) {
            error!("Run {}: {}; run abandoned", self.seq_id, violation);
            self.abandon();
        }
    }

    /// Atomically decrements a node's barrier and cascades on the zero
    /// crossing: first to the completion-parent, then to the next sibling.
    fn on_complete(self: &Arc<Self>, id: NodeId) -> Result<(), InvariantViolation> {
        let state = self.states[id.index()]
            .as_ref()
            .ok_or_else(|| InvariantViolation::MissingState {
                node: self.tree.node(id).label.clone(),
            })?;

        let value = state.barrier.fetch_sub(1, Ordering::AcqRel) - 1;
        if value < 0 {
            return Err(InvariantViolation::BarrierUnderflow {
                node: self.tree.node(id).label.clone(),
            });
        }
        if value == 0 {
            debug!(
                "Run {}: node {} complete",
                self.seq_id,
                self.tree.node(id).label
            );
            if let Some(parent) = state.done {
                self.on_complete(parent)?;
            }
            if let Some(next) = state.next {
                self.run_node(next);
            }
            if id == self.tree.root() {
                self.finish();
            }
        }
        Ok(())
    }

    /// Root completion: flips the run to Exited and fires the signal,
    /// both exactly once.
    fn finish(&self) {
        if self
            .status
            .compare_exchange(
                STATUS_RUNNING,
                STATUS_EXITED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            *self.stopped_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
            info!("Run {} exited", self.seq_id);
            self.signal.signal();
        }
    }

    /// Abandons a run after an invariant violation.
    ///
    /// The signal still fires so waiters never hang on a broken run; the
    /// Faulted status is the side channel that tells them what happened.
    fn abandon(&self) {
        let faulted = self
            .status
            .compare_exchange(
                STATUS_RUNNING,
                STATUS_FAULTED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
            || self
                .status
                .compare_exchange(
                    STATUS_INIT,
                    STATUS_FAULTED,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok();
        if faulted {
            *self.stopped_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        }
        self.signal.signal();
    }

    fn record_failure(&self, id: NodeId, message: String) {
        let label = &self.tree.node(id).label;
        error!("Run {}: node {} failed: {}", self.seq_id, label, message);
        self.timeline.record(label, EventKind::Failed);
        if let Some(state) = self.states[id.index()].as_ref() {
            *state.error.lock().unwrap_or_else(|e| e.into_inner()) = Some(message);
        }
    }
}

/// Recursively allocates sync state for every node under `id`.
///
/// Serial children are built last-to-first while `next` links are wired
/// first-to-last, so a child's state exists before the child can possibly
/// be reached. Parallel children all point their completion-parent at the
/// parallel node and carry no `next` link.
fn build_states<C>(
    tree: &FlowTree<C>,
    id: NodeId,
    states: &mut [Option<SyncState>],
) -> Result<(), DefinitionError> {
    if states[id.index()].is_some() {
        return Err(DefinitionError::DuplicateNode {
            node: tree.node(id).label.clone(),
        });
    }

    match &tree.node(id).kind {
        NodeKind::Action(_) | NodeKind::Runnable(_) => {
            states[id.index()] = Some(SyncState::new(1));
        }
        NodeKind::Serial(children) => {
            // Registered before its children; a cycle back to this node
            // trips the duplicate check instead of recursing forever.
            states[id.index()] = Some(SyncState::new(1));

            let (&last, rest) =
                children
                    .split_last()
                    .ok_or_else(|| DefinitionError::EmptyComposite {
                        node: tree.node(id).label.clone(),
                    })?;

            // The last child's cascade is the sole trigger of this node's
            // own completion.
            build_states(tree, last, states)?;
            set_done(states, last, id);

            let mut next = last;
            for &child in rest.iter().rev() {
                build_states(tree, child, states)?;
                set_next(states, child, next);
                next = child;
            }
        }
        NodeKind::Parallel(children) => {
            if children.is_empty() {
                return Err(DefinitionError::EmptyComposite {
                    node: tree.node(id).label.clone(),
                });
            }
            states[id.index()] = Some(SyncState::new(children.len() as i64));
            for &child in children {
                build_states(tree, child, states)?;
                set_done(states, child, id);
            }
        }
    }

    Ok(())
}

fn set_done(states: &mut [Option<SyncState>], child: NodeId, parent: NodeId) {
    if let Some(state) = states[child.index()].as_mut() {
        state.done = Some(parent);
    }
}

fn set_next(states: &mut [Option<SyncState>], child: NodeId, next: NodeId) {
    if let Some(state) = states[child.index()].as_mut() {
        state.next = Some(next);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "node panicked".to_string()
    }
}

/// Caller-facing handle to one run.
///
/// Completes exactly once, after the whole wrapped tree finishes
/// dispatching. The completion signal carries no pass/fail information;
/// status and per-node errors are separate side channels.
pub struct RunHandle<C> {
    scheduler: Arc<Scheduler<C>>,
}

impl<C: Send + Sync + 'static> RunHandle<C> {
    pub(crate) fn new(scheduler: Arc<Scheduler<C>>) -> Self {
        Self { scheduler }
    }

    /// The run's sequence identifier.
    pub fn seq_id(&self) -> u64 {
        self.scheduler.seq_id()
    }

    /// Blocks until the run's completion signal fires.
    pub fn wait(&self) {
        self.scheduler.signal().wait();
    }

    /// Blocks up to `timeout` or until completion; query
    /// [`is_done`](Self::is_done) afterwards to learn which. Work already
    /// submitted to the pool keeps running regardless.
    pub fn wait_timeout(&self, timeout: Duration) {
        self.scheduler.signal().wait_timeout(timeout);
    }

    /// Returns true once the completion signal has fired.
    pub fn is_done(&self) -> bool {
        self.scheduler.signal().is_done()
    }

    /// Always fails: dispatched runs cannot be aborted.
    pub fn cancel(&self) -> bool {
        self.scheduler.signal().cancel()
    }

    /// Current lifecycle status of the run.
    pub fn status(&self) -> RunStatus {
        self.scheduler.status()
    }

    /// The failure recorded for a node, by label, if any.
    pub fn node_error(&self, label: &str) -> Option<String> {
        self.scheduler
            .tree
            .find(label)
            .and_then(|id| self.scheduler.node_error(id))
    }

    /// Snapshot of the run's recorded timeline events.
    pub fn timeline(&self) -> Vec<TimelineEvent> {
        self.scheduler.timeline().events()
    }

    /// Plain-text timing report for the run.
    pub fn render_timeline(&self) -> String {
        self.scheduler.timeline().render()
    }

    /// Wall-clock duration, once the run has finished.
    pub fn duration(&self) -> Option<Duration> {
        self.scheduler.duration()
    }
}
