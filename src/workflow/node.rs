//! Workflow Node Tree
//!
//! The immutable structural model of a workflow: an arena of nodes, each
//! addressed by a stable integer id assigned at construction time. Per-run
//! synchronization state is indexed by the same ids, so nothing in the
//! engine depends on reference identity.
//!
//! A tree is built once and shared read-only across every run of its
//! workflow.

use crate::execution::scheduler::Scheduler;
use crate::workflow::registry::Action;

/// Stable index of a node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle hook callback, invoked synchronously with the active run's
/// scheduler.
pub type RunnableFn<C> = Box<dyn Fn(&Scheduler<C>) + Send + Sync>;

/// Composition semantics of one node.
pub enum NodeKind<C> {
    /// Leaf unit of work with a resolved action binding.
    Action(Box<dyn Action<C>>),

    /// Leaf lifecycle hook (run-start/run-exit notifications).
    Runnable(RunnableFn<C>),

    /// Children execute strictly in declaration order; each child's entire
    /// subtree completes before the next child starts.
    Serial(Vec<NodeId>),

    /// Children all dispatch concurrently; completion joins on the last.
    Parallel(Vec<NodeId>),
}

impl<C> NodeKind<C> {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Action(_) => "action",
            NodeKind::Runnable(_) => "runnable",
            NodeKind::Serial(_) => "serial",
            NodeKind::Parallel(_) => "parallel",
        }
    }
}

/// A single node: a path-like label plus its kind.
pub struct FlowNode<C> {
    /// Stable, unique, path-like label within the tree ("root", "0-1", …).
    pub label: String,

    /// Composition semantics.
    pub kind: NodeKind<C>,
}

/// An immutable workflow tree.
pub struct FlowTree<C> {
    nodes: Vec<FlowNode<C>>,
    root: NodeId,
}

impl<C> FlowTree<C> {
    /// Returns the root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node for an id.
    ///
    /// Ids handed out by the builder are always in range.
    pub fn node(&self, id: NodeId) -> &FlowNode<C> {
        &self.nodes[id.0]
    }

    /// Returns the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds a node id by label.
    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.label == label)
            .map(NodeId)
    }
}

/// Incremental builder for a [`FlowTree`].
///
/// Children must be added before the composite that owns them, so every
/// child id a composite references already exists when the composite is
/// created.
pub struct TreeBuilder<C> {
    nodes: Vec<FlowNode<C>>,
}

impl<C> TreeBuilder<C> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, label: impl Into<String>, kind: NodeKind<C>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(FlowNode {
            label: label.into(),
            kind,
        });
        id
    }

    /// Adds an action leaf with a resolved binding.
    pub fn add_action(&mut self, label: impl Into<String>, action: Box<dyn Action<C>>) -> NodeId {
        self.push(label, NodeKind::Action(action))
    }

    /// Adds a lifecycle hook leaf.
    pub fn add_runnable<F>(&mut self, label: impl Into<String>, hook: F) -> NodeId
    where
        F: Fn(&Scheduler<C>) + Send + Sync + 'static,
    {
        self.push(label, NodeKind::Runnable(Box::new(hook)))
    }

    /// Adds a serial composite over existing children.
    pub fn add_serial(&mut self, label: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        self.push(label, NodeKind::Serial(children))
    }

    /// Adds a parallel composite over existing children.
    pub fn add_parallel(&mut self, label: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        self.push(label, NodeKind::Parallel(children))
    }

    /// Finishes the tree with the given root.
    pub fn finish(self, root: NodeId) -> FlowTree<C> {
        FlowTree {
            nodes: self.nodes,
            root,
        }
    }
}

impl<C> Default for TreeBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Box<dyn Action<()>> {
        Box::new(|_ctx: &()| {})
    }

    #[test]
    fn test_builder_assigns_sequential_ids() {
        let mut builder: TreeBuilder<()> = TreeBuilder::new();
        let a = builder.add_action("0-0", noop());
        let b = builder.add_action("0-1", noop());
        let root = builder.add_serial("0", vec![a, b]);

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(root.index(), 2);

        let tree = builder.finish(root);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root(), root);
    }

    #[test]
    fn test_node_lookup_by_label() {
        let mut builder: TreeBuilder<()> = TreeBuilder::new();
        let a = builder.add_action("fetch", noop());
        let root = builder.add_serial("root", vec![a]);
        let tree = builder.finish(root);

        assert_eq!(tree.find("fetch"), Some(a));
        assert_eq!(tree.find("root"), Some(root));
        assert_eq!(tree.find("missing"), None);
    }

    #[test]
    fn test_kind_names() {
        let mut builder: TreeBuilder<()> = TreeBuilder::new();
        let a = builder.add_action("a", noop());
        let h = builder.add_runnable("h", |_sched| {});
        let s = builder.add_serial("s", vec![a]);
        let p = builder.add_parallel("p", vec![h, s]);
        let tree = builder.finish(p);

        assert_eq!(tree.node(a).kind.name(), "action");
        assert_eq!(tree.node(h).kind.name(), "runnable");
        assert_eq!(tree.node(s).kind.name(), "serial");
        assert_eq!(tree.node(p).kind.name(), "parallel");
    }

    #[test]
    fn test_node_id_display() {
        let mut builder: TreeBuilder<()> = TreeBuilder::new();
        let a = builder.add_action("a", noop());
        assert_eq!(a.to_string(), "#0");
        let _ = builder.finish(a);
    }
}
