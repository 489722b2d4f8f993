//! Workflow Layout Model
//!
//! Data structures for the declarative layout document that describes a
//! workflow's composition. A layout carries a name and a tree of nodes,
//! each tagged with a kind and a payload: an action id for `ACTION` nodes,
//! an ordered child list for `SERIAL` and `PARALLEL` nodes.
//!
//! # Example JSON Format
//!
//! ```json
//! {
//!   "name": "nightly-ingest",
//!   "workflow": {
//!     "type": "SERIAL",
//!     "data": [
//!       { "type": "ACTION", "data": "ingest.init" },
//!       {
//!         "type": "PARALLEL",
//!         "data": [
//!           { "type": "ACTION", "data": "ingest.fetch" },
//!           { "type": "ACTION", "data": "ingest.upload" }
//!         ]
//!       },
//!       { "type": "ACTION", "data": "ingest.report" }
//!     ]
//!   }
//! }
//! ```
//!
//! The same shape is accepted as YAML.

use serde::{Deserialize, Serialize};

/// A complete workflow layout: a name plus the root composition node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Layout {
    /// Human-readable workflow name.
    pub name: String,

    /// Root of the declared composition tree.
    pub workflow: LayoutNode,
}

/// One node of the declared composition tree.
///
/// The serialized form is adjacently tagged: `type` selects the kind,
/// `data` carries the payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LayoutNode {
    /// A leaf unit of work, referencing an action id to resolve against
    /// the registry.
    #[serde(rename = "ACTION")]
    Action(String),

    /// Children execute strictly in declaration order.
    #[serde(rename = "SERIAL")]
    Serial(Vec<LayoutNode>),

    /// Children execute concurrently with no relative ordering.
    #[serde(rename = "PARALLEL")]
    Parallel(Vec<LayoutNode>),
}

impl Layout {
    /// Creates a layout from a name and a root node.
    pub fn new(name: impl Into<String>, workflow: LayoutNode) -> Self {
        Self {
            name: name.into(),
            workflow,
        }
    }

    /// Returns every action id referenced by the layout, in declaration
    /// order, without deduplication.
    pub fn action_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.workflow.collect_action_ids(&mut ids);
        ids
    }

    /// Returns the total number of nodes in the layout.
    pub fn node_count(&self) -> usize {
        self.workflow.count()
    }
}

impl LayoutNode {
    fn collect_action_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LayoutNode::Action(id) => out.push(id),
            LayoutNode::Serial(children) | LayoutNode::Parallel(children) => {
                for child in children {
                    child.collect_action_ids(out);
                }
            }
        }
    }

    fn count(&self) -> usize {
        match self {
            LayoutNode::Action(_) => 1,
            LayoutNode::Serial(children) | LayoutNode::Parallel(children) => {
                1 + children.iter().map(LayoutNode::count).sum::<usize>()
            }
        }
    }
}
