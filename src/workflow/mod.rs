//! Workflow Definition Module
//!
//! Provides the declarative layout model, the action registry, and the
//! immutable node tree the execution engine runs against.
//!
//! # Structure
//!
//! - [`layout`]: serde data model of the layout document
//! - [`registry`]: action trait and id-to-factory registry
//! - [`node`]: arena-based node tree and builder
//! - [`parser`]: JSON/YAML loading and tree building

pub mod layout;
pub mod node;
pub mod parser;
pub mod registry;

pub use layout::{Layout, LayoutNode};
pub use node::{FlowNode, FlowTree, NodeId, NodeKind, TreeBuilder};
pub use parser::{build_tree, load_layout, parse_layout_json, parse_layout_yaml};
pub use registry::{Action, ActionRegistry};
