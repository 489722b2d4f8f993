//! Layout Parsing and Tree Building
//!
//! Turns a layout document into a validated [`FlowTree`]. Parsing accepts
//! JSON or YAML; building walks the declared composition, resolves every
//! action reference against the registry, and rejects empty composites.
//! A malformed layout never yields a runnable tree.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::DefinitionError;
use crate::workflow::layout::{Layout, LayoutNode};
use crate::workflow::node::{FlowTree, NodeId, TreeBuilder};
use crate::workflow::registry::ActionRegistry;

/// Loads a layout document from a file.
///
/// The format is chosen by extension: `.yaml`/`.yml` parse as YAML,
/// everything else as JSON.
pub fn load_layout(path: &str) -> Result<Layout, DefinitionError> {
    info!("Loading layout from: {}", path);

    let text = fs::read_to_string(path).map_err(|e| DefinitionError::Io {
        path: path.to_string(),
        source: e,
    })?;

    debug!("Layout content loaded ({} bytes)", text.len());

    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    let layout = match extension {
        "yaml" | "yml" => parse_layout_yaml(&text)?,
        _ => parse_layout_json(&text)?,
    };

    info!(
        "Parsed layout '{}': {} nodes, {} action references",
        layout.name,
        layout.node_count(),
        layout.action_ids().len()
    );

    Ok(layout)
}

/// Parses a layout from JSON text.
pub fn parse_layout_json(text: &str) -> Result<Layout, DefinitionError> {
    serde_json::from_str(text).map_err(|e| DefinitionError::Parse(e.to_string()))
}

/// Parses a layout from YAML text.
pub fn parse_layout_yaml(text: &str) -> Result<Layout, DefinitionError> {
    serde_yaml::from_str(text).map_err(|e| DefinitionError::Parse(e.to_string()))
}

/// Builds a standalone tree for a layout's declared composition.
///
/// The engine wraps this subtree with its lifecycle hooks; tests and tools
/// can use the bare tree directly.
pub fn build_tree<C>(
    layout: &Layout,
    registry: &ActionRegistry<C>,
) -> Result<FlowTree<C>, DefinitionError> {
    let mut builder = TreeBuilder::new();
    let root = build_subtree(&mut builder, &layout.workflow, "0", registry)?;
    Ok(builder.finish(root))
}

/// Recursively adds a declared node and its children to the builder.
///
/// `seq` is the node's path-like label; children are labeled `seq-i` by
/// declaration position, matching the labels used in definition errors.
pub fn build_subtree<C>(
    builder: &mut TreeBuilder<C>,
    node: &LayoutNode,
    seq: &str,
    registry: &ActionRegistry<C>,
) -> Result<NodeId, DefinitionError> {
    match node {
        LayoutNode::Action(action_id) => {
            let action =
                registry
                    .resolve(action_id)
                    .ok_or_else(|| DefinitionError::UnresolvedAction {
                        action: action_id.clone(),
                        node: seq.to_string(),
                    })?;
            debug!("Resolved action '{}' for node {}", action_id, seq);
            Ok(builder.add_action(seq, action))
        }
        LayoutNode::Serial(children) => {
            let ids = build_children(builder, children, seq, registry)?;
            Ok(builder.add_serial(seq, ids))
        }
        LayoutNode::Parallel(children) => {
            let ids = build_children(builder, children, seq, registry)?;
            Ok(builder.add_parallel(seq, ids))
        }
    }
}

fn build_children<C>(
    builder: &mut TreeBuilder<C>,
    children: &[LayoutNode],
    seq: &str,
    registry: &ActionRegistry<C>,
) -> Result<Vec<NodeId>, DefinitionError> {
    if children.is_empty() {
        return Err(DefinitionError::EmptyComposite {
            node: seq.to_string(),
        });
    }

    children
        .iter()
        .enumerate()
        .map(|(i, child)| build_subtree(builder, child, &format!("{}-{}", seq, i), registry))
        .collect()
}
