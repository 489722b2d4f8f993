//! Engine error types.
//!
//! Definition errors abort a workflow before any run is dispatched;
//! invariant violations abandon a single run after it started.

use thiserror::Error;

/// Errors raised while building a workflow from its layout.
///
/// All variants are surfaced synchronously at build/init time. A workflow
/// that fails with one of these never produces a runnable tree.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The layout file could not be read.
    #[error("failed to read layout file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The layout text is not a valid layout document.
    #[error("failed to parse layout: {0}")]
    Parse(String),

    /// An action node references an id the registry does not know.
    #[error("unknown action '{action}' in workflow node {node}")]
    UnresolvedAction { action: String, node: String },

    /// A serial or parallel node was declared with no children.
    #[error("empty child list in workflow node {node}")]
    EmptyComposite { node: String },

    /// The same node was registered twice during sync-state construction.
    ///
    /// The tree must be a strict tree; a node reachable through two parents
    /// trips this during the pre-dispatch build.
    #[error("workflow node {node} registered twice during state construction")]
    DuplicateNode { node: String },

    /// `run` was called before `init`.
    #[error("workflow is not initialized")]
    NotInitialized,
}

/// A broken scheduling invariant observed while a run is in flight.
///
/// These are programming errors, not layout errors: the run is abandoned,
/// its status forced to `Faulted`, and its completion signal fired so
/// waiters do not hang.
#[derive(Debug, Error)]
pub(crate) enum InvariantViolation {
    /// Completion reported for a node that has no sync state.
    #[error("completion reported for unregistered node {node}")]
    MissingState { node: String },

    /// A node's barrier was decremented below zero.
    #[error("barrier underflow on node {node}")]
    BarrierUnderflow { node: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_error_messages() {
        let err = DefinitionError::UnresolvedAction {
            action: "biz.search".to_string(),
            node: "0-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown action 'biz.search' in workflow node 0-1"
        );

        let err = DefinitionError::EmptyComposite {
            node: "0".to_string(),
        };
        assert!(err.to_string().contains("empty child list"));
    }

    #[test]
    fn test_io_error_preserves_source() {
        let err = DefinitionError::Io {
            path: "missing.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("missing.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invariant_violation_messages() {
        let err = InvariantViolation::BarrierUnderflow {
            node: "0-2".to_string(),
        };
        assert_eq!(err.to_string(), "barrier underflow on node 0-2");
    }
}
