//! Errors raised while turning an authored graph into a tree.
//!
//! Ticking never fails: every runtime problem a node can meet is reported
//! as [`crate::Status::Failure`]. Only construction is fallible.

use thiserror::Error;

use crate::NodeId;

/// Structural problems in an authored graph or blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node id {0} is used more than once")]
    DuplicateId(NodeId),

    #[error("graph has no root node")]
    MissingRoot,

    #[error("graph has more than one root node: {0:?}")]
    MultipleRoots(Vec<NodeId>),

    #[error("node {parent} references unknown node {child}")]
    UnknownNode { parent: NodeId, child: NodeId },

    #[error("node {child} has two parents: {first} and {second}")]
    SharedChild {
        child: NodeId,
        first: NodeId,
        second: NodeId,
    },

    #[error("node {parent} references the root node {root}")]
    RootReferenced { parent: NodeId, root: NodeId },

    #[error("leaf {id} uses unregistered behavior '{name}'")]
    UnknownLeaf { id: NodeId, name: String },
}
