//! Structural errors raised by tree mutation and consistency checks

use thiserror::Error;

use crate::NodeId;

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// A violation of the tree's ownership contract
///
/// These indicate a defect in whichever pass produced the tree, never a
/// problem in the user's design.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The tree has no root node
    #[error("tree has no root")]
    NoRoot,

    /// A node without a parent cannot be replaced or unlinked
    #[error("node {node:?} is not linked into the tree")]
    Detached {
        /// The detached node
        node: NodeId,
    },

    /// The recorded parent does not hold the node in any slot
    #[error("node {child:?} is not held by its parent {parent:?}")]
    NotAChild {
        /// Recorded parent
        parent: NodeId,
        /// Node that was looked up
        child: NodeId,
    },

    /// A single-child slot was asked to hold zero or several nodes
    #[error("a single-child slot of {parent:?} cannot hold {count} nodes")]
    SlotArity {
        /// Node owning the slot
        parent: NodeId,
        /// Number of replacement nodes offered
        count: usize,
    },

    /// Deferred deletion was asked to free a node that is still linked
    #[error("node {node:?} is still linked into the tree and cannot be reclaimed")]
    StillLinked {
        /// The linked node
        node: NodeId,
    },

    /// A reclaimed node is reachable from a live one
    #[error("reclaimed node {node:?} is reachable from {parent:?}")]
    Reclaimed {
        /// Live node holding the id
        parent: NodeId,
        /// Reclaimed node
        node: NodeId,
    },

    /// A child's parent link does not point back at the node holding it
    #[error("node {child:?} is held by {parent:?} but records parent {recorded:?}")]
    BrokenParentLink {
        /// Node holding the child
        parent: NodeId,
        /// Child with the wrong link
        child: NodeId,
        /// Parent the child records
        recorded: Option<NodeId>,
    },

    /// The same node is reachable along two paths
    #[error("node {node:?} is reachable more than once")]
    SharedNode {
        /// Node reached twice
        node: NodeId,
    },
}
