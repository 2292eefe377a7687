//! Error types for the AST crate.

use crate::node::NodeId;
use thiserror::Error;

/// Errors that can occur in AST operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AstError {
    /// A checked downcast found a different node kind than requested.
    #[error("node {node:?} is a {found}, expected {expected}")]
    KindMismatch {
        /// The node that failed the cast.
        node: NodeId,
        /// Kind name that was requested.
        expected: &'static str,
        /// Kind name that was found.
        found: &'static str,
    },

    /// A fixed-position child index was out of range for the node.
    #[error("child index {index} out of bounds for node {node:?} with {len} children")]
    ChildOutOfBounds {
        node: NodeId,
        index: usize,
        len: usize,
    },

    /// A node was used where it is not a child of the given parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Structural invariant broken. This indicates an implementation bug,
    /// not a recoverable runtime condition.
    #[error("structural invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type for AST operations.
pub type AstResult<T> = Result<T, AstError>;
