use crate::models::{NodeId, NodeType};

/// Failure surfaced by any document, text or command operation.
///
/// A failed command never leaves partial changes visible: the transaction it ran in
/// is discarded and observers are not notified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// An offset or index outside the valid bounds of the addressed value.
    #[error("{what} {value} is out of range (valid bound: {bound})")]
    OutOfRange {
        what: &'static str,
        value: usize,
        bound: usize,
    },
    /// Mutating without an open transaction, or opening a second one.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
    /// A command referenced a node id that is not in the document.
    #[error("node {0} is not in the document")]
    MissingNode(NodeId),
    /// A command expected a text node and found something else.
    #[error("node {id} is a {found} node, expected a text node")]
    UnsupportedNodeType { id: NodeId, found: NodeType },
}

impl EditError {
    pub(crate) fn offset(value: usize, bound: usize) -> Self {
        EditError::OutOfRange {
            what: "offset",
            value,
            bound,
        }
    }

    pub(crate) fn index(value: usize, bound: usize) -> Self {
        EditError::OutOfRange {
            what: "index",
            value,
            bound,
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;
