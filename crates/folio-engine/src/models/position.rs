use std::cmp::Ordering;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::models::NodeId;

/// Edge of a node that has no inner offsets (dividers, media)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockEdge {
    Upstream,
    Downstream,
}

/// A point inside one node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodePosition {
    /// Character offset into a text node
    Text { offset: usize },
    /// Before or after a block node
    Block(BlockEdge),
}

impl NodePosition {
    pub fn text_offset(&self) -> Option<usize> {
        match self {
            NodePosition::Text { offset } => Some(*offset),
            NodePosition::Block(_) => None,
        }
    }

    /// Order two positions within the same node.
    ///
    /// A block edge compared with a text offset acts as the node's beginning or end.
    pub fn compare(&self, other: &NodePosition) -> Ordering {
        fn key(position: &NodePosition) -> (u8, usize) {
            match position {
                NodePosition::Block(BlockEdge::Upstream) => (0, 0),
                NodePosition::Text { offset } => (1, *offset),
                NodePosition::Block(BlockEdge::Downstream) => (2, 0),
            }
        }
        key(self).cmp(&key(other))
    }
}

/// A point in the document: a node plus a position inside it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentPosition {
    pub node_id: NodeId,
    pub node_position: NodePosition,
}

impl DocumentPosition {
    pub fn new(node_id: NodeId, node_position: NodePosition) -> Self {
        Self {
            node_id,
            node_position,
        }
    }

    pub fn text(node_id: NodeId, offset: usize) -> Self {
        Self::new(node_id, NodePosition::Text { offset })
    }

    pub fn upstream(node_id: NodeId) -> Self {
        Self::new(node_id, NodePosition::Block(BlockEdge::Upstream))
    }

    pub fn downstream(node_id: NodeId) -> Self {
        Self::new(node_id, NodePosition::Block(BlockEdge::Downstream))
    }
}

/// Node-local selection produced by `DocumentNode::compute_selection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeSelection {
    Text { base: usize, extent: usize },
    Block { base: BlockEdge, extent: BlockEdge },
}

impl NodeSelection {
    /// Ordered character range of a text selection
    pub fn text_range(&self) -> Option<Range<usize>> {
        match self {
            NodeSelection::Text { base, extent } => Some(*base.min(extent)..*base.max(extent)),
            NodeSelection::Block { .. } => None,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            NodeSelection::Text { base, extent } => base == extent,
            NodeSelection::Block { base, extent } => base == extent,
        }
    }
}
