use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::editing::Document;
use crate::error::EditResult;
use crate::models::{DocumentNode, DocumentPosition, NodeId, NodeSelection};

/// A base/extent pair of positions, possibly spanning several nodes.
///
/// Direction is not stored separately: whichever endpoint comes first in document
/// order is the start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentSelection {
    pub base: DocumentPosition,
    pub extent: DocumentPosition,
}

impl DocumentSelection {
    pub fn new(base: DocumentPosition, extent: DocumentPosition) -> Self {
        Self { base, extent }
    }

    pub fn collapsed(position: DocumentPosition) -> Self {
        Self {
            base: position.clone(),
            extent: position,
        }
    }

    /// Whether both endpoints are the same position as written. A text node's edge
    /// and the matching offset only compare equal through [`Self::is_collapsed_in`],
    /// or after [`Self::resolved`].
    pub fn is_collapsed(&self) -> bool {
        self.base == self.extent
    }

    /// Whether both endpoints name the same point once resolved through their node
    pub fn is_collapsed_in(&self, document: &Document) -> bool {
        self.is_collapsed() || self.resolved(document).is_collapsed()
    }

    /// This selection with each endpoint resolved through its node, so text nodes are
    /// addressed by character offsets only. Endpoints that do not resolve are kept.
    pub fn resolved(&self, document: &Document) -> Self {
        let resolve = |position: &DocumentPosition| {
            document
                .get_node_by_id(position.node_id)
                .and_then(|node| node.resolve_position(&position.node_position).ok())
                .map(|node_position| DocumentPosition::new(position.node_id, node_position))
                .unwrap_or_else(|| position.clone())
        };
        Self::new(resolve(&self.base), resolve(&self.extent))
    }

    /// The endpoints as `(start, end)` in document order
    pub fn normalized(&self, document: &Document) -> EditResult<(DocumentPosition, DocumentPosition)> {
        match document.compare_positions(&self.base, &self.extent)? {
            Ordering::Greater => Ok((self.extent.clone(), self.base.clone())),
            _ => Ok((self.base.clone(), self.extent.clone())),
        }
    }

    /// Every node touched by the selection, in document order
    pub fn nodes<'d>(&self, document: &'d Document) -> EditResult<Vec<&'d DocumentNode>> {
        document.get_nodes_inside(&self.base, &self.extent)
    }

    /// The node-local selection for each touched node.
    ///
    /// The first node is selected from the start position to its end, the last from
    /// its beginning to the end position, and nodes in between entirely.
    pub fn node_selections<'d>(
        &self,
        document: &'d Document,
    ) -> EditResult<Vec<(&'d DocumentNode, NodeSelection)>> {
        let (start, end) = self.normalized(document)?;
        let nodes = document.get_nodes_inside(&start, &end)?;
        let last = nodes.len().saturating_sub(1);

        nodes
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                let from = if index == 0 {
                    start.node_position.clone()
                } else {
                    node.beginning_position()
                };
                let to = if index == last {
                    end.node_position.clone()
                } else {
                    node.end_position()
                };
                Ok((node, node.compute_selection(&from, &to)?))
            })
            .collect()
    }

    /// Plain text of the selection with `separator` between nodes.
    ///
    /// Independent of selection direction.
    pub fn extract_text(&self, document: &Document, separator: &str) -> EditResult<String> {
        let parts = self
            .node_selections(document)?
            .into_iter()
            .map(|(node, selection)| node.copy_content(&selection))
            .collect::<EditResult<Vec<_>>>()?;
        Ok(parts.join(separator))
    }

    /// The value of metadata `key` when every selected text node agrees on it,
    /// `default` when they disagree, `None` when no text node is selected
    pub fn metadata_for_selected_text_nodes(
        &self,
        document: &Document,
        key: &str,
        default: serde_json::Value,
    ) -> EditResult<Option<serde_json::Value>> {
        let mut values = self
            .nodes(document)?
            .into_iter()
            .filter(|node| node.is_text())
            .map(|node| node.metadata().get(key));

        let Some(first) = values.next() else {
            return Ok(None);
        };
        let uniform = values.all(|value| value == first);
        Ok(Some(match (uniform, first) {
            (true, Some(value)) => value.clone(),
            _ => default,
        }))
    }

    /// This selection with every reference to `old` pointed at `new`
    pub fn remap_node(&self, old: NodeId, new: NodeId) -> Self {
        let remap = |position: &DocumentPosition| {
            if position.node_id == old {
                DocumentPosition::new(new, position.node_position.clone())
            } else {
                position.clone()
            }
        };
        Self {
            base: remap(&self.base),
            extent: remap(&self.extent),
        }
    }
}
