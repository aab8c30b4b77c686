use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EditError, EditResult};
use crate::models::{BlockEdge, NodePosition, NodeSelection};
use crate::text::AttributedText;

/// Stable identity of a document node.
///
/// Assigned when the node is created and never reused; a node converted to another
/// kind gets a fresh id.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// A fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// A fixed id, for deterministic tests and hosts that mint their own ids
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of node type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Paragraph,
    Heading,
    ListItem,
    Quote,
    Divider,
    Media,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::ListItem => "list-item",
            NodeType::Quote => "quote",
            NodeType::Divider => "divider",
            NodeType::Media => "media",
        };
        f.write_str(name)
    }
}

/// List marker style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListStyle {
    Unordered,
    Ordered,
}

/// The kinds of node that carry attributed text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTextKind")]
pub enum TextKind {
    Paragraph,
    /// Level 1 to 6; other levels are clamped into that range wherever a node is built
    Heading { level: u8 },
    ListItem { style: ListStyle, indent: u8 },
    Quote,
}

#[derive(Deserialize)]
#[serde(rename = "TextKind")]
enum RawTextKind {
    Paragraph,
    Heading { level: u8 },
    ListItem { style: ListStyle, indent: u8 },
    Quote,
}

impl From<RawTextKind> for TextKind {
    fn from(raw: RawTextKind) -> Self {
        match raw {
            RawTextKind::Paragraph => TextKind::Paragraph,
            RawTextKind::Heading { level } => TextKind::heading(level),
            RawTextKind::ListItem { style, indent } => TextKind::ListItem { style, indent },
            RawTextKind::Quote => TextKind::Quote,
        }
    }
}

impl TextKind {
    pub const HEADING_LEVELS: std::ops::RangeInclusive<u8> = 1..=6;

    pub fn heading(level: u8) -> Self {
        TextKind::Heading {
            level: level.clamp(*Self::HEADING_LEVELS.start(), *Self::HEADING_LEVELS.end()),
        }
    }

    fn normalized(self) -> Self {
        match self {
            TextKind::Heading { level } => TextKind::heading(level),
            other => other,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            TextKind::Paragraph => NodeType::Paragraph,
            TextKind::Heading { .. } => NodeType::Heading,
            TextKind::ListItem { .. } => NodeType::ListItem,
            TextKind::Quote => NodeType::Quote,
        }
    }

    /// The kind given to the node split off the end of a node of this kind
    pub fn continuation(&self) -> TextKind {
        match self {
            TextKind::Heading { .. } => TextKind::Paragraph,
            other => other.clone(),
        }
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeContent {
    Text { kind: TextKind, text: AttributedText },
    Divider,
    Media { source: String, alt: Option<String> },
}

/// Block-level attributes that are not inline spans, e.g. `textAlign`
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One block of the document.
///
/// Nodes are values: edits build a replacement node and swap it into the document,
/// so anything outside the document refers to a node by its [`NodeId`] only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    id: NodeId,
    content: NodeContent,
    metadata: Metadata,
}

impl DocumentNode {
    pub fn new(id: NodeId, content: NodeContent) -> Self {
        let content = match content {
            NodeContent::Text { kind, text } => NodeContent::Text {
                kind: kind.normalized(),
                text,
            },
            other => other,
        };
        Self {
            id,
            content,
            metadata: Metadata::new(),
        }
    }

    pub fn text_node(kind: TextKind, text: impl Into<AttributedText>) -> Self {
        Self::new(
            NodeId::new(),
            NodeContent::Text {
                kind,
                text: text.into(),
            },
        )
    }

    pub fn paragraph(text: impl Into<AttributedText>) -> Self {
        Self::text_node(TextKind::Paragraph, text)
    }

    pub fn heading(level: u8, text: impl Into<AttributedText>) -> Self {
        Self::text_node(TextKind::heading(level), text)
    }

    pub fn list_item(style: ListStyle, text: impl Into<AttributedText>) -> Self {
        Self::text_node(TextKind::ListItem { style, indent: 0 }, text)
    }

    pub fn quote(text: impl Into<AttributedText>) -> Self {
        Self::text_node(TextKind::Quote, text)
    }

    pub fn divider() -> Self {
        Self::new(NodeId::new(), NodeContent::Divider)
    }

    pub fn media(source: impl Into<String>) -> Self {
        Self::new(
            NodeId::new(),
            NodeContent::Media {
                source: source.into(),
                alt: None,
            },
        )
    }

    /// Same node under a caller-chosen id
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn node_type(&self) -> NodeType {
        match &self.content {
            NodeContent::Text { kind, .. } => kind.node_type(),
            NodeContent::Divider => NodeType::Divider,
            NodeContent::Media { .. } => NodeType::Media,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, NodeContent::Text { .. })
    }

    pub fn text(&self) -> Option<&AttributedText> {
        match &self.content {
            NodeContent::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn text_kind(&self) -> Option<&TextKind> {
        match &self.content {
            NodeContent::Text { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// The text of a text node, or `UnsupportedNodeType` for anything else
    pub fn require_text(&self) -> EditResult<&AttributedText> {
        self.text().ok_or(EditError::UnsupportedNodeType {
            id: self.id,
            found: self.node_type(),
        })
    }

    pub fn beginning_position(&self) -> NodePosition {
        match &self.content {
            NodeContent::Text { .. } => NodePosition::Text { offset: 0 },
            _ => NodePosition::Block(BlockEdge::Upstream),
        }
    }

    pub fn end_position(&self) -> NodePosition {
        match &self.content {
            NodeContent::Text { text, .. } => NodePosition::Text { offset: text.len() },
            _ => NodePosition::Block(BlockEdge::Downstream),
        }
    }

    /// Resolve a position to something meaningful for this node.
    ///
    /// Text nodes accept block edges as their beginning/end; block nodes only accept
    /// block edges.
    pub fn resolve_position(&self, position: &NodePosition) -> EditResult<NodePosition> {
        match (&self.content, position) {
            (NodeContent::Text { text, .. }, NodePosition::Text { offset }) => {
                if *offset > text.len() {
                    return Err(EditError::offset(*offset, text.len()));
                }
                Ok(position.clone())
            }
            (NodeContent::Text { .. }, NodePosition::Block(BlockEdge::Upstream)) => {
                Ok(self.beginning_position())
            }
            (NodeContent::Text { .. }, NodePosition::Block(BlockEdge::Downstream)) => {
                Ok(self.end_position())
            }
            (_, NodePosition::Block(_)) => Ok(position.clone()),
            (_, NodePosition::Text { .. }) => Err(EditError::UnsupportedNodeType {
                id: self.id,
                found: self.node_type(),
            }),
        }
    }

    /// Node-local selection between two positions, validated against the content
    pub fn compute_selection(
        &self,
        base: &NodePosition,
        extent: &NodePosition,
    ) -> EditResult<NodeSelection> {
        match (self.resolve_position(base)?, self.resolve_position(extent)?) {
            (NodePosition::Text { offset: base }, NodePosition::Text { offset: extent }) => {
                Ok(NodeSelection::Text { base, extent })
            }
            (NodePosition::Block(base), NodePosition::Block(extent)) => {
                Ok(NodeSelection::Block { base, extent })
            }
            _ => Err(EditError::IllegalState("mixed position kinds in one node")),
        }
    }

    /// Plain-text extraction of the selected content.
    ///
    /// Dividers and media contribute an empty string.
    pub fn copy_content(&self, selection: &NodeSelection) -> EditResult<String> {
        match (&self.content, selection) {
            (NodeContent::Text { text, .. }, NodeSelection::Text { .. }) => {
                let range = selection.text_range().unwrap_or(0..0);
                Ok(text
                    .copy_text(range.start, Some(range.end))?
                    .text()
                    .to_string())
            }
            (NodeContent::Text { .. }, NodeSelection::Block { .. }) => Err(
                EditError::IllegalState("block selection applied to a text node"),
            ),
            (_, _) => Ok(String::new()),
        }
    }

    /// Copy of this node (same id) holding `text`
    pub fn with_text(&self, text: AttributedText) -> EditResult<Self> {
        match &self.content {
            NodeContent::Text { kind, .. } => Ok(Self {
                id: self.id,
                content: NodeContent::Text {
                    kind: kind.clone(),
                    text,
                },
                metadata: self.metadata.clone(),
            }),
            _ => Err(EditError::UnsupportedNodeType {
                id: self.id,
                found: self.node_type(),
            }),
        }
    }

    /// Copy of this node (same id) with one metadata entry replaced or removed
    pub fn with_metadata_entry(&self, key: &str, value: Option<serde_json::Value>) -> Self {
        let mut node = self.clone();
        match value {
            Some(value) => node.metadata.insert(key.to_string(), value),
            None => node.metadata.remove(key),
        };
        node
    }

    /// A new node of `kind` carrying this node's text and metadata under `new_id`
    pub fn converted_to(&self, kind: TextKind, new_id: NodeId) -> EditResult<Self> {
        let text = self.require_text()?.clone();
        Ok(Self {
            id: new_id,
            content: NodeContent::Text {
                kind: kind.normalized(),
                text,
            },
            metadata: self.metadata.clone(),
        })
    }

    /// Split a text node at `offset`.
    ///
    /// The head keeps this node's id; the tail becomes a new node under `new_id`
    /// whose kind is the continuation of this one, with the metadata carried over.
    pub fn split_at(&self, offset: usize, new_id: NodeId) -> EditResult<(Self, Self)> {
        let (head, tail) = self.require_text()?.split_at(offset)?;
        let kind = self.text_kind().map(TextKind::continuation).unwrap_or(TextKind::Paragraph);
        let tail = self.converted_to(kind, new_id)?.with_text(tail)?;
        Ok((self.with_text(head)?, tail))
    }

    /// This node (same id, kind and metadata) with `next`'s text appended
    pub fn merged_with(&self, next: &DocumentNode) -> EditResult<Self> {
        let merged = self.require_text()?.append(next.require_text()?);
        self.with_text(merged)
    }
}
