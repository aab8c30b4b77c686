pub mod node;
pub mod position;
pub mod selection;

pub use node::{DocumentNode, ListStyle, Metadata, NodeContent, NodeId, NodeType, TextKind};
pub use position::{BlockEdge, DocumentPosition, NodePosition, NodeSelection};
pub use selection::DocumentSelection;
