use crate::models::{DocumentSelection, NodeId};

/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Ids of nodes inserted, removed or replaced, in the order they were touched
    pub changed: Vec<NodeId>,
    /// Where the command suggests the selection goes next; the caller decides
    pub new_selection: Option<DocumentSelection>,
    /// Document version after the commit
    pub version: u64,
}

impl Patch {
    pub(crate) fn new(changed: Vec<NodeId>, new_selection: Option<DocumentSelection>) -> Self {
        Self {
            changed,
            new_selection,
            version: 0,
        }
    }

    pub(crate) fn unchanged(new_selection: Option<DocumentSelection>) -> Self {
        Self::new(Vec::new(), new_selection)
    }

    /// Whether the command left every node as it was
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}
