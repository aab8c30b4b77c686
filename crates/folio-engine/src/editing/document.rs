use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::editing::commands::{self, Cmd};
use crate::editing::Patch;
use crate::error::{EditError, EditResult};
use crate::models::{DocumentNode, DocumentPosition, NodeId};

/// Handle returned by [`Document::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&Document)>;

/// Ordered sequence of document nodes
///
/// The document is the single owner of every node and the unit observers subscribe to.
///
/// ## Transactions
/// - Mutations are only accepted while a transaction is open
///   (`begin_transaction` .. `commit_transaction`, or the `transact` helper)
/// - Staged mutations live on a copy of the node list; queries made during the
///   transaction see the staged state, observers never do
/// - Committing swaps the staged list in, bumps the version and notifies every
///   observer exactly once, in registration order
/// - A transaction that fails inside `transact` is discarded, leaving the committed
///   nodes untouched
///
/// ## Node storage
/// - Nodes are held behind `Arc`, so staging a transaction copies pointers, not text
/// - Nodes are never edited in place: an edit builds a replacement node and swaps it in
///
/// ## Usage Pattern
///
/// ```rust
/// # use folio_engine::editing::{Cmd, Document};
/// # use folio_engine::models::{DocumentNode, DocumentPosition};
/// let paragraph = DocumentNode::paragraph("Hello");
/// let id = paragraph.id();
/// let mut doc = Document::from_nodes(vec![paragraph]).unwrap();
///
/// let patch = doc
///     .apply(Cmd::InsertText {
///         position: DocumentPosition::text(id, 5),
///         text: " world".to_string(),
///         attributions: Default::default(),
///     })
///     .unwrap();
///
/// assert_eq!(patch.version, 1);
/// assert_eq!(doc.get_node_by_id(id).unwrap().text().unwrap().text(), "Hello world");
/// ```
pub struct Document {
    /// Committed nodes, the state observers see
    pub(crate) nodes: Vec<Arc<DocumentNode>>,
    /// Working copy while a transaction is open
    pub(crate) staged: Option<Vec<Arc<DocumentNode>>>,
    /// Incremented once per committed transaction
    pub(crate) version: u64,
    observers: Vec<(ObserverId, Observer)>,
    next_observer_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            staged: None,
            version: 0,
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Build a document from initial nodes, rejecting duplicate ids
    pub fn from_nodes(nodes: Vec<DocumentNode>) -> EditResult<Self> {
        let mut doc = Self::new();
        for (index, node) in nodes.into_iter().enumerate() {
            if doc.nodes.iter().any(|existing| existing.id() == node.id()) {
                return Err(EditError::IllegalState("duplicate node id"));
            }
            doc.nodes.insert(index, Arc::new(node));
        }
        Ok(doc)
    }

    /// Apply a command inside its own transaction
    ///
    /// On success the document has committed exactly one change and notified its
    /// observers once. On failure nothing is committed and nobody is notified.
    pub fn apply(&mut self, cmd: Cmd) -> EditResult<Patch> {
        log::debug!("applying command {}", cmd.name());
        let mut patch = self.transact(|doc| commands::execute(doc, cmd))?;
        patch.version = self.version;
        Ok(patch)
    }

    /// Run `f` inside a transaction, committing on `Ok` and discarding on `Err`
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Document) -> EditResult<T>) -> EditResult<T> {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(err) => {
                log::warn!("discarding transaction: {err}");
                self.staged = None;
                Err(err)
            }
        }
    }

    pub fn begin_transaction(&mut self) -> EditResult<()> {
        if self.staged.is_some() {
            return Err(EditError::IllegalState("a transaction is already open"));
        }
        self.staged = Some(self.nodes.clone());
        Ok(())
    }

    /// Publish staged mutations and notify observers once
    pub fn commit_transaction(&mut self) -> EditResult<()> {
        let staged = self
            .staged
            .take()
            .ok_or(EditError::IllegalState("no transaction is open"))?;
        self.nodes = staged;
        self.version += 1;
        log::debug!(
            "committed document version {} ({} nodes)",
            self.version,
            self.nodes.len()
        );
        self.notify_observers();
        Ok(())
    }

    pub fn is_in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn add_observer(&mut self, observer: impl FnMut(&Document) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` if `id` was not registered
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn notify_observers(&mut self) {
        // Observers only get a shared borrow, so they cannot open a nested transaction.
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in observers.iter_mut() {
            observer(self);
        }
        self.observers = observers;
    }

    fn current(&self) -> &[Arc<DocumentNode>] {
        self.staged.as_deref().unwrap_or(&self.nodes)
    }

    fn staged_mut(&mut self) -> EditResult<&mut Vec<Arc<DocumentNode>>> {
        self.staged
            .as_mut()
            .ok_or(EditError::IllegalState("document mutated outside a transaction"))
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DocumentNode> {
        self.current().iter().map(|node| node.as_ref())
    }

    pub fn get_node_at(&self, index: usize) -> Option<&DocumentNode> {
        self.current().get(index).map(|node| node.as_ref())
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Option<&DocumentNode> {
        self.current()
            .iter()
            .find(|node| node.id() == id)
            .map(|node| node.as_ref())
    }

    pub fn get_node_index(&self, id: NodeId) -> Option<usize> {
        self.current().iter().position(|node| node.id() == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get_node_index(id).is_some()
    }

    pub fn first_node(&self) -> Option<&DocumentNode> {
        self.get_node_at(0)
    }

    pub fn last_node(&self) -> Option<&DocumentNode> {
        self.current().last().map(|node| node.as_ref())
    }

    /// The node preceding `id`, `None` at the start or when `id` is absent
    pub fn get_node_before(&self, id: NodeId) -> Option<&DocumentNode> {
        let index = self.get_node_index(id)?;
        index.checked_sub(1).and_then(|i| self.get_node_at(i))
    }

    /// The node following `id`, `None` at the end or when `id` is absent
    pub fn get_node_after(&self, id: NodeId) -> Option<&DocumentNode> {
        let index = self.get_node_index(id)?;
        self.get_node_at(index + 1)
    }

    pub(crate) fn require_node(&self, id: NodeId) -> EditResult<&DocumentNode> {
        self.get_node_by_id(id).ok_or(EditError::MissingNode(id))
    }

    pub(crate) fn require_index(&self, id: NodeId) -> EditResult<usize> {
        self.get_node_index(id).ok_or(EditError::MissingNode(id))
    }

    /// Nodes between two positions, inclusive, in document order whichever comes first
    pub fn get_nodes_inside(
        &self,
        a: &DocumentPosition,
        b: &DocumentPosition,
    ) -> EditResult<Vec<&DocumentNode>> {
        let first = self.require_index(a.node_id)?;
        let second = self.require_index(b.node_id)?;
        let (start, end) = (first.min(second), first.max(second));
        Ok(self.current()[start..=end]
            .iter()
            .map(|node| node.as_ref())
            .collect())
    }

    /// Document order of two positions: node index first, then offset in the node
    pub fn compare_positions(&self, a: &DocumentPosition, b: &DocumentPosition) -> EditResult<Ordering> {
        let first = self.require_index(a.node_id)?;
        let second = self.require_index(b.node_id)?;
        Ok(first
            .cmp(&second)
            .then_with(|| a.node_position.compare(&b.node_position)))
    }

    pub fn insert_node_at(&mut self, index: usize, node: DocumentNode) -> EditResult<()> {
        if self.contains(node.id()) {
            return Err(EditError::IllegalState("duplicate node id"));
        }
        let nodes = self.staged_mut()?;
        if index > nodes.len() {
            return Err(EditError::index(index, nodes.len()));
        }
        nodes.insert(index, Arc::new(node));
        Ok(())
    }

    pub fn insert_node_after(&mut self, previous: NodeId, node: DocumentNode) -> EditResult<()> {
        let index = self.require_index(previous)?;
        self.insert_node_at(index + 1, node)
    }

    pub fn insert_node_before(&mut self, next: NodeId, node: DocumentNode) -> EditResult<()> {
        let index = self.require_index(next)?;
        self.insert_node_at(index, node)
    }

    pub fn delete_node_at(&mut self, index: usize) -> EditResult<DocumentNode> {
        let nodes = self.staged_mut()?;
        if index >= nodes.len() {
            return Err(EditError::index(index, nodes.len()));
        }
        let removed = nodes.remove(index);
        Ok(Arc::unwrap_or_clone(removed))
    }

    pub fn delete_node(&mut self, id: NodeId) -> EditResult<DocumentNode> {
        let index = self.require_index(id)?;
        self.delete_node_at(index)
    }

    /// Swap the node `old` for `node` at the same index
    ///
    /// `node` may keep the old id (an edit) or carry a new one (a conversion).
    pub fn replace_node(&mut self, old: NodeId, node: DocumentNode) -> EditResult<()> {
        let index = self.require_index(old)?;
        if node.id() != old && self.contains(node.id()) {
            return Err(EditError::IllegalState("duplicate node id"));
        }
        let nodes = self.staged_mut()?;
        nodes[index] = Arc::new(node);
        Ok(())
    }

    pub fn move_node(&mut self, id: NodeId, to_index: usize) -> EditResult<()> {
        let from = self.require_index(id)?;
        let nodes = self.staged_mut()?;
        if to_index >= nodes.len() {
            return Err(EditError::index(to_index, nodes.len()));
        }
        let node = nodes.remove(from);
        nodes.insert(to_index, node);
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Document {
    // Observers are tied to the original document and are not cloned.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            staged: None,
            version: self.version,
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }
}

impl PartialEq for Document {
    /// Structural equality of the committed nodes
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(other.nodes.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("nodes", &self.nodes)
            .field("in_transaction", &self.staged.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}
