use crate::editing::Document;
use crate::models::{DocumentSelection, NodePosition};
use crate::text::AttributionSet;

/// Handle returned by [`Composer::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Composer)>;

/// Caller-side editing state: the current selection and the attributions the next
/// typed character will carry.
///
/// No selection is a valid state. Moving a collapsed caret resets the composing
/// attributions to whatever the character before the caret carries, so typing
/// continues the surrounding style; an expanded selection composes nothing.
pub struct Composer {
    selection: Option<DocumentSelection>,
    composing: AttributionSet,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: u64,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            selection: None,
            composing: AttributionSet::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub fn selection(&self) -> Option<&DocumentSelection> {
        self.selection.as_ref()
    }

    pub fn composing_attributions(&self) -> &AttributionSet {
        &self.composing
    }

    /// Replace the selection, resetting the composing attributions from `document`.
    ///
    /// Endpoints are stored resolved, so a caret at a text node's upstream edge is the
    /// same caret as offset 0.
    pub fn set_selection(&mut self, selection: Option<DocumentSelection>, document: &Document) {
        let selection = selection.map(|selection| selection.resolved(document));
        self.composing = selection
            .as_ref()
            .map(|selection| attributions_before_caret(selection, document))
            .unwrap_or_default();
        self.selection = selection;
        self.notify_listeners();
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.composing.clear();
        self.notify_listeners();
    }

    pub fn set_composing_attributions(&mut self, attributions: AttributionSet) {
        self.composing = attributions;
        self.notify_listeners();
    }

    /// Remove `attributions` from the composing set if all of them are already
    /// there, otherwise add them all
    pub fn toggle_composing(&mut self, attributions: &AttributionSet) {
        if attributions.is_subset(&self.composing) {
            self.composing.retain(|a| !attributions.contains(a));
        } else {
            self.composing.extend(attributions.iter().cloned());
        }
        self.notify_listeners();
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&Composer) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify_listeners(&mut self) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(self);
        }
        self.listeners = listeners;
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("selection", &self.selection)
            .field("composing", &self.composing)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn attributions_before_caret(selection: &DocumentSelection, document: &Document) -> AttributionSet {
    if !selection.is_collapsed() {
        return AttributionSet::new();
    }
    let caret = &selection.extent;
    let Some(text) = document.get_node_by_id(caret.node_id).and_then(|node| node.text()) else {
        return AttributionSet::new();
    };
    match caret.node_position {
        NodePosition::Text { offset } if offset > 0 => text.attributions_at(offset - 1),
        _ => AttributionSet::new(),
    }
}
