use serde_json::Value;

use crate::editing::commands::{self, Cmd};
use crate::editing::{Composer, Document, Patch};
use crate::error::{EditError, EditResult};
use crate::ime::{
    DiffOp, RemoteTextOutcome, RemoteTextValue, StrippedText, apply_diff, diff_chars,
    is_identity, strip_sentinel,
};
use crate::models::{DocumentNode, DocumentPosition, DocumentSelection, NodeId};
use crate::settings::EditorSettings;
use crate::text::AttributionSet;

/// A document together with the selection and composing state that drive it.
///
/// Methods that act on the selection return `Ok(None)` when there is no selection.
/// Every method that changes the document does so in exactly one transaction and then
/// adopts the command's suggested selection.
pub struct Editor {
    document: Document,
    composer: Composer,
    settings: EditorSettings,
}

impl Editor {
    pub fn new(document: Document, settings: EditorSettings) -> Self {
        Self {
            document,
            composer: Composer::new(),
            settings,
        }
    }

    pub fn with_nodes(nodes: Vec<DocumentNode>, settings: EditorSettings) -> EditResult<Self> {
        Ok(Self::new(Document::from_nodes(nodes)?, settings))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for observers and raw transactions; the selection is not updated
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn selection(&self) -> Option<&DocumentSelection> {
        self.composer.selection()
    }

    pub fn set_selection(&mut self, selection: Option<DocumentSelection>) {
        self.composer.set_selection(selection, &self.document);
    }

    /// Apply a command and adopt its suggested selection
    pub fn execute(&mut self, cmd: Cmd) -> EditResult<Patch> {
        let patch = self.document.apply(cmd)?;
        self.adopt(&patch);
        Ok(patch)
    }

    /// Run several command steps as one transaction
    fn run(
        &mut self,
        action: &str,
        steps: impl FnOnce(&mut Document) -> EditResult<Patch>,
    ) -> EditResult<Patch> {
        log::debug!("applying editor action {action}");
        let mut patch = self.document.transact(steps)?;
        patch.version = self.document.version();
        self.adopt(&patch);
        Ok(patch)
    }

    fn adopt(&mut self, patch: &Patch) {
        if let Some(selection) = &patch.new_selection {
            self.composer.set_selection(Some(selection.clone()), &self.document);
        }
    }

    /// Type `text` over the selection with the composing attributions
    pub fn insert_text(&mut self, text: &str) -> EditResult<Option<Patch>> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(None);
        };
        let attributions = self.composer.composing_attributions().clone();
        self.execute(Cmd::ReplaceSelection {
            selection,
            text: text.to_string(),
            attributions,
        })
        .map(Some)
    }

    /// With a caret, prime (or unprime) the next typed characters; with an expanded
    /// selection, toggle the attributions over the selected text
    pub fn toggle_attributions(&mut self, attributions: AttributionSet) -> EditResult<Option<Patch>> {
        match self.selection().cloned() {
            None => Ok(None),
            Some(selection) if selection.is_collapsed() => {
                self.composer.toggle_composing(&attributions);
                Ok(None)
            }
            Some(selection) => self
                .execute(Cmd::ToggleAttributions {
                    selection,
                    attributions,
                })
                .map(Some),
        }
    }

    pub fn insert_newline(&mut self) -> EditResult<Option<Patch>> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(None);
        };
        if selection.is_collapsed() {
            return self.execute(Cmd::split(selection.base)).map(Some);
        }
        self.run("insert-newline", |doc| {
            let (changed, caret) = commands::delete_to_caret(doc, &selection)?;
            let split = commands::execute(doc, Cmd::split(caret))?;
            Ok(chain(changed, split))
        })
        .map(Some)
    }

    pub fn backspace(&mut self) -> EditResult<Option<Patch>> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(None);
        };
        let cmd = if selection.is_collapsed() {
            Cmd::DeleteUpstream {
                position: selection.extent,
            }
        } else {
            Cmd::DeleteSelection { selection }
        };
        self.execute(cmd).map(Some)
    }

    pub fn delete_forward(&mut self) -> EditResult<Option<Patch>> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(None);
        };
        let cmd = if selection.is_collapsed() {
            Cmd::DeleteDownstream {
                position: selection.extent,
            }
        } else {
            Cmd::DeleteSelection { selection }
        };
        self.execute(cmd).map(Some)
    }

    /// Delete an expanded selection; a caret deletes nothing
    pub fn delete_selection(&mut self) -> EditResult<Option<Patch>> {
        match self.selection().cloned() {
            Some(selection) if !selection.is_collapsed() => {
                self.execute(Cmd::DeleteSelection { selection }).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Paste plain text over the selection, one node per line
    pub fn paste(&mut self, text: &str) -> EditResult<Option<Patch>> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(None);
        };
        let text = text.to_string();
        self.run("paste", |doc| {
            let (changed, caret) = commands::delete_to_caret(doc, &selection)?;
            let position = commands::ensure_text_position(doc, caret)?;
            let pasted = commands::execute(doc, Cmd::PasteText { position, text })?;
            Ok(chain(changed, pasted))
        })
        .map(Some)
    }

    /// The selected text, nodes joined by the configured line separator
    pub fn selected_text(&self) -> EditResult<Option<String>> {
        self.selection()
            .map(|selection| selection.extract_text(&self.document, &self.settings.line_separator))
            .transpose()
    }

    /// Metadata shared by the selected text nodes, see
    /// [`DocumentSelection::metadata_for_selected_text_nodes`]
    pub fn selected_metadata(&self, key: &str, default: Value) -> EditResult<Option<Value>> {
        match self.selection() {
            Some(selection) => {
                selection.metadata_for_selected_text_nodes(&self.document, key, default)
            }
            None => Ok(None),
        }
    }

    /// The value to hand to the input method, `None` without a selection.
    ///
    /// A selection inside one text node offers that node's text behind the sentinel,
    /// with the caret at the extent. Any other selection offers empty text, so
    /// everything reported back for it is new input.
    pub fn remote_text_value(&self) -> Option<RemoteTextValue> {
        let selection = self.selection()?;
        let sentinel = self.settings.active_sentinel().unwrap_or_default();
        let (text, caret) = self
            .single_text_node(selection)
            .and_then(|node| {
                let offset = node
                    .resolve_position(&selection.extent.node_position)
                    .ok()?
                    .text_offset()?;
                Some((node.text()?.text(), offset))
            })
            .unwrap_or(("", 0));
        Some(RemoteTextValue::new(
            format!("{sentinel}{text}"),
            caret + sentinel.chars().count(),
        ))
    }

    /// The text node holding both ends of `selection`
    fn single_text_node(&self, selection: &DocumentSelection) -> Option<&DocumentNode> {
        if selection.base.node_id != selection.extent.node_id {
            return None;
        }
        self.document
            .get_node_by_id(selection.extent.node_id)
            .filter(|node| node.is_text())
    }

    /// Reconcile a full-text value reported by the input method
    pub fn apply_remote_text(&mut self, reported: RemoteTextValue) -> EditResult<RemoteTextOutcome> {
        let sentinel = self.settings.active_sentinel().map(str::to_owned);
        let stripped = strip_sentinel(&reported, sentinel.as_deref());
        let Some(selection) = self.selection().cloned() else {
            return Err(EditError::IllegalState("remote text without a selection"));
        };

        if sentinel.is_some() && !stripped.had_sentinel {
            log::debug!("remote text lost its sentinel, handling as backspace");
            let position = match self.document.get_node_by_id(selection.extent.node_id) {
                Some(node) if selection.is_collapsed() => {
                    DocumentPosition::new(node.id(), node.beginning_position())
                }
                _ => {
                    self.backspace()?;
                    return Ok(RemoteTextOutcome::Backspace);
                }
            };
            self.execute(Cmd::DeleteUpstream { position })?;
            return Ok(RemoteTextOutcome::Backspace);
        }

        if stripped.text.contains('\n') {
            log::debug!("remote text contains a newline, splitting at the caret");
            self.insert_newline()?;
            return Ok(RemoteTextOutcome::Newline);
        }

        match self.single_text_node(&selection).map(DocumentNode::id) {
            Some(node_id) => self.patch_remote(node_id, stripped),
            None => self.insert_remote(selection, stripped, sentinel.as_deref()),
        }
    }

    /// Diff the node's text against the reported text and patch the difference in,
    /// leaving the caret where the input method put it
    fn patch_remote(
        &mut self,
        node_id: NodeId,
        stripped: StrippedText,
    ) -> EditResult<RemoteTextOutcome> {
        let current = self.document.require_node(node_id)?.require_text()?.clone();
        let ops = diff_chars(current.text(), &stripped.text);
        let caret = DocumentSelection::collapsed(DocumentPosition::text(node_id, stripped.caret));

        if is_identity(&ops) {
            log::debug!("remote text unchanged");
            if self.selection() != Some(&caret) {
                self.composer.set_selection(Some(caret), &self.document);
            }
            return Ok(RemoteTextOutcome::Unchanged);
        }

        let (patched, edits) = apply_diff(&current, &ops)?;
        log::debug!("patching node {node_id} with {} remote edits", edits.len());
        self.execute(Cmd::ReplaceNodeText {
            node_id,
            text: patched,
        })?;
        self.composer.set_selection(Some(caret), &self.document);
        Ok(RemoteTextOutcome::Patched { ops: edits })
    }

    /// Fallback for selections that span nodes or sit on a block node: clear the way,
    /// then insert what the input method added one command at a time
    fn insert_remote(
        &mut self,
        selection: DocumentSelection,
        stripped: StrippedText,
        sentinel: Option<&str>,
    ) -> EditResult<RemoteTextOutcome> {
        log::debug!("remote text falls back to character insertion");
        let offered = self
            .remote_text_value()
            .map(|value| strip_sentinel(&value, sentinel).text)
            .unwrap_or_default();
        let inserted: String = diff_chars(&offered, &stripped.text)
            .into_iter()
            .filter_map(|op| match op {
                DiffOp::Insert(text) => Some(text),
                _ => None,
            })
            .collect();

        let prepared = self.run("remote-fallback", |doc| {
            let (mut changed, caret) = commands::delete_to_caret(doc, &selection)?;
            let caret = commands::ensure_text_position(doc, caret)?;
            if !changed.contains(&caret.node_id) {
                changed.push(caret.node_id);
            }
            Ok(Patch::new(changed, Some(DocumentSelection::collapsed(caret))))
        })?;
        let mut caret = prepared
            .new_selection
            .map(|s| s.extent)
            .ok_or(EditError::IllegalState("fallback produced no caret"))?;

        for ch in inserted.chars() {
            let attributions = self.composer.composing_attributions().clone();
            let patch = self.execute(Cmd::InsertText {
                position: caret.clone(),
                text: ch.to_string(),
                attributions,
            })?;
            if let Some(next) = patch.new_selection {
                caret = next.extent;
            }
        }
        Ok(RemoteTextOutcome::Fallback)
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.document)
            .field("composer", &self.composer)
            .field("settings", &self.settings)
            .finish()
    }
}

/// `next` with the ids changed by an earlier step of the same transaction in front
fn chain(mut changed: Vec<NodeId>, next: Patch) -> Patch {
    for id in &next.changed {
        if !changed.contains(id) {
            changed.push(*id);
        }
    }
    Patch { changed, ..next }
}
