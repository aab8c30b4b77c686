use std::ops::Range;

use crate::editing::{Document, Patch};
use crate::error::{EditError, EditResult};
use crate::models::{
    BlockEdge, DocumentNode, DocumentPosition, DocumentSelection, NodeContent, NodeId,
    NodePosition, TextKind,
};
use crate::text::{AttributedText, AttributionSet};

/// Commands that can be applied to the document
///
/// Every command runs inside one transaction. Given the same starting document a
/// command produces the same result, except for commands that mint node ids
/// themselves (`ToggleTextKind`, `PasteText`, and `DeleteUpstream` on a list item or
/// quote), whose new ids are random.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        position: DocumentPosition,
        text: String,
        attributions: AttributionSet,
    },
    /// Delete an expanded selection, then insert at the resulting caret.
    ///
    /// A caret on a block node first gets an empty paragraph beside it to type into.
    ReplaceSelection {
        selection: DocumentSelection,
        text: String,
        attributions: AttributionSet,
    },
    DeleteSelection {
        selection: DocumentSelection,
    },
    /// Backspace at a collapsed caret
    DeleteUpstream {
        position: DocumentPosition,
    },
    /// Forward delete at a collapsed caret
    DeleteDownstream {
        position: DocumentPosition,
    },
    /// Enter: split the node at `position`, the tail becoming `new_node_id`
    SplitTextNode {
        position: DocumentPosition,
        new_node_id: NodeId,
    },
    MergeWithNext {
        node_id: NodeId,
    },
    InsertNode {
        index: usize,
        node: DocumentNode,
    },
    InsertNodeAfter {
        existing: NodeId,
        node: DocumentNode,
    },
    DeleteNode {
        node_id: NodeId,
    },
    ReplaceNode {
        node_id: NodeId,
        node: DocumentNode,
    },
    MoveNode {
        node_id: NodeId,
        to_index: usize,
    },
    ConvertTextNode {
        node_id: NodeId,
        kind: TextKind,
        new_node_id: NodeId,
    },
    /// Convert every selected text node to `kind`, or back to paragraphs when all of
    /// them already are that kind
    ToggleTextKind {
        selection: DocumentSelection,
        kind: TextKind,
    },
    AddAttributions {
        selection: DocumentSelection,
        attributions: AttributionSet,
    },
    RemoveAttributions {
        selection: DocumentSelection,
        attributions: AttributionSet,
    },
    ToggleAttributions {
        selection: DocumentSelection,
        attributions: AttributionSet,
    },
    /// Set (`Some`) or clear (`None`) one metadata entry
    SetMetadata {
        node_id: NodeId,
        key: String,
        value: Option<serde_json::Value>,
    },
    /// Insert plain text; each line after the first becomes its own node
    PasteText {
        position: DocumentPosition,
        text: String,
    },
    ReplaceNodeText {
        node_id: NodeId,
        text: AttributedText,
    },
}

impl Cmd {
    /// Split at `position` with a freshly minted id for the new node
    pub fn split(position: DocumentPosition) -> Self {
        Cmd::SplitTextNode {
            position,
            new_node_id: NodeId::new(),
        }
    }

    /// Convert `node_id` to `kind` under a freshly minted id
    pub fn convert(node_id: NodeId, kind: TextKind) -> Self {
        Cmd::ConvertTextNode {
            node_id,
            kind,
            new_node_id: NodeId::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cmd::InsertText { .. } => "insert-text",
            Cmd::ReplaceSelection { .. } => "replace-selection",
            Cmd::DeleteSelection { .. } => "delete-selection",
            Cmd::DeleteUpstream { .. } => "delete-upstream",
            Cmd::DeleteDownstream { .. } => "delete-downstream",
            Cmd::SplitTextNode { .. } => "split-text-node",
            Cmd::MergeWithNext { .. } => "merge-with-next",
            Cmd::InsertNode { .. } => "insert-node",
            Cmd::InsertNodeAfter { .. } => "insert-node-after",
            Cmd::DeleteNode { .. } => "delete-node",
            Cmd::ReplaceNode { .. } => "replace-node",
            Cmd::MoveNode { .. } => "move-node",
            Cmd::ConvertTextNode { .. } => "convert-text-node",
            Cmd::ToggleTextKind { .. } => "toggle-text-kind",
            Cmd::AddAttributions { .. } => "add-attributions",
            Cmd::RemoveAttributions { .. } => "remove-attributions",
            Cmd::ToggleAttributions { .. } => "toggle-attributions",
            Cmd::SetMetadata { .. } => "set-metadata",
            Cmd::PasteText { .. } => "paste-text",
            Cmd::ReplaceNodeText { .. } => "replace-node-text",
        }
    }
}

/// Run a command against a document with an open transaction
pub(crate) fn execute(doc: &mut Document, cmd: Cmd) -> EditResult<Patch> {
    match cmd {
        Cmd::InsertText {
            position,
            text,
            attributions,
        } => insert_text(doc, &position, &text, &attributions),
        Cmd::ReplaceSelection {
            selection,
            text,
            attributions,
        } => {
            let (mut changed, caret) = delete_to_caret(doc, &selection)?;
            let caret = ensure_text_position(doc, caret)?;
            let inserted = insert_text(doc, &caret, &text, &attributions)?;
            for id in inserted.changed {
                if !changed.contains(&id) {
                    changed.push(id);
                }
            }
            Ok(Patch::new(changed, inserted.new_selection))
        }
        Cmd::DeleteSelection { selection } => delete_selection(doc, &selection),
        Cmd::DeleteUpstream { position } => delete_upstream(doc, &position),
        Cmd::DeleteDownstream { position } => delete_downstream(doc, &position),
        Cmd::SplitTextNode {
            position,
            new_node_id,
        } => split_text_node(doc, &position, new_node_id),
        Cmd::MergeWithNext { node_id } => {
            let len = doc.require_node(node_id)?.require_text()?.len();
            let Some(next_id) = doc.get_node_after(node_id).map(DocumentNode::id) else {
                return Ok(Patch::unchanged(None));
            };
            merge_nodes(doc, node_id, next_id)?;
            Ok(Patch::new(
                vec![node_id, next_id],
                Some(caret(node_id, len)),
            ))
        }
        Cmd::InsertNode { index, node } => {
            let id = node.id();
            doc.insert_node_at(index, node)?;
            Ok(Patch::new(vec![id], None))
        }
        Cmd::InsertNodeAfter { existing, node } => {
            let id = node.id();
            doc.insert_node_after(existing, node)?;
            Ok(Patch::new(vec![id], None))
        }
        Cmd::DeleteNode { node_id } => {
            doc.delete_node(node_id)?;
            Ok(Patch::new(vec![node_id], None))
        }
        Cmd::ReplaceNode { node_id, node } => {
            let new_id = node.id();
            doc.replace_node(node_id, node)?;
            Ok(Patch::new(changed_pair(node_id, new_id), None))
        }
        Cmd::MoveNode { node_id, to_index } => {
            doc.move_node(node_id, to_index)?;
            Ok(Patch::new(vec![node_id], None))
        }
        Cmd::ConvertTextNode {
            node_id,
            kind,
            new_node_id,
        } => {
            let converted = doc.require_node(node_id)?.converted_to(kind, new_node_id)?;
            doc.replace_node(node_id, converted)?;
            Ok(Patch::new(changed_pair(node_id, new_node_id), None))
        }
        Cmd::ToggleTextKind { selection, kind } => toggle_text_kind(doc, &selection, &kind),
        Cmd::AddAttributions {
            selection,
            attributions,
        } => change_attributions(doc, &selection, &attributions, AttributionChange::Add),
        Cmd::RemoveAttributions {
            selection,
            attributions,
        } => change_attributions(doc, &selection, &attributions, AttributionChange::Remove),
        Cmd::ToggleAttributions {
            selection,
            attributions,
        } => change_attributions(doc, &selection, &attributions, AttributionChange::Toggle),
        Cmd::SetMetadata {
            node_id,
            key,
            value,
        } => {
            let updated = doc.require_node(node_id)?.with_metadata_entry(&key, value);
            doc.replace_node(node_id, updated)?;
            Ok(Patch::new(vec![node_id], None))
        }
        Cmd::PasteText { position, text } => paste_text(doc, &position, &text),
        Cmd::ReplaceNodeText { node_id, text } => {
            set_text(doc, node_id, text)?;
            Ok(Patch::new(vec![node_id], None))
        }
    }
}

fn caret(node_id: NodeId, offset: usize) -> DocumentSelection {
    DocumentSelection::collapsed(DocumentPosition::text(node_id, offset))
}

fn changed_pair(old: NodeId, new: NodeId) -> Vec<NodeId> {
    if old == new { vec![old] } else { vec![old, new] }
}

/// Character offset of `position` inside a text node
fn text_offset(doc: &Document, position: &DocumentPosition) -> EditResult<usize> {
    let node = doc.require_node(position.node_id)?;
    node.require_text()?;
    let resolved = node.resolve_position(&position.node_position)?;
    Ok(resolved.text_offset().unwrap_or(0))
}

fn set_text(doc: &mut Document, node_id: NodeId, text: AttributedText) -> EditResult<()> {
    let updated = doc.require_node(node_id)?.with_text(text)?;
    doc.replace_node(node_id, updated)
}

/// Append `next_id`'s text to `node_id` and remove `next_id`
fn merge_nodes(doc: &mut Document, node_id: NodeId, next_id: NodeId) -> EditResult<()> {
    let next = doc.require_node(next_id)?;
    let merged = doc.require_node(node_id)?.merged_with(next)?;
    doc.replace_node(node_id, merged)?;
    doc.delete_node(next_id)?;
    Ok(())
}

/// Caret for the gap left after removing the node that was at `index`
fn caret_after_removal(
    doc: &mut Document,
    index: usize,
    prefer_upstream: bool,
) -> EditResult<DocumentSelection> {
    let previous = index
        .checked_sub(1)
        .and_then(|i| doc.get_node_at(i))
        .map(|node| DocumentPosition::new(node.id(), node.end_position()));
    let next = doc
        .get_node_at(index)
        .map(|node| DocumentPosition::new(node.id(), node.beginning_position()));
    let position = match (previous, next) {
        (Some(previous), Some(_)) if prefer_upstream => previous,
        (_, Some(next)) => next,
        (Some(previous), None) => previous,
        (None, None) => {
            let paragraph = DocumentNode::paragraph("");
            let id = paragraph.id();
            doc.insert_node_at(0, paragraph)?;
            DocumentPosition::text(id, 0)
        }
    };
    Ok(DocumentSelection::collapsed(position))
}

/// Delete `selection` if it is expanded and return the changed ids and the caret left
/// behind
pub(crate) fn delete_to_caret(
    doc: &mut Document,
    selection: &DocumentSelection,
) -> EditResult<(Vec<NodeId>, DocumentPosition)> {
    if selection.is_collapsed() {
        doc.require_node(selection.base.node_id)?;
        return Ok((Vec::new(), selection.base.clone()));
    }
    let deleted = delete_selection(doc, selection)?;
    let caret = deleted
        .new_selection
        .map(|s| s.extent)
        .ok_or(EditError::IllegalState("deletion produced no caret"))?;
    Ok((deleted.changed, caret))
}

/// `position` if it addresses a text node, otherwise the start of a new empty
/// paragraph placed beside the block node
pub(crate) fn ensure_text_position(
    doc: &mut Document,
    position: DocumentPosition,
) -> EditResult<DocumentPosition> {
    let node = doc.require_node(position.node_id)?;
    if node.is_text() {
        return Ok(position);
    }
    let paragraph = DocumentNode::paragraph("");
    let id = paragraph.id();
    match position.node_position {
        NodePosition::Block(BlockEdge::Upstream) => {
            doc.insert_node_before(position.node_id, paragraph)?
        }
        _ => doc.insert_node_after(position.node_id, paragraph)?,
    }
    Ok(DocumentPosition::text(id, 0))
}

fn insert_text(
    doc: &mut Document,
    position: &DocumentPosition,
    text: &str,
    attributions: &AttributionSet,
) -> EditResult<Patch> {
    let offset = text_offset(doc, position)?;
    let node_id = position.node_id;
    let updated = doc
        .require_node(node_id)?
        .require_text()?
        .insert_string(text, offset, attributions)?;
    set_text(doc, node_id, updated)?;
    Ok(Patch::new(
        vec![node_id],
        Some(caret(node_id, offset + text.chars().count())),
    ))
}

fn delete_selection(doc: &mut Document, selection: &DocumentSelection) -> EditResult<Patch> {
    if selection.is_collapsed() {
        doc.require_node(selection.base.node_id)?;
        return Ok(Patch::unchanged(Some(selection.clone())));
    }
    let (start, end) = selection.normalized(doc)?;

    if start.node_id == end.node_id {
        let node_id = start.node_id;
        let node = doc.require_node(node_id)?;
        let local = node.compute_selection(&start.node_position, &end.node_position)?;
        return match local.text_range() {
            Some(range) => {
                let updated = node.require_text()?.remove_region(range.start, range.end)?;
                set_text(doc, node_id, updated)?;
                Ok(Patch::new(vec![node_id], Some(caret(node_id, range.start))))
            }
            None => {
                let index = doc.require_index(node_id)?;
                doc.delete_node(node_id)?;
                let caret = caret_after_removal(doc, index, true)?;
                Ok(Patch::new(vec![node_id], Some(caret)))
            }
        };
    }

    let start_index = doc.require_index(start.node_id)?;
    let end_index = doc.require_index(end.node_id)?;
    let mut changed: Vec<NodeId> = Vec::new();

    let middle: Vec<NodeId> = (start_index + 1..end_index)
        .filter_map(|i| doc.get_node_at(i).map(DocumentNode::id))
        .collect();
    for id in &middle {
        doc.delete_node(*id)?;
    }
    changed.extend(middle);

    // Trim the head of the last node, or drop it if it is a fully selected block.
    let last = doc.require_node(end.node_id)?;
    let last_is_text = last.is_text();
    if last_is_text {
        let end_offset = text_offset(doc, &end)?;
        let updated = last.require_text()?.remove_region(0, end_offset)?;
        set_text(doc, end.node_id, updated)?;
        changed.push(end.node_id);
    } else if end.node_position == NodePosition::Block(BlockEdge::Downstream) {
        doc.delete_node(end.node_id)?;
        changed.push(end.node_id);
    }
    let last_survives = doc.contains(end.node_id);

    // Trim the tail of the first node, or drop it if it is a fully selected block.
    let first = doc.require_node(start.node_id)?;
    let first_is_text = first.is_text();
    let new_selection = if first_is_text {
        let start_offset = text_offset(doc, &start)?;
        let text = first.require_text()?;
        let updated = text.remove_region(start_offset, text.len())?;
        set_text(doc, start.node_id, updated)?;
        changed.insert(0, start.node_id);
        if last_is_text {
            merge_nodes(doc, start.node_id, end.node_id)?;
        }
        caret(start.node_id, start_offset)
    } else if start.node_position == NodePosition::Block(BlockEdge::Upstream) {
        let index = doc.require_index(start.node_id)?;
        doc.delete_node(start.node_id)?;
        changed.insert(0, start.node_id);
        if last_survives {
            let last = doc.require_node(end.node_id)?;
            DocumentSelection::collapsed(DocumentPosition::new(last.id(), last.beginning_position()))
        } else {
            caret_after_removal(doc, index, false)?
        }
    } else {
        DocumentSelection::collapsed(DocumentPosition::downstream(start.node_id))
    };

    Ok(Patch::new(changed, Some(new_selection)))
}

fn delete_upstream(doc: &mut Document, position: &DocumentPosition) -> EditResult<Patch> {
    let node_id = position.node_id;
    let node = doc.require_node(node_id)?;
    node.resolve_position(&position.node_position)?;
    let unchanged = Patch::unchanged(Some(DocumentSelection::collapsed(position.clone())));

    match node.content() {
        NodeContent::Text { kind, text } => {
            let offset = text_offset(doc, position)?;
            if offset > 0 {
                let updated = text.remove_region(offset - 1, offset)?;
                set_text(doc, node_id, updated)?;
                return Ok(Patch::new(vec![node_id], Some(caret(node_id, offset - 1))));
            }
            if matches!(kind, TextKind::ListItem { .. } | TextKind::Quote) {
                let new_id = NodeId::new();
                let converted = node.converted_to(TextKind::Paragraph, new_id)?;
                doc.replace_node(node_id, converted)?;
                return Ok(Patch::new(vec![node_id, new_id], Some(caret(new_id, 0))));
            }
            let Some(previous) = doc.get_node_before(node_id) else {
                return Ok(unchanged);
            };
            let previous_id = previous.id();
            match previous.text() {
                Some(previous_text) => {
                    let boundary = previous_text.len();
                    merge_nodes(doc, previous_id, node_id)?;
                    Ok(Patch::new(
                        vec![previous_id, node_id],
                        Some(caret(previous_id, boundary)),
                    ))
                }
                None => {
                    doc.delete_node(previous_id)?;
                    Ok(Patch::new(vec![previous_id], unchanged.new_selection))
                }
            }
        }
        NodeContent::Divider | NodeContent::Media { .. } => match position.node_position {
            NodePosition::Block(BlockEdge::Downstream) => {
                let index = doc.require_index(node_id)?;
                doc.delete_node(node_id)?;
                let caret = caret_after_removal(doc, index, true)?;
                Ok(Patch::new(vec![node_id], Some(caret)))
            }
            _ => {
                let Some(previous) = doc.get_node_before(node_id) else {
                    return Ok(unchanged);
                };
                if previous.is_text() {
                    let end = DocumentPosition::new(previous.id(), previous.end_position());
                    return Ok(Patch::unchanged(Some(DocumentSelection::collapsed(end))));
                }
                let previous_id = previous.id();
                doc.delete_node(previous_id)?;
                Ok(Patch::new(vec![previous_id], unchanged.new_selection))
            }
        },
    }
}

fn delete_downstream(doc: &mut Document, position: &DocumentPosition) -> EditResult<Patch> {
    let node_id = position.node_id;
    let node = doc.require_node(node_id)?;
    node.resolve_position(&position.node_position)?;
    let unchanged = Patch::unchanged(Some(DocumentSelection::collapsed(position.clone())));

    match node.content() {
        NodeContent::Text { text, .. } => {
            let offset = text_offset(doc, position)?;
            if offset < text.len() {
                let updated = text.remove_region(offset, offset + 1)?;
                set_text(doc, node_id, updated)?;
                return Ok(Patch::new(vec![node_id], Some(caret(node_id, offset))));
            }
            let Some(next) = doc.get_node_after(node_id) else {
                return Ok(unchanged);
            };
            let next_id = next.id();
            if next.is_text() {
                merge_nodes(doc, node_id, next_id)?;
                Ok(Patch::new(vec![node_id, next_id], Some(caret(node_id, offset))))
            } else {
                doc.delete_node(next_id)?;
                Ok(Patch::new(vec![next_id], unchanged.new_selection))
            }
        }
        NodeContent::Divider | NodeContent::Media { .. } => match position.node_position {
            NodePosition::Block(BlockEdge::Upstream) => {
                let index = doc.require_index(node_id)?;
                doc.delete_node(node_id)?;
                let caret = caret_after_removal(doc, index, false)?;
                Ok(Patch::new(vec![node_id], Some(caret)))
            }
            _ => {
                let Some(next) = doc.get_node_after(node_id) else {
                    return Ok(unchanged);
                };
                if next.is_text() {
                    let start = DocumentPosition::new(next.id(), next.beginning_position());
                    return Ok(Patch::unchanged(Some(DocumentSelection::collapsed(start))));
                }
                let next_id = next.id();
                doc.delete_node(next_id)?;
                Ok(Patch::new(vec![next_id], unchanged.new_selection))
            }
        },
    }
}

fn split_text_node(
    doc: &mut Document,
    position: &DocumentPosition,
    new_node_id: NodeId,
) -> EditResult<Patch> {
    let node_id = position.node_id;
    let node = doc.require_node(node_id)?;
    node.resolve_position(&position.node_position)?;

    let Some(kind) = node.text_kind() else {
        let paragraph = DocumentNode::paragraph("").with_id(new_node_id);
        return match position.node_position {
            NodePosition::Block(BlockEdge::Upstream) => {
                doc.insert_node_before(node_id, paragraph)?;
                Ok(Patch::new(
                    vec![new_node_id],
                    Some(DocumentSelection::collapsed(position.clone())),
                ))
            }
            _ => {
                doc.insert_node_after(node_id, paragraph)?;
                Ok(Patch::new(vec![new_node_id], Some(caret(new_node_id, 0))))
            }
        };
    };

    // Enter on an empty list item or quote ends the block instead of continuing it.
    let ends_block = matches!(kind, TextKind::ListItem { .. } | TextKind::Quote)
        && node.text().is_some_and(AttributedText::is_empty);
    if ends_block {
        let converted = node.converted_to(TextKind::Paragraph, new_node_id)?;
        doc.replace_node(node_id, converted)?;
        return Ok(Patch::new(
            vec![node_id, new_node_id],
            Some(caret(new_node_id, 0)),
        ));
    }

    let offset = text_offset(doc, position)?;
    let (head, tail) = node.split_at(offset, new_node_id)?;
    doc.replace_node(node_id, head)?;
    doc.insert_node_after(node_id, tail)?;
    Ok(Patch::new(
        vec![node_id, new_node_id],
        Some(caret(new_node_id, 0)),
    ))
}

fn toggle_text_kind(
    doc: &mut Document,
    selection: &DocumentSelection,
    kind: &TextKind,
) -> EditResult<Patch> {
    let targets: Vec<(NodeId, TextKind)> = selection
        .nodes(doc)?
        .into_iter()
        .filter_map(|node| node.text_kind().map(|k| (node.id(), k.clone())))
        .collect();
    if targets.is_empty() {
        return Ok(Patch::unchanged(Some(selection.clone())));
    }

    let same_kind = |existing: &TextKind| {
        std::mem::discriminant(existing) == std::mem::discriminant(kind)
    };
    let target = if targets.iter().all(|(_, existing)| same_kind(existing)) {
        TextKind::Paragraph
    } else {
        kind.clone()
    };

    let mut changed = Vec::new();
    let mut remapped = selection.clone();
    for (node_id, existing) in targets {
        if existing == target {
            continue;
        }
        let new_id = NodeId::new();
        let converted = doc.require_node(node_id)?.converted_to(target.clone(), new_id)?;
        doc.replace_node(node_id, converted)?;
        remapped = remapped.remap_node(node_id, new_id);
        changed.extend([node_id, new_id]);
    }
    Ok(Patch::new(changed, Some(remapped)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributionChange {
    Add,
    Remove,
    Toggle,
}

/// Non-empty character ranges the selection covers in each text node
fn selected_text_ranges(
    doc: &Document,
    selection: &DocumentSelection,
) -> EditResult<Vec<(NodeId, Range<usize>)>> {
    Ok(selection
        .node_selections(doc)?
        .into_iter()
        .filter_map(|(node, local)| {
            local
                .text_range()
                .filter(|range| !range.is_empty())
                .map(|range| (node.id(), range))
        })
        .collect())
}

fn change_attributions(
    doc: &mut Document,
    selection: &DocumentSelection,
    attributions: &AttributionSet,
    change: AttributionChange,
) -> EditResult<Patch> {
    let ranges = selected_text_ranges(doc, selection)?;

    let remove = match change {
        AttributionChange::Add => false,
        AttributionChange::Remove => true,
        AttributionChange::Toggle => {
            !ranges.is_empty()
                && ranges.iter().all(|(node_id, range)| {
                    doc.get_node_by_id(*node_id)
                        .and_then(DocumentNode::text)
                        .is_some_and(|text| {
                            attributions
                                .iter()
                                .all(|a| text.has_attribution_throughout(a, range.clone()))
                        })
                })
        }
    };

    let mut changed = Vec::with_capacity(ranges.len());
    for (node_id, range) in ranges {
        let mut text = doc.require_node(node_id)?.require_text()?.clone();
        for attribution in attributions {
            text = if remove {
                text.remove_attribution(attribution, range.clone())?
            } else {
                text.add_attribution(attribution.clone(), range.clone())?
            };
        }
        set_text(doc, node_id, text)?;
        changed.push(node_id);
    }
    Ok(Patch::new(changed, Some(selection.clone())))
}

fn paste_text(doc: &mut Document, position: &DocumentPosition, text: &str) -> EditResult<Patch> {
    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    if lines.len() == 1 {
        return insert_text(doc, position, &normalized, &AttributionSet::new());
    }

    let node_id = position.node_id;
    let offset = text_offset(doc, position)?;
    let node = doc.require_node(node_id)?;
    let continuation = node
        .text_kind()
        .map(TextKind::continuation)
        .unwrap_or(TextKind::Paragraph);

    let tail_id = NodeId::new();
    let (head, tail) = node.split_at(offset, tail_id)?;
    let empty = AttributionSet::new();

    let head_text = head.require_text()?;
    let head = head.with_text(head_text.insert_string(lines[0], head_text.len(), &empty)?)?;
    doc.replace_node(node_id, head)?;

    let mut changed = vec![node_id];
    let mut anchor = node_id;
    for line in &lines[1..lines.len() - 1] {
        let middle = DocumentNode::text_node(continuation.clone(), *line);
        let middle_id = middle.id();
        doc.insert_node_after(anchor, middle)?;
        changed.push(middle_id);
        anchor = middle_id;
    }

    let last_line = lines[lines.len() - 1];
    let tail = tail.with_text(AttributedText::new(last_line).append(tail.require_text()?))?;
    doc.insert_node_after(anchor, tail)?;
    changed.push(tail_id);

    Ok(Patch::new(
        changed,
        Some(caret(tail_id, last_line.chars().count())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeType;
    use crate::text::Attribution;
    use pretty_assertions::assert_eq;

    fn doc_with(nodes: Vec<DocumentNode>) -> (Document, Vec<NodeId>) {
        let ids = nodes.iter().map(|n| n.id()).collect();
        (Document::from_nodes(nodes).unwrap(), ids)
    }

    fn text_of(doc: &Document, id: NodeId) -> String {
        doc.get_node_by_id(id).unwrap().text().unwrap().text().to_string()
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.nodes()
            .map(|n| n.text().map(|t| t.text().to_string()).unwrap_or_else(|| format!("[{}]", n.node_type())))
            .collect()
    }

    #[test]
    fn test_insert_text() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("Hllo")]);
        let patch = doc
            .apply(Cmd::InsertText {
                position: DocumentPosition::text(ids[0], 1),
                text: "e".into(),
                attributions: AttributionSet::new(),
            })
            .unwrap();

        assert_eq!(text_of(&doc, ids[0]), "Hello");
        assert_eq!(patch.new_selection, Some(caret(ids[0], 2)));
        assert_eq!(patch.changed, vec![ids[0]]);
        assert_eq!(patch.version, 1);
    }

    #[test]
    fn test_insert_text_into_block_node_is_unsupported() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::media("cat.png")]);
        let err = doc
            .apply(Cmd::InsertText {
                position: DocumentPosition::downstream(ids[0]),
                text: "x".into(),
                attributions: AttributionSet::new(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            EditError::UnsupportedNodeType {
                id: ids[0],
                found: NodeType::Media
            }
        );
    }

    #[test]
    fn test_command_on_missing_node() {
        let (mut doc, _) = doc_with(vec![DocumentNode::paragraph("a")]);
        let ghost = NodeId::from_u128(77);
        assert_eq!(
            doc.apply(Cmd::MergeWithNext { node_id: ghost }).unwrap_err(),
            EditError::MissingNode(ghost)
        );
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_delete_selection_within_one_node() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("Hello world")]);
        let patch = doc
            .apply(Cmd::DeleteSelection {
                selection: DocumentSelection::new(
                    DocumentPosition::text(ids[0], 11),
                    DocumentPosition::text(ids[0], 5),
                ),
            })
            .unwrap();
        assert_eq!(text_of(&doc, ids[0]), "Hello");
        assert_eq!(patch.new_selection, Some(caret(ids[0], 5)));
    }

    #[test]
    fn test_delete_selection_across_nodes_merges_ends() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("Hello"),
            DocumentNode::divider(),
            DocumentNode::paragraph("middle"),
            DocumentNode::paragraph("world!"),
        ]);
        let patch = doc
            .apply(Cmd::DeleteSelection {
                selection: DocumentSelection::new(
                    DocumentPosition::text(ids[3], 5),
                    DocumentPosition::text(ids[0], 2),
                ),
            })
            .unwrap();

        assert_eq!(texts(&doc), vec!["He!"]);
        assert_eq!(patch.new_selection, Some(caret(ids[0], 2)));
        assert!(!doc.contains(ids[3]));
    }

    #[test]
    fn test_delete_selection_starting_on_block() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::divider(),
            DocumentNode::paragraph("tail text"),
        ]);
        let patch = doc
            .apply(Cmd::DeleteSelection {
                selection: DocumentSelection::new(
                    DocumentPosition::upstream(ids[0]),
                    DocumentPosition::text(ids[1], 5),
                ),
            })
            .unwrap();

        assert_eq!(texts(&doc), vec!["text"]);
        assert_eq!(patch.new_selection, Some(caret(ids[1], 0)));
    }

    #[test]
    fn test_delete_selected_block_alone() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("before"),
            DocumentNode::media("cat.png"),
        ]);
        let patch = doc
            .apply(Cmd::DeleteSelection {
                selection: DocumentSelection::new(
                    DocumentPosition::upstream(ids[1]),
                    DocumentPosition::downstream(ids[1]),
                ),
            })
            .unwrap();
        assert_eq!(texts(&doc), vec!["before"]);
        assert_eq!(patch.new_selection, Some(caret(ids[0], 6)));
    }

    #[test]
    fn test_deleting_only_node_leaves_empty_paragraph() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::divider()]);
        let patch = doc
            .apply(Cmd::DeleteUpstream {
                position: DocumentPosition::downstream(ids[0]),
            })
            .unwrap();
        assert_eq!(texts(&doc), vec![""]);
        let caret_node = patch.new_selection.unwrap().base.node_id;
        assert_eq!(doc.first_node().unwrap().id(), caret_node);
    }

    #[test]
    fn test_backspace_inside_text() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("abc")]);
        let patch = doc
            .apply(Cmd::DeleteUpstream {
                position: DocumentPosition::text(ids[0], 2),
            })
            .unwrap();
        assert_eq!(text_of(&doc, ids[0]), "ac");
        assert_eq!(patch.new_selection, Some(caret(ids[0], 1)));
    }

    #[test]
    fn test_backspace_at_start_merges_into_previous() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("Hello"),
            DocumentNode::paragraph(" world"),
        ]);
        let patch = doc
            .apply(Cmd::DeleteUpstream {
                position: DocumentPosition::text(ids[1], 0),
            })
            .unwrap();
        assert_eq!(texts(&doc), vec!["Hello world"]);
        assert_eq!(patch.new_selection, Some(caret(ids[0], 5)));
    }

    #[test]
    fn test_backspace_at_start_of_list_item_converts_to_paragraph() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::list_item(
            crate::models::ListStyle::Unordered,
            "item",
        )]);
        let patch = doc
            .apply(Cmd::DeleteUpstream {
                position: DocumentPosition::text(ids[0], 0),
            })
            .unwrap();
        let node = doc.first_node().unwrap();
        assert_eq!(node.node_type(), NodeType::Paragraph);
        assert_ne!(node.id(), ids[0]);
        assert_eq!(patch.new_selection, Some(caret(node.id(), 0)));
    }

    #[test]
    fn test_backspace_at_start_after_divider_removes_divider() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::divider(),
            DocumentNode::paragraph("text"),
        ]);
        doc.apply(Cmd::DeleteUpstream {
            position: DocumentPosition::text(ids[1], 0),
        })
        .unwrap();
        assert_eq!(texts(&doc), vec!["text"]);
    }

    #[test]
    fn test_backspace_at_document_start_is_noop() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("text")]);
        let patch = doc
            .apply(Cmd::DeleteUpstream {
                position: DocumentPosition::text(ids[0], 0),
            })
            .unwrap();
        assert!(patch.is_noop());
        assert_eq!(patch.new_selection, Some(caret(ids[0], 0)));
    }

    #[test]
    fn test_forward_delete_at_end_merges_next() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("ab"),
            DocumentNode::heading(2, "cd"),
        ]);
        let patch = doc
            .apply(Cmd::DeleteDownstream {
                position: DocumentPosition::text(ids[0], 2),
            })
            .unwrap();
        assert_eq!(texts(&doc), vec!["abcd"]);
        assert_eq!(patch.new_selection, Some(caret(ids[0], 2)));

        doc.apply(Cmd::DeleteDownstream {
            position: DocumentPosition::text(ids[0], 0),
        })
        .unwrap();
        assert_eq!(texts(&doc), vec!["bcd"]);
    }

    #[test]
    fn test_forward_delete_on_block() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("ab"),
            DocumentNode::divider(),
            DocumentNode::paragraph("cd"),
        ]);
        let patch = doc
            .apply(Cmd::DeleteDownstream {
                position: DocumentPosition::upstream(ids[1]),
            })
            .unwrap();
        assert_eq!(texts(&doc), vec!["ab", "cd"]);
        assert_eq!(patch.new_selection, Some(caret(ids[2], 0)));
    }

    #[test]
    fn test_split_list_item_continues_list() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::list_item(
            crate::models::ListStyle::Ordered,
            "onetwo",
        )]);
        let new_id = NodeId::from_u128(10);
        let patch = doc
            .apply(Cmd::SplitTextNode {
                position: DocumentPosition::text(ids[0], 3),
                new_node_id: new_id,
            })
            .unwrap();

        assert_eq!(texts(&doc), vec!["one", "two"]);
        assert_eq!(
            doc.get_node_by_id(new_id).unwrap().node_type(),
            NodeType::ListItem
        );
        assert_eq!(patch.new_selection, Some(caret(new_id, 0)));
        assert_eq!(patch.changed, vec![ids[0], new_id]);
    }

    #[test]
    fn test_split_empty_quote_ends_quote() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::quote("said"),
            DocumentNode::quote(""),
        ]);
        let new_id = NodeId::from_u128(11);
        doc.apply(Cmd::SplitTextNode {
            position: DocumentPosition::text(ids[1], 0),
            new_node_id: new_id,
        })
        .unwrap();

        assert_eq!(doc.len(), 2);
        assert!(!doc.contains(ids[1]));
        assert_eq!(
            doc.get_node_by_id(new_id).unwrap().node_type(),
            NodeType::Paragraph
        );
    }

    #[test]
    fn test_split_at_block_inserts_paragraph() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::divider()]);
        let after = NodeId::from_u128(1);
        doc.apply(Cmd::SplitTextNode {
            position: DocumentPosition::downstream(ids[0]),
            new_node_id: after,
        })
        .unwrap();
        let before = NodeId::from_u128(2);
        let patch = doc
            .apply(Cmd::SplitTextNode {
                position: DocumentPosition::upstream(ids[0]),
                new_node_id: before,
            })
            .unwrap();

        let order: Vec<_> = doc.nodes().map(DocumentNode::id).collect();
        assert_eq!(order, vec![before, ids[0], after]);
        assert_eq!(
            patch.new_selection,
            Some(DocumentSelection::collapsed(DocumentPosition::upstream(ids[0])))
        );
    }

    #[test]
    fn test_split_is_deterministic_with_captured_id() {
        let (doc, ids) = doc_with(vec![DocumentNode::paragraph("Hello world")]);
        let cmd = Cmd::SplitTextNode {
            position: DocumentPosition::text(ids[0], 5),
            new_node_id: NodeId::from_u128(5),
        };
        let mut first = doc.clone();
        let mut second = doc.clone();
        first.apply(cmd.clone()).unwrap();
        second.apply(cmd).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_with_next() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("ab"),
            DocumentNode::paragraph("cd"),
        ]);
        let patch = doc.apply(Cmd::MergeWithNext { node_id: ids[0] }).unwrap();
        assert_eq!(texts(&doc), vec!["abcd"]);
        assert_eq!(patch.new_selection, Some(caret(ids[0], 2)));

        let patch = doc.apply(Cmd::MergeWithNext { node_id: ids[0] }).unwrap();
        assert!(patch.is_noop());
    }

    #[test]
    fn test_merge_with_block_is_unsupported() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("ab"),
            DocumentNode::divider(),
        ]);
        let before = doc.clone();
        let err = doc.apply(Cmd::MergeWithNext { node_id: ids[0] }).unwrap_err();
        assert_eq!(
            err,
            EditError::UnsupportedNodeType {
                id: ids[1],
                found: NodeType::Divider
            }
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn test_node_level_commands() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("a")]);
        let divider = DocumentNode::divider();
        let divider_id = divider.id();
        doc.apply(Cmd::InsertNode { index: 0, node: divider }).unwrap();
        let media = DocumentNode::media("cat.png");
        let media_id = media.id();
        doc.apply(Cmd::InsertNodeAfter { existing: ids[0], node: media }).unwrap();
        doc.apply(Cmd::MoveNode { node_id: media_id, to_index: 0 }).unwrap();

        let order: Vec<_> = doc.nodes().map(DocumentNode::id).collect();
        assert_eq!(order, vec![media_id, divider_id, ids[0]]);

        let replacement = DocumentNode::paragraph("b");
        let replacement_id = replacement.id();
        let patch = doc
            .apply(Cmd::ReplaceNode { node_id: divider_id, node: replacement })
            .unwrap();
        assert_eq!(patch.changed, vec![divider_id, replacement_id]);

        doc.apply(Cmd::DeleteNode { node_id: media_id }).unwrap();
        assert_eq!(texts(&doc), vec!["b", "a"]);
        assert_eq!(doc.version(), 5);
    }

    #[test]
    fn test_convert_text_node_replaces_id() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("quote me")]);
        let new_id = NodeId::from_u128(9);
        doc.apply(Cmd::ConvertTextNode {
            node_id: ids[0],
            kind: TextKind::Quote,
            new_node_id: new_id,
        })
        .unwrap();
        assert!(!doc.contains(ids[0]));
        let node = doc.get_node_by_id(new_id).unwrap();
        assert_eq!(node.node_type(), NodeType::Quote);
        assert_eq!(node.text().unwrap().text(), "quote me");
    }

    #[test]
    fn test_toggle_text_kind_across_nodes() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("one"),
            DocumentNode::divider(),
            DocumentNode::paragraph("two"),
        ]);
        let selection = DocumentSelection::new(
            DocumentPosition::text(ids[2], 1),
            DocumentPosition::text(ids[0], 1),
        );
        let kind = TextKind::ListItem {
            style: crate::models::ListStyle::Unordered,
            indent: 0,
        };
        let patch = doc
            .apply(Cmd::ToggleTextKind {
                selection: selection.clone(),
                kind: kind.clone(),
            })
            .unwrap();

        let types: Vec<_> = doc.nodes().map(DocumentNode::node_type).collect();
        assert_eq!(types, vec![NodeType::ListItem, NodeType::Divider, NodeType::ListItem]);

        // The suggested selection follows the converted nodes.
        let remapped = patch.new_selection.unwrap();
        assert_eq!(remapped.extent.node_id, doc.first_node().unwrap().id());
        assert_eq!(remapped.base.node_id, doc.last_node().unwrap().id());
        assert_eq!(remapped.base.node_position, selection.base.node_position);

        doc.apply(Cmd::ToggleTextKind { selection: remapped, kind }).unwrap();
        let types: Vec<_> = doc.nodes().map(DocumentNode::node_type).collect();
        assert_eq!(types, vec![NodeType::Paragraph, NodeType::Divider, NodeType::Paragraph]);
    }

    #[test]
    fn test_toggle_attributions_over_selection() {
        let (mut doc, ids) = doc_with(vec![
            DocumentNode::paragraph("Hello"),
            DocumentNode::paragraph("world"),
        ]);
        let selection = DocumentSelection::new(
            DocumentPosition::text(ids[0], 3),
            DocumentPosition::text(ids[1], 2),
        );
        let bold = AttributionSet::from([Attribution::Bold]);
        doc.apply(Cmd::ToggleAttributions {
            selection: selection.clone(),
            attributions: bold.clone(),
        })
        .unwrap();

        let spans = |doc: &Document, id| doc.get_node_by_id(id).unwrap().text().unwrap().spans().spans();
        assert_eq!(spans(&doc, ids[0]), vec![(Attribution::Bold, 3..5)]);
        assert_eq!(spans(&doc, ids[1]), vec![(Attribution::Bold, 0..2)]);

        doc.apply(Cmd::ToggleAttributions {
            selection,
            attributions: bold,
        })
        .unwrap();
        assert!(spans(&doc, ids[0]).is_empty());
        assert!(spans(&doc, ids[1]).is_empty());
    }

    #[test]
    fn test_add_and_remove_attributions() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("Hello")]);
        let selection = DocumentSelection::new(
            DocumentPosition::text(ids[0], 0),
            DocumentPosition::text(ids[0], 5),
        );
        let link = AttributionSet::from([Attribution::Link("https://example.com".into())]);
        doc.apply(Cmd::AddAttributions { selection: selection.clone(), attributions: link.clone() })
            .unwrap();
        let text = doc.get_node_by_id(ids[0]).unwrap().text().unwrap().clone();
        assert_eq!(text.attributions_at(2), link);

        doc.apply(Cmd::RemoveAttributions { selection, attributions: link }).unwrap();
        assert!(doc.get_node_by_id(ids[0]).unwrap().text().unwrap().spans().is_empty());
    }

    #[test]
    fn test_set_metadata_keeps_identity() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("a")]);
        doc.apply(Cmd::SetMetadata {
            node_id: ids[0],
            key: "textAlign".into(),
            value: Some(serde_json::json!("right")),
        })
        .unwrap();
        let node = doc.get_node_by_id(ids[0]).unwrap();
        assert_eq!(node.metadata().get("textAlign"), Some(&serde_json::json!("right")));

        doc.apply(Cmd::SetMetadata {
            node_id: ids[0],
            key: "textAlign".into(),
            value: None,
        })
        .unwrap();
        assert!(doc.get_node_by_id(ids[0]).unwrap().metadata().is_empty());
    }

    #[test]
    fn test_paste_multiple_lines() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("Start|End")]);
        let patch = doc
            .apply(Cmd::PasteText {
                position: DocumentPosition::text(ids[0], 6),
                text: "one\r\ntwo\nthree".into(),
            })
            .unwrap();

        assert_eq!(texts(&doc), vec!["Start|one", "two", "threeEnd"]);
        let last = doc.last_node().unwrap().id();
        assert_eq!(patch.new_selection, Some(caret(last, 5)));
        assert_eq!(patch.changed.len(), 3);
    }

    #[test]
    fn test_paste_failure_leaves_document_untouched() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::paragraph("abc")]);
        let before = doc.clone();
        let err = doc
            .apply(Cmd::PasteText {
                position: DocumentPosition::text(ids[0], 10),
                text: "x\ny".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EditError::OutOfRange { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_replace_selection_over_block_creates_paragraph() {
        let (mut doc, ids) = doc_with(vec![DocumentNode::media("cat.png")]);
        let patch = doc
            .apply(Cmd::ReplaceSelection {
                selection: DocumentSelection::new(
                    DocumentPosition::upstream(ids[0]),
                    DocumentPosition::downstream(ids[0]),
                ),
                text: "meow".into(),
                attributions: AttributionSet::new(),
            })
            .unwrap();
        assert_eq!(texts(&doc), vec!["meow"]);
        let caret_pos = patch.new_selection.unwrap().extent;
        assert_eq!(caret_pos.node_position, NodePosition::Text { offset: 4 });
    }
}
