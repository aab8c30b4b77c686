use serde::{Deserialize, Serialize};

use crate::error::EditResult;
use crate::ime::diff::DiffOp;
use crate::text::{AttributedText, AttributionSet};

/// A full-text value exchanged with an out-of-process input source, with the caret
/// as a character offset into `text`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteTextValue {
    pub text: String,
    pub caret: usize,
}

impl RemoteTextValue {
    pub fn new(text: impl Into<String>, caret: usize) -> Self {
        Self {
            text: text.into(),
            caret,
        }
    }
}

/// A remote value with every sentinel occurrence removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedText {
    pub text: String,
    /// Caret moved back by the sentinel characters that preceded it
    pub caret: usize,
    /// Whether at least one sentinel was found
    pub had_sentinel: bool,
}

/// Remove `sentinel` from `value`, translating the caret into the stripped text.
///
/// With no sentinel the text passes through and `had_sentinel` is `false`.
pub fn strip_sentinel(value: &RemoteTextValue, sentinel: Option<&str>) -> StrippedText {
    let total = value.text.chars().count();
    let Some(sentinel) = sentinel.filter(|s| !s.is_empty()) else {
        return StrippedText {
            text: value.text.clone(),
            caret: value.caret.min(total),
            had_sentinel: false,
        };
    };

    let sentinel_chars = sentinel.chars().count();
    let mut text = String::with_capacity(value.text.len());
    let mut caret = value.caret.min(total);
    let mut had_sentinel = false;
    let mut consumed = 0;
    let mut rest = value.text.as_str();

    while let Some(byte) = rest.find(sentinel) {
        let before = &rest[..byte];
        text.push_str(before);
        let at = consumed + before.chars().count();
        if at < value.caret {
            caret -= sentinel_chars.min(value.caret - at);
        }
        consumed = at + sentinel_chars;
        rest = &rest[byte + sentinel.len()..];
        had_sentinel = true;
    }
    text.push_str(rest);

    StrippedText {
        text,
        caret,
        had_sentinel,
    }
}

/// One primitive edit made to the attributed text, with the offset it applied at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Delete { offset: usize, text: String },
    Insert { offset: usize, text: String },
}

/// Apply an edit script to `text`, left to right over the evolving value.
///
/// Deletes leave the running offset in place; inserts take the attributions of the
/// character just before the insertion point and advance past the inserted text.
pub fn apply_diff(
    text: &AttributedText,
    ops: &[DiffOp],
) -> EditResult<(AttributedText, Vec<TextEdit>)> {
    let mut current = text.clone();
    let mut offset = 0;
    let mut edits = Vec::new();

    for op in ops {
        match op {
            DiffOp::Equal(len) => offset += len,
            DiffOp::Delete(removed) => {
                let len = removed.chars().count();
                current = current.remove_region(offset, offset + len)?;
                log::trace!("remote delete {removed:?} at {offset}");
                edits.push(TextEdit::Delete {
                    offset,
                    text: removed.clone(),
                });
            }
            DiffOp::Insert(inserted) => {
                let attributions = match offset {
                    0 => AttributionSet::new(),
                    _ => current.attributions_at(offset - 1),
                };
                current = current.insert_string(inserted, offset, &attributions)?;
                log::trace!("remote insert {inserted:?} at {offset}");
                edits.push(TextEdit::Insert {
                    offset,
                    text: inserted.clone(),
                });
                offset += inserted.chars().count();
            }
        }
    }
    Ok((current, edits))
}

/// What the editor did with a reported remote value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTextOutcome {
    /// The text matched what was already known; at most the caret moved
    Unchanged,
    /// The node's text was patched in place
    Patched { ops: Vec<TextEdit> },
    /// The sentinel disappeared: handled as a backspace at the start of the node
    Backspace,
    /// The text contained a newline: handled as a split at the caret
    Newline,
    /// The selection was not a caret in one text node: inserted character by character
    Fallback,
}
