//! Reconciling full-text values reported by out-of-process input methods (virtual
//! keyboards, autocorrect) with the attributed text of the node under the caret.
//!
//! Instead of replacing the whole text, the previously known value and the reported
//! value are diffed and the resulting script is replayed against the attributed text,
//! so styling outside the changed characters survives. The editor-level entry point is
//! `Editor::apply_remote_text`.

pub mod diff;
pub mod reconcile;

pub use diff::{DiffOp, diff_chars, is_identity};
pub use reconcile::{
    RemoteTextOutcome, RemoteTextValue, StrippedText, TextEdit, apply_diff, strip_sentinel,
};
