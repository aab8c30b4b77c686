//! # Document Snapshot Text
//!
//! A stable, human-readable dump of a document: one line per node with its index,
//! kind, text and metadata, followed by one indented line per attribution span.
//! Node ids are left out so the output only changes when content does, which makes it
//! suitable for snapshot tests and debug logging.

use crate::editing::Document;
use crate::models::{DocumentNode, ListStyle, NodeContent, TextKind};

pub fn format_document(document: &Document) -> String {
    let mut result = String::new();
    for (index, node) in document.nodes().enumerate() {
        result.push_str(&format_node(index, node));
    }
    result
}

fn format_node(index: usize, node: &DocumentNode) -> String {
    let mut result = format!("{index}: ");

    match node.content() {
        NodeContent::Text { kind, text } => {
            result.push_str(&format!("{} {:?}", kind_label(kind), text.text()));
        }
        NodeContent::Divider => result.push_str("divider"),
        NodeContent::Media { source, alt } => {
            result.push_str(&format!("media {source:?}"));
            if let Some(alt) = alt {
                result.push_str(&format!(" alt={alt:?}"));
            }
        }
    }

    if !node.metadata().is_empty() {
        let entries: Vec<String> = node
            .metadata()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        result.push_str(&format!(" [{}]", entries.join(", ")));
    }
    result.push('\n');

    if let Some(text) = node.text() {
        for (attribution, range) in text.spans().spans() {
            result.push_str(&format!("    {attribution} {}..{}\n", range.start, range.end));
        }
    }
    result
}

fn kind_label(kind: &TextKind) -> String {
    match kind {
        TextKind::Paragraph => "paragraph".to_string(),
        TextKind::Heading { level } => format!("heading level={level}"),
        TextKind::ListItem { style, indent } => {
            let style = match style {
                ListStyle::Unordered => "unordered",
                ListStyle::Ordered => "ordered",
            };
            format!("list-item style={style} indent={indent}")
        }
        TextKind::Quote => "quote".to_string(),
    }
}
