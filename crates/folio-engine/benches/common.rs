// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use folio_engine::models::{DocumentNode, ListStyle};
use folio_engine::text::{AttributedText, Attribution};

#[allow(dead_code)]
pub fn generate_sentence_text(sentences: usize) -> String {
    let base = "The quick brown fox jumps over the lazy dog. ";
    base.repeat(sentences)
}

/// A paragraph with a bold run every ten characters
#[allow(dead_code)]
pub fn generate_styled_text(sentences: usize) -> AttributedText {
    let text = generate_sentence_text(sentences);
    let len = text.chars().count();
    let mut styled = AttributedText::new(text);
    for start in (0..len.saturating_sub(5)).step_by(10) {
        styled = styled.add_attribution(Attribution::Bold, start..start + 5).unwrap();
    }
    styled
}

#[allow(dead_code)]
pub fn generate_nodes(count: usize) -> Vec<DocumentNode> {
    (0..count)
        .map(|i| match i % 5 {
            0 => DocumentNode::heading(2, format!("Section {i}")),
            1 => DocumentNode::list_item(ListStyle::Unordered, format!("Item {i}")),
            2 => DocumentNode::divider(),
            3 => DocumentNode::paragraph(generate_styled_text(3)),
            _ => DocumentNode::quote(format!("Quote {i}")),
        })
        .collect()
}
