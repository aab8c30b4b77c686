//! Randomized checks over seeded edit sequences.

use folio_engine::editing::Cmd;
use folio_engine::models::{DocumentNode, DocumentPosition, DocumentSelection, NodePosition};
use folio_engine::text::{AttributedText, AttributionSet};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;
use common::Rng;

fn random_attributed_text(rng: &mut Rng) -> AttributedText {
    let mut text = AttributedText::new(rng.text(24));
    for _ in 0..rng.up_to(4) {
        let len = text.len();
        let start = rng.up_to(len);
        let end = start + rng.up_to(len - start);
        text = text.add_attribution(rng.attribution(), start..end).unwrap();
    }
    text
}

#[rstest]
fn insert_then_remove_round_trips(#[values(1, 7, 42, 1234, 98765)] seed: u64) {
    let mut rng = Rng::seeded(seed);
    for _ in 0..200 {
        let original = random_attributed_text(&mut rng);
        let offset = rng.up_to(original.len());
        let inserted = rng.text(6);
        let attributions: AttributionSet = (0..rng.up_to(2)).map(|_| rng.attribution()).collect();

        let grown = original
            .insert_string(&inserted, offset, &attributions)
            .unwrap();
        let restored = grown
            .remove_region(offset, offset + inserted.chars().count())
            .unwrap();

        assert_eq!(restored, original, "insert {inserted:?} at {offset}");
    }
}

#[rstest]
fn spans_never_overlap_or_touch(#[values(3, 11, 2024, 31337)] seed: u64) {
    let mut rng = Rng::seeded(seed);
    let mut text = random_attributed_text(&mut rng);

    for step in 0..500 {
        let len = text.len();
        text = match rng.up_to(4) {
            0 => {
                let offset = rng.up_to(len);
                let attributions: AttributionSet = [rng.attribution()].into();
                text.insert_string(&rng.text(4), offset, &attributions).unwrap()
            }
            1 => {
                let start = rng.up_to(len);
                let end = start + rng.up_to(len - start);
                text.remove_region(start, end).unwrap()
            }
            2 => {
                let start = rng.up_to(len);
                let end = start + rng.up_to(len - start);
                text.add_attribution(rng.attribution(), start..end).unwrap()
            }
            3 => {
                let start = rng.up_to(len);
                let end = start + rng.up_to(len - start);
                text.remove_attribution(&rng.attribution(), start..end).unwrap()
            }
            _ => {
                let start = rng.up_to(len);
                let end = start + rng.up_to(len - start);
                text.toggle_attribution(&rng.attribution(), start..end).unwrap()
            }
        };

        assert!(text.spans().is_normalized(), "step {step}: {:?}", text.spans());
        assert!(text.spans().max_offset() <= text.len(), "step {step}");
    }
}

#[rstest]
fn selection_direction_does_not_matter(#[values(5, 17, 4242)] seed: u64) {
    let mut rng = Rng::seeded(seed);
    let nodes: Vec<DocumentNode> = (0..8)
        .map(|i| match i % 4 {
            2 => DocumentNode::divider(),
            _ => DocumentNode::paragraph(random_attributed_text(&mut rng)),
        })
        .collect();
    let (doc, ids) = common::document(nodes);

    let random_position = |rng: &mut Rng| {
        let id = *rng.pick(&ids);
        let node = doc.get_node_by_id(id).unwrap();
        let position = match node.text() {
            Some(text) => NodePosition::Text {
                offset: rng.up_to(text.len()),
            },
            None => node.beginning_position(),
        };
        DocumentPosition::new(id, position)
    };

    for _ in 0..100 {
        let a = random_position(&mut rng);
        let b = random_position(&mut rng);
        let forward = DocumentSelection::new(a.clone(), b.clone());
        let backward = DocumentSelection::new(b, a);

        let forward_ids: Vec<_> = forward.nodes(&doc).unwrap().iter().map(|n| n.id()).collect();
        let backward_ids: Vec<_> = backward.nodes(&doc).unwrap().iter().map(|n| n.id()).collect();
        assert_eq!(forward_ids, backward_ids);
        assert_eq!(
            forward.extract_text(&doc, "\n").unwrap(),
            backward.extract_text(&doc, "\n").unwrap()
        );
    }
}

#[rstest]
fn random_commands_are_atomic(#[values(8, 99, 555)] seed: u64) {
    let mut rng = Rng::seeded(seed);
    let (mut doc, _) = common::document(vec![
        DocumentNode::paragraph("alpha"),
        DocumentNode::divider(),
        DocumentNode::paragraph("beta"),
    ]);

    for _ in 0..300 {
        let ids: Vec<_> = doc.nodes().map(DocumentNode::id).collect();
        let id = *rng.pick(&ids);
        // Offsets deliberately run past the end of the node sometimes.
        let position = DocumentPosition::text(id, rng.up_to(8));
        let cmd = match rng.up_to(5) {
            0 => Cmd::InsertText {
                position,
                text: rng.text(3),
                attributions: AttributionSet::new(),
            },
            1 => Cmd::DeleteUpstream { position },
            2 => Cmd::DeleteDownstream { position },
            3 => Cmd::split(position),
            4 => Cmd::PasteText {
                position,
                text: format!("{}\n{}", rng.text(3), rng.text(3)),
            },
            _ => Cmd::MergeWithNext { node_id: id },
        };

        let before = doc.clone();
        let version = doc.version();
        match doc.apply(cmd) {
            Ok(patch) => assert_eq!(patch.version, version + 1),
            Err(_) => {
                assert_eq!(doc, before);
                assert_eq!(doc.version(), version);
            }
        }
        assert!(!doc.is_empty());
    }
}
