//! Shared helpers for the integration tests.

use folio_engine::editing::Document;
use folio_engine::models::{DocumentNode, NodeId};
use folio_engine::text::Attribution;

/// Small deterministic xorshift generator so the randomized tests replay exactly
pub struct Rng(u64);

#[allow(dead_code)]
impl Rng {
    pub fn seeded(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `0..=max`
    pub fn up_to(&mut self, max: usize) -> usize {
        (self.next_u64() % (max as u64 + 1)) as usize
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.up_to(items.len() - 1)]
    }

    pub fn text(&mut self, max_len: usize) -> String {
        const ALPHABET: &[char] = &['a', 'b', 'c', ' ', 'é', '漢', '🦀', 'x'];
        let len = self.up_to(max_len);
        (0..len).map(|_| *self.pick(ALPHABET)).collect()
    }

    pub fn attribution(&mut self) -> Attribution {
        self.pick(&[
            Attribution::Bold,
            Attribution::Italic,
            Attribution::Code,
            Attribution::Link("https://example.com".into()),
        ])
        .clone()
    }
}

#[allow(dead_code)]
pub fn document(nodes: Vec<DocumentNode>) -> (Document, Vec<NodeId>) {
    let ids = nodes.iter().map(|n| n.id()).collect();
    (Document::from_nodes(nodes).unwrap(), ids)
}
