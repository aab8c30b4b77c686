use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::text::{Attribution, AttributionSet};

/// Which edge of a span a marker delimits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    // End sorts first so a span closing at an offset precedes one opening there.
    End,
    Start,
}

/// One edge of an attribution span at a character offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanMarker {
    pub attribution: Attribution,
    pub offset: usize,
    pub kind: MarkerKind,
}

/// Run-length attribution storage for one piece of text.
///
/// Spans are half-open character ranges. For each attribution the stored ranges are
/// sorted, non-empty and never overlap or touch: adjacent or overlapping ranges of
/// the same attribution are coalesced by every mutating method. Ranges of different
/// attributions may overlap freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SpanEntry>", into = "Vec<SpanEntry>")]
pub struct AttributedSpans {
    spans: BTreeMap<Attribution, Vec<Range<usize>>>,
}

/// Serialized form of one span. Loading goes back through [`AttributedSpans::add`],
/// so stored data is coalesced like any other edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpanEntry {
    attribution: Attribution,
    start: usize,
    end: usize,
}

impl From<Vec<SpanEntry>> for AttributedSpans {
    fn from(entries: Vec<SpanEntry>) -> Self {
        let mut spans = AttributedSpans::new();
        for entry in entries {
            spans.add(entry.attribution, entry.start..entry.end);
        }
        spans
    }
}

impl From<AttributedSpans> for Vec<SpanEntry> {
    fn from(spans: AttributedSpans) -> Self {
        spans
            .spans()
            .into_iter()
            .map(|(attribution, range)| SpanEntry {
                attribution,
                start: range.start,
                end: range.end,
            })
            .collect()
    }
}

impl AttributedSpans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Apply `attribution` over `range`, merging with existing spans of it
    pub fn add(&mut self, attribution: Attribution, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let ranges = self.spans.entry(attribution).or_default();
        ranges.push(range);
        coalesce(ranges);
    }

    /// Remove `attribution` from `range`, splitting spans that straddle it
    pub fn remove(&mut self, attribution: &Attribution, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let Some(ranges) = self.spans.get_mut(attribution) else {
            return;
        };
        let mut kept = Vec::with_capacity(ranges.len() + 1);
        for span in ranges.drain(..) {
            if span.end <= range.start || span.start >= range.end {
                kept.push(span);
                continue;
            }
            if span.start < range.start {
                kept.push(span.start..range.start);
            }
            if span.end > range.end {
                kept.push(range.end..span.end);
            }
        }
        *ranges = kept;
        if ranges.is_empty() {
            self.spans.remove(attribution);
        }
    }

    /// Whether `attribution` covers the character at `offset`
    pub fn has_attribution_at(&self, attribution: &Attribution, offset: usize) -> bool {
        self.spans
            .get(attribution)
            .is_some_and(|ranges| ranges.iter().any(|r| r.contains(&offset)))
    }

    /// Whether `attribution` covers every character of the non-empty `range`
    pub fn covers(&self, attribution: &Attribution, range: Range<usize>) -> bool {
        if range.is_empty() {
            return false;
        }
        self.spans.get(attribution).is_some_and(|ranges| {
            ranges
                .iter()
                .any(|r| r.start <= range.start && r.end >= range.end)
        })
    }

    /// All attributions covering the character at `offset`
    pub fn attributions_at(&self, offset: usize) -> AttributionSet {
        self.spans
            .iter()
            .filter(|(_, ranges)| ranges.iter().any(|r| r.contains(&offset)))
            .map(|(attribution, _)| attribution.clone())
            .collect()
    }

    /// Make room for `len` characters inserted at `offset`.
    ///
    /// Spans starting at or after `offset` move right. Spans strictly enclosing
    /// `offset` grow to cover the inserted text; spans ending exactly at `offset`
    /// are left alone.
    pub fn shift_for_insert(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        for ranges in self.spans.values_mut() {
            for span in ranges.iter_mut() {
                if span.start >= offset {
                    span.start += len;
                    span.end += len;
                } else if span.end > offset {
                    span.end += len;
                }
            }
        }
    }

    /// Drop the characters in `region` and pull later spans left
    pub fn collapse_region(&mut self, region: Range<usize>) {
        if region.is_empty() {
            return;
        }
        let removed = region.len();
        let map = |offset: usize| {
            if offset <= region.start {
                offset
            } else if offset < region.end {
                region.start
            } else {
                offset - removed
            }
        };
        self.spans.retain(|_, ranges| {
            for span in ranges.iter_mut() {
                *span = map(span.start)..map(span.end);
            }
            ranges.retain(|span| !span.is_empty());
            coalesce(ranges);
            !ranges.is_empty()
        });
    }

    /// The spans intersecting `range`, rebased so `range.start` becomes zero
    pub fn slice(&self, range: Range<usize>) -> AttributedSpans {
        let mut sliced = AttributedSpans::new();
        for (attribution, ranges) in &self.spans {
            for span in ranges {
                let start = span.start.max(range.start);
                let end = span.end.min(range.end);
                if start < end {
                    sliced.add(attribution.clone(), start - range.start..end - range.start);
                }
            }
        }
        sliced
    }

    /// Add every span of `other`, shifted right by `offset`
    pub fn append(&mut self, other: &AttributedSpans, offset: usize) {
        for (attribution, ranges) in &other.spans {
            for span in ranges {
                self.add(attribution.clone(), span.start + offset..span.end + offset);
            }
        }
    }

    /// Every span ordered by start offset, then attribution
    pub fn spans(&self) -> Vec<(Attribution, Range<usize>)> {
        let mut all: Vec<_> = self
            .spans
            .iter()
            .flat_map(|(attribution, ranges)| {
                ranges.iter().map(|r| (attribution.clone(), r.clone()))
            })
            .collect();
        all.sort_by(|(a, ra), (b, rb)| (ra.start, ra.end, a).cmp(&(rb.start, rb.end, b)));
        all
    }

    /// The start/end marker form of the spans, ordered by offset
    pub fn markers(&self) -> Vec<SpanMarker> {
        let mut markers: Vec<SpanMarker> = self
            .spans
            .iter()
            .flat_map(|(attribution, ranges)| {
                ranges.iter().flat_map(move |r| {
                    [
                        SpanMarker {
                            attribution: attribution.clone(),
                            offset: r.start,
                            kind: MarkerKind::Start,
                        },
                        SpanMarker {
                            attribution: attribution.clone(),
                            offset: r.end,
                            kind: MarkerKind::End,
                        },
                    ]
                })
            })
            .collect();
        markers.sort_by(|a, b| {
            (a.offset, a.kind, &a.attribution).cmp(&(b.offset, b.kind, &b.attribution))
        });
        markers
    }

    /// Largest end offset of any span
    pub fn max_offset(&self) -> usize {
        self.spans
            .values()
            .filter_map(|ranges| ranges.last().map(|r| r.end))
            .max()
            .unwrap_or(0)
    }

    /// Checks the sorted, non-empty, non-touching rule for every attribution
    pub fn is_normalized(&self) -> bool {
        self.spans.values().all(|ranges| {
            !ranges.is_empty()
                && ranges.iter().all(|r| r.start < r.end)
                && ranges.windows(2).all(|pair| pair[0].end < pair[1].start)
        })
    }
}

/// Sort ranges and merge any that overlap or touch
fn coalesce(ranges: &mut Vec<Range<usize>>) {
    ranges.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges.drain(..) {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    *ranges = merged;
}
