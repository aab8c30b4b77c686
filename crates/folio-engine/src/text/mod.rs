//! Inline styling: attributions, their run-length spans, and the attributed text value
//! that text nodes carry.

pub mod attributed_text;
pub mod attribution;
pub mod spans;

pub use attributed_text::AttributedText;
pub use attribution::{Attribution, AttributionSet, EmptyAttributionTag};
pub use spans::{AttributedSpans, MarkerKind, SpanMarker};
