use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};
use crate::text::{AttributedSpans, Attribution, AttributionSet};

/// A string paired with its inline attribution spans.
///
/// Values are never edited in place: every editing method returns a new
/// `AttributedText`, which the owning node then replaces wholesale. All offsets are
/// counted in Unicode scalar values (`char`s), not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAttributedText")]
pub struct AttributedText {
    text: String,
    spans: AttributedSpans,
}

/// Unchecked serialized form, validated by [`AttributedText::with_spans`] on load
#[derive(Deserialize)]
struct RawAttributedText {
    text: String,
    spans: AttributedSpans,
}

impl TryFrom<RawAttributedText> for AttributedText {
    type Error = EditError;

    fn try_from(raw: RawAttributedText) -> Result<Self, Self::Error> {
        Self::with_spans(raw.text, raw.spans)
    }
}

impl AttributedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: AttributedSpans::new(),
        }
    }

    /// Pair `text` with existing spans, rejecting spans that run past its end
    pub fn with_spans(text: impl Into<String>, spans: AttributedSpans) -> EditResult<Self> {
        let text = text.into();
        let len = text.chars().count();
        if spans.max_offset() > len {
            return Err(EditError::offset(spans.max_offset(), len));
        }
        Ok(Self { text, spans })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &AttributedSpans {
        &self.spans
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Splice `text` in at `offset`, covering it with `attributions`
    pub fn insert_string(
        &self,
        text: &str,
        offset: usize,
        attributions: &AttributionSet,
    ) -> EditResult<Self> {
        let len = self.len();
        if offset > len {
            return Err(EditError::offset(offset, len));
        }
        let inserted = text.chars().count();

        let byte = self.byte_offset(offset);
        let mut new_text = String::with_capacity(self.text.len() + text.len());
        new_text.push_str(&self.text[..byte]);
        new_text.push_str(text);
        new_text.push_str(&self.text[byte..]);

        let mut spans = self.spans.clone();
        spans.shift_for_insert(offset, inserted);
        for attribution in attributions {
            spans.add(attribution.clone(), offset..offset + inserted);
        }

        Ok(Self {
            text: new_text,
            spans,
        })
    }

    /// Delete the characters in `start..end`
    pub fn remove_region(&self, start: usize, end: usize) -> EditResult<Self> {
        self.check_range(start, end)?;
        let (start_byte, end_byte) = (self.byte_offset(start), self.byte_offset(end));

        let mut text = String::with_capacity(self.text.len() - (end_byte - start_byte));
        text.push_str(&self.text[..start_byte]);
        text.push_str(&self.text[end_byte..]);

        let mut spans = self.spans.clone();
        spans.collapse_region(start..end);
        Ok(Self { text, spans })
    }

    /// Attributions covering the character at `offset`
    pub fn attributions_at(&self, offset: usize) -> AttributionSet {
        self.spans.attributions_at(offset)
    }

    /// Copy `start..end` (or `start..` when `end` is `None`) with rebased spans
    pub fn copy_text(&self, start: usize, end: Option<usize>) -> EditResult<Self> {
        let end = end.unwrap_or_else(|| self.len());
        self.check_range(start, end)?;
        Ok(Self {
            text: self.text[self.byte_offset(start)..self.byte_offset(end)].to_string(),
            spans: self.spans.slice(start..end),
        })
    }

    /// Split into `..offset` and `offset..`
    pub fn split_at(&self, offset: usize) -> EditResult<(Self, Self)> {
        Ok((self.copy_text(0, Some(offset))?, self.copy_text(offset, None)?))
    }

    /// Concatenate `other` after this text, keeping both sets of spans
    pub fn append(&self, other: &AttributedText) -> Self {
        let offset = self.len();
        let mut spans = self.spans.clone();
        spans.append(&other.spans, offset);
        Self {
            text: format!("{}{}", self.text, other.text),
            spans,
        }
    }

    pub fn add_attribution(&self, attribution: Attribution, range: Range<usize>) -> EditResult<Self> {
        self.check_range(range.start, range.end)?;
        let mut spans = self.spans.clone();
        spans.add(attribution, range);
        Ok(Self {
            text: self.text.clone(),
            spans,
        })
    }

    pub fn remove_attribution(
        &self,
        attribution: &Attribution,
        range: Range<usize>,
    ) -> EditResult<Self> {
        self.check_range(range.start, range.end)?;
        let mut spans = self.spans.clone();
        spans.remove(attribution, range);
        Ok(Self {
            text: self.text.clone(),
            spans,
        })
    }

    /// Remove `attribution` if it already covers all of `range`, otherwise apply it
    pub fn toggle_attribution(
        &self,
        attribution: &Attribution,
        range: Range<usize>,
    ) -> EditResult<Self> {
        if self.has_attribution_throughout(attribution, range.clone()) {
            self.remove_attribution(attribution, range)
        } else {
            self.add_attribution(attribution.clone(), range)
        }
    }

    /// Whether every character in the non-empty `range` carries `attribution`
    pub fn has_attribution_throughout(&self, attribution: &Attribution, range: Range<usize>) -> bool {
        self.spans.covers(attribution, range)
    }

    fn check_range(&self, start: usize, end: usize) -> EditResult<()> {
        let len = self.len();
        if end > len {
            return Err(EditError::offset(end, len));
        }
        if start > end {
            return Err(EditError::offset(start, end));
        }
        Ok(())
    }

    fn byte_offset(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len())
    }
}

impl From<&str> for AttributedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for AttributedText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for AttributedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
