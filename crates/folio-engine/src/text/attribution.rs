use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An inline style tag applied over a range of text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribution {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    /// Hyperlink; two links with different urls are different attributions
    Link(String),
    /// Any other tag, e.g. `heading:2` or `mention`
    Named(String),
}

/// The attributions applied to a single character or queued for the next insertion
pub type AttributionSet = BTreeSet<Attribution>;

impl fmt::Display for Attribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribution::Bold => write!(f, "bold"),
            Attribution::Italic => write!(f, "italic"),
            Attribution::Underline => write!(f, "underline"),
            Attribution::Strikethrough => write!(f, "strikethrough"),
            Attribution::Code => write!(f, "code"),
            Attribution::Link(url) => write!(f, "link:{url}"),
            Attribution::Named(tag) => write!(f, "{tag}"),
        }
    }
}

/// Error returned when parsing an empty attribution tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("attribution tag must not be empty")]
pub struct EmptyAttributionTag;

impl FromStr for Attribution {
    type Err = EmptyAttributionTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(EmptyAttributionTag);
        }
        Ok(match tag {
            "bold" => Attribution::Bold,
            "italic" => Attribution::Italic,
            "underline" => Attribution::Underline,
            "strikethrough" => Attribution::Strikethrough,
            "code" => Attribution::Code,
            other => match other.strip_prefix("link:") {
                Some(url) => Attribution::Link(url.to_string()),
                None => Attribution::Named(other.to_string()),
            },
        })
    }
}
