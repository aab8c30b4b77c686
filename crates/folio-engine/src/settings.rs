use serde::{Deserialize, Serialize};

/// Marker prefixed to the text handed to touch-platform input methods, so that a
/// backspace in an otherwise empty node is still visible as a text change
pub const DEFAULT_SENTINEL: &str = "\u{200B}";

/// The kind of input source the editor is embedded with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputPlatform {
    #[default]
    Desktop,
    Touch,
}

/// Behaviour switches injected into the editor by its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    pub platform: InputPlatform,
    pub sentinel: String,
    /// Placed between nodes when a multi-node selection is extracted as text
    pub line_separator: String,
}

impl EditorSettings {
    pub fn touch() -> Self {
        Self {
            platform: InputPlatform::Touch,
            ..Self::default()
        }
    }

    /// The sentinel in effect, `None` on desktop or when configured empty
    pub fn active_sentinel(&self) -> Option<&str> {
        match self.platform {
            InputPlatform::Touch if !self.sentinel.is_empty() => Some(&self.sentinel),
            _ => None,
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            platform: InputPlatform::Desktop,
            sentinel: DEFAULT_SENTINEL.to_string(),
            line_separator: "\n".to_string(),
        }
    }
}
