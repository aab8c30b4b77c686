//! # Folio Engine
//!
//! The document core of a rich-text editor: attributed text, an ordered sequence of
//! heterogeneous block nodes, selections spanning several nodes, a command engine that
//! mutates the document in atomic transactions, and reconciliation of text reported by
//! out-of-process input methods.
//!
//! Rendering, hit-testing, gestures and platform IME bridging are left to the host,
//! which reads the public state and drives the engine through [`editing::Cmd`] or the
//! [`editing::Editor`] facade.

pub mod editing;
pub mod error;
pub mod ime;
pub mod models;
pub mod settings;
pub mod text;

// Re-export key types for easier usage
pub use editing::{Cmd, Composer, Document, Editor, Patch};
pub use error::{EditError, EditResult};
pub use models::{DocumentNode, DocumentPosition, DocumentSelection, NodeId};
pub use settings::{EditorSettings, InputPlatform};
pub use text::{AttributedText, Attribution, AttributionSet};
