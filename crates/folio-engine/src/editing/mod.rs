/*!
 * # Editing Core Module
 *
 * The mutable half of the engine: the node sequence, the transaction boundary around
 * every change, the commands built on top of it, and the caller-side state (selection
 * and composing attributions) that drives those commands.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Owner: `Document`
 * - The `Document` owns an ordered list of `DocumentNode`s, unique by `NodeId`
 * - Everything outside the document (selections, layout caches) refers to nodes by id
 * - Nodes are replaced wholesale on edit, never mutated in place
 *
 * ### 2. Transactions
 * - Node mutations are only accepted inside an open transaction
 * - Mutations are staged on a copy of the node list and published on commit
 * - Observers are notified exactly once per commit and never see intermediate state
 * - A failed command discards its staged work, so the document is all-or-nothing
 *
 * ### 3. Command-Based Editing
 * - Every edit is a **Command** (`Cmd` enum) executed by `Document::apply`
 * - One command is one transaction, however many node operations it performs
 * - The returned **Patch** names the touched nodes and suggests the next selection;
 *   applying that suggestion is the caller's decision
 *
 * ### 4. Composer and Editor
 * - The `Composer` holds the nullable selection plus the composing attributions that
 *   the next typed character will carry
 * - The `Editor` ties document, composer and settings together: it turns editing
 *   intents (type, Enter, backspace, paste, remote IME text) into commands and adopts
 *   their suggested selections
 *
 * ## Module Structure
 *
 * - **`document`**: `Document`, transactions and observers
 * - **`commands`**: `Cmd` enum and the command implementations
 * - **`patch`**: Edit result metadata including changed nodes and new selection
 * - **`composer`**: Selection and composing-attribution state with listeners
 * - **`editor`**: `Editor` facade used by hosts
 * - **`snapshot`**: Stable textual dump of a document for tests and debugging
 *
 * ## Usage Pattern
 *
 * ```rust
 * use folio_engine::editing::Editor;
 * use folio_engine::models::{DocumentNode, DocumentPosition, DocumentSelection};
 * use folio_engine::settings::EditorSettings;
 * use folio_engine::text::Attribution;
 *
 * let paragraph = DocumentNode::paragraph("Hello");
 * let id = paragraph.id();
 * let mut editor = Editor::with_nodes(vec![paragraph], EditorSettings::default()).unwrap();
 *
 * // Place the caret, prime bold and type.
 * editor.set_selection(Some(DocumentSelection::collapsed(DocumentPosition::text(id, 5))));
 * editor.toggle_attributions([Attribution::Bold].into()).unwrap();
 * editor.insert_text("!").unwrap();
 *
 * let text = editor.document().get_node_by_id(id).unwrap().text().unwrap().clone();
 * assert_eq!(text.text(), "Hello!");
 * assert!(text.attributions_at(5).contains(&Attribution::Bold));
 * ```
 */

pub mod commands;
pub mod composer;
pub mod document;
pub mod editor;
pub mod patch;
pub mod snapshot;

// Public API re-exports
pub use commands::Cmd;
pub use composer::{Composer, ListenerId};
pub use document::{Document, ObserverId};
pub use editor::Editor;
pub use patch::Patch;
pub use snapshot::format_document;
