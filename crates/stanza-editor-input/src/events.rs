//! Events emitted to external collaborators.
//!
//! The rendering layer and the sync transport subscribe to these; nothing in
//! this core consumes them. Patch payloads are opaque wire data produced by
//! the behavior executor and passed through untouched.

use stanza_editor_core::{SelectionPoint, Snapshot};

/// An opaque patch produced by the behavior executor.
pub type Patch = serde_json::Value;

/// Public event surface of the editor core.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    /// Setup finished; the document is stable and observable.
    Ready,
    /// The editor became editable.
    Editable,
    /// The editor became read-only.
    ReadOnly,
    /// A mutation was committed to the document.
    Mutation {
        patches: Vec<Patch>,
        snapshot: Snapshot,
    },
    /// Patches arrived (local or remote) without a full mutation cycle.
    Patches {
        patches: Vec<Patch>,
        snapshot: Snapshot,
    },
    /// The selection moved.
    Selection { position: SelectionPoint },
}

impl EditorEvent {
    /// Whether this event observes document content and must therefore be
    /// withheld until the document is stable.
    pub fn is_document_event(&self) -> bool {
        matches!(self, Self::Mutation { .. } | Self::Patches { .. })
    }
}
