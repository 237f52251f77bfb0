//! Platform abstraction for the editable surface.
//!
//! The reconciler never touches the DOM or the document transform engine
//! directly; it talks to this trait. The browser adapter implements it over
//! the live contenteditable element and the behavior executor, native hosts
//! implement it over their own text stack, and tests implement it with an
//! in-memory mock.

use smol_str::SmolStr;
use std::collections::HashSet;

use stanza_editor_core::{Command, SelectionPoint, Snapshot};

use crate::signal::MutationRecord;

/// Error from the external command executor or surface parser.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SurfaceError {
    /// The opaque behavior executor rejected or failed a command.
    #[error("command execution failed: {0}")]
    Execute(String),
    /// The surface could not be parsed into a snapshot.
    #[error("surface parse failed: {0}")]
    Parse(String),
}

/// Hint passed to the surface parser: which regions the platform touched
/// since the last parse, so unaffected subtrees can be skipped.
#[derive(Debug, Clone, Default)]
pub struct ParseHint {
    pub touched_regions: HashSet<SmolStr>,
}

impl ParseHint {
    pub fn is_empty(&self) -> bool {
        self.touched_regions.is_empty()
    }
}

/// The editable surface and its command executor, as seen by this core.
///
/// All methods are synchronous: the reconciler runs on the platform's event
/// loop and its ordering guarantees depend on nothing yielding mid-flush.
pub trait EditableSurface {
    /// Parse the live surface into a snapshot. Must not fail: an
    /// unparseable region is represented as best it can be, matching the
    /// parser's own recovery rules.
    fn parse_snapshot(&mut self, hint: &ParseHint) -> Snapshot;

    /// Move the surface selection to the given position.
    ///
    /// Returns false when the position cannot be resolved (stale key,
    /// out-of-range offset); the caller skips the update in that case.
    fn set_selection(&mut self, point: &SelectionPoint) -> bool;

    /// Hand a command to the opaque behavior executor.
    fn execute(&mut self, command: Command) -> Result<(), SurfaceError>;

    /// Synchronously drain mutation records that were observed but not yet
    /// delivered as a `MutationBatch` signal. Called before every reparse so
    /// buffered records are accounted for.
    fn drain_pending_mutations(&mut self) -> Vec<MutationRecord>;
}
