//! stanza-editor-input: hybrid input reconciliation and editor lifecycle.
//!
//! This crate provides:
//! - `InputSignal` / `InputKind` - platform-agnostic raw edit signals
//! - `EditableSurface` - the seam to the DOM parser and command executor
//! - `InputReconciler` - fast/slow path dispatch and the flush cycle
//! - `EditorStateMachine` - setup, read-only/editable, event buffering
//!
//! The pure document model and diffing live in `stanza-editor-core`; this
//! crate owns all mutable state and all timing.

pub mod events;
pub mod platform;
pub mod reconciler;
pub mod signal;
pub mod state;
pub mod timers;

pub use events::{EditorEvent, Patch};
pub use platform::{EditableSurface, ParseHint, SurfaceError};
pub use reconciler::InputReconciler;
pub use signal::{
    Disposition, InputKind, InputSignal, Modifiers, MutationRecord, SelectionRange,
    parse_input_kind,
};
pub use state::{
    BUSY_POLL_INTERVAL, EditMode, EditableState, EditorStateMachine, FocusPhase, HostIntent,
    LifecycleSignal, PristinePhase, Setup, ValueSync, Writing,
};
pub use timers::{ReconcilerTiming, TimerKind, Timers};
