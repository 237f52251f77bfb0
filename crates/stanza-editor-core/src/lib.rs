//! stanza-editor-core: structured document model and pure edit analysis.
//!
//! This crate provides:
//! - `Snapshot` / `Block` / `Span` - the structured document model
//! - `detect_change` - before/after snapshot classification
//! - `plan_commands` - change-to-command mapping with selection hints
//!
//! Everything here is pure and platform-agnostic; the stateful input
//! reconciliation lives in `stanza-editor-input`.

pub mod change;
pub mod command;
pub mod snapshot;

pub use change::{Change, detect_change};
pub use command::{
    Command, CommandPlan, DeleteDirection, DeleteUnit, SelectionPoint, SpanRange, plan_commands,
};
pub use smol_str::SmolStr;
pub use snapshot::{
    Block, BlockKey, Child, InlineObject, ObjectBlock, Snapshot, Span, SpanKey, TextBlock,
    text_block,
};
