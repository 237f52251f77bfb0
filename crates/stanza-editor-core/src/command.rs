//! Semantic edit commands and the change-to-command mapping.
//!
//! Commands are the closed set of edit intents handed to the external
//! behavior executor. This core treats them as opaque beyond their shape;
//! `plan_commands` is a pure lookup table from a detected `Change` to an
//! ordered command sequence plus a selection hint. Deciding WHEN to run the
//! mapping is the reconciler's job, never the mapper's.

use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::snapshot::{BlockKey, SpanKey};

/// Direction of a deletion, relative to the caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteDirection {
    Backward,
    Forward,
}

/// Granularity of a directional deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteUnit {
    Character,
    Word,
    Line,
}

/// A contiguous range inside one span, in UTF-16 code units of the block's
/// flattened text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRange {
    pub block_key: BlockKey,
    pub span_key: SpanKey,
    pub from: usize,
    pub to: usize,
}

/// A caret position hint: a block and an offset into its flattened text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub block_key: BlockKey,
    pub offset: usize,
}

impl SelectionPoint {
    pub fn new(block_key: impl Into<BlockKey>, offset: usize) -> Self {
        Self {
            block_key: block_key.into(),
            offset,
        }
    }
}

/// A semantic edit intent, executed by the external behavior executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Insert text at the current selection.
    InsertText { text: String },
    /// Insert a paragraph break at the current selection.
    InsertBreak,
    /// Insert a soft line break at the current selection.
    InsertSoftBreak,
    /// Delete one unit in a direction from the current selection.
    Delete {
        direction: DeleteDirection,
        unit: DeleteUnit,
    },
    /// Delete an explicit range.
    DeleteRange {
        range: SpanRange,
        direction: DeleteDirection,
    },
    /// Delete a whole block by key.
    DeleteBlock { block_key: BlockKey },
}

/// Ordered commands for one detected change, plus the selection to apply
/// before issuing them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandPlan {
    pub commands: Vec<Command>,
    pub selection_before: Option<SelectionPoint>,
}

impl CommandPlan {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Map a detected change to commands and a selection hint.
///
/// `cursor_offset` is the caret offset local to the changed block, used only
/// to infer deletion direction. Backward is the default with no hint, since
/// backward deletion is the dominant real-world case.
pub fn plan_commands(change: &Change, cursor_offset: Option<usize>) -> CommandPlan {
    match change {
        Change::None => CommandPlan::default(),

        Change::TextInsert {
            block_key,
            offset,
            text,
            ..
        } => CommandPlan {
            commands: vec![Command::InsertText { text: text.clone() }],
            selection_before: Some(SelectionPoint::new(block_key.clone(), *offset)),
        },

        Change::TextDelete {
            block_key,
            span_key,
            from,
            to,
        } => {
            let direction = match cursor_offset {
                Some(cursor) if cursor <= *from => DeleteDirection::Forward,
                _ => DeleteDirection::Backward,
            };
            let caret = match direction {
                DeleteDirection::Forward => *from,
                DeleteDirection::Backward => *to,
            };
            CommandPlan {
                commands: vec![Command::DeleteRange {
                    range: SpanRange {
                        block_key: block_key.clone(),
                        span_key: span_key.clone(),
                        from: *from,
                        to: *to,
                    },
                    direction,
                }],
                selection_before: Some(SelectionPoint::new(block_key.clone(), caret)),
            }
        }

        Change::TextReplace {
            block_key,
            span_key,
            from,
            to,
            text,
        } => CommandPlan {
            // Delete first so the insertion lands where the old text was.
            commands: vec![
                Command::DeleteRange {
                    range: SpanRange {
                        block_key: block_key.clone(),
                        span_key: span_key.clone(),
                        from: *from,
                        to: *to,
                    },
                    direction: DeleteDirection::Backward,
                },
                Command::InsertText { text: text.clone() },
            ],
            // End of the replaced range, so the delete consumes exactly the
            // intended characters before insertion.
            selection_before: Some(SelectionPoint::new(block_key.clone(), *to)),
        },

        Change::BlockSplit {
            original_block_key,
            split_offset,
            ..
        } => CommandPlan {
            commands: vec![Command::InsertBreak],
            selection_before: Some(SelectionPoint::new(
                original_block_key.clone(),
                *split_offset,
            )),
        },

        Change::BlockMerge {
            surviving_block_key,
            join_offset,
            ..
        } => CommandPlan {
            // A backspace at the seam triggers the same merge the executor
            // performs for a manual backspace at a block boundary.
            commands: vec![Command::Delete {
                direction: DeleteDirection::Backward,
                unit: DeleteUnit::Character,
            }],
            selection_before: Some(SelectionPoint::new(
                surviving_block_key.clone(),
                *join_offset,
            )),
        },

        // Best-effort: without a split match the exact position is unknown.
        Change::BlockInsert { .. } => CommandPlan {
            commands: vec![Command::InsertBreak],
            selection_before: None,
        },

        Change::BlockDelete { block_key, .. } => CommandPlan {
            commands: vec![Command::DeleteBlock {
                block_key: block_key.clone(),
            }],
            selection_before: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_insert_plan() {
        let change = Change::TextInsert {
            block_key: "b1".into(),
            span_key: "s1".into(),
            offset: 4,
            text: "hi".into(),
        };
        let plan = plan_commands(&change, None);
        assert_eq!(plan.commands, vec![Command::InsertText { text: "hi".into() }]);
        assert_eq!(plan.selection_before, Some(SelectionPoint::new("b1", 4)));
    }

    #[test]
    fn test_text_delete_direction_from_cursor() {
        let change = Change::TextDelete {
            block_key: "b1".into(),
            span_key: "s1".into(),
            from: 3,
            to: 5,
        };

        // Cursor at or before `from`: forward delete, caret parks at `from`.
        let plan = plan_commands(&change, Some(3));
        match &plan.commands[0] {
            Command::DeleteRange { direction, .. } => {
                assert_eq!(*direction, DeleteDirection::Forward);
            }
            other => panic!("expected DeleteRange, got {other:?}"),
        }
        assert_eq!(plan.selection_before, Some(SelectionPoint::new("b1", 3)));

        // Cursor after `from`: backward delete, caret parks at `to`.
        let plan = plan_commands(&change, Some(5));
        match &plan.commands[0] {
            Command::DeleteRange { direction, .. } => {
                assert_eq!(*direction, DeleteDirection::Backward);
            }
            other => panic!("expected DeleteRange, got {other:?}"),
        }
        assert_eq!(plan.selection_before, Some(SelectionPoint::new("b1", 5)));

        // No hint: backward is the default.
        let plan = plan_commands(&change, None);
        match &plan.commands[0] {
            Command::DeleteRange { direction, .. } => {
                assert_eq!(*direction, DeleteDirection::Backward);
            }
            other => panic!("expected DeleteRange, got {other:?}"),
        }
    }

    #[test]
    fn test_text_replace_is_delete_then_insert() {
        let change = Change::TextReplace {
            block_key: "b1".into(),
            span_key: "s1".into(),
            from: 1,
            to: 2,
            text: "a".into(),
        };
        let plan = plan_commands(&change, None);
        assert_eq!(plan.commands.len(), 2);
        match &plan.commands[0] {
            Command::DeleteRange { range, .. } => {
                assert_eq!(range.from, 1);
                assert_eq!(range.to, 2);
            }
            other => panic!("expected DeleteRange first, got {other:?}"),
        }
        assert_eq!(plan.commands[1], Command::InsertText { text: "a".into() });
        assert_eq!(plan.selection_before, Some(SelectionPoint::new("b1", 2)));
    }

    #[test]
    fn test_block_split_plan() {
        let change = Change::BlockSplit {
            original_block_key: "b1".into(),
            new_block_key: "b2".into(),
            split_offset: 6,
        };
        let plan = plan_commands(&change, None);
        assert_eq!(plan.commands, vec![Command::InsertBreak]);
        assert_eq!(plan.selection_before, Some(SelectionPoint::new("b1", 6)));
    }

    #[test]
    fn test_block_merge_plan() {
        let change = Change::BlockMerge {
            surviving_block_key: "b1".into(),
            removed_block_key: "b2".into(),
            join_offset: 6,
        };
        let plan = plan_commands(&change, None);
        assert_eq!(
            plan.commands,
            vec![Command::Delete {
                direction: DeleteDirection::Backward,
                unit: DeleteUnit::Character,
            }]
        );
        assert_eq!(plan.selection_before, Some(SelectionPoint::new("b1", 6)));
    }

    #[test]
    fn test_block_insert_has_no_selection_hint() {
        let change = Change::BlockInsert {
            block_key: "b9".into(),
            index: 2,
        };
        let plan = plan_commands(&change, None);
        assert_eq!(plan.commands, vec![Command::InsertBreak]);
        assert_eq!(plan.selection_before, None);
    }

    #[test]
    fn test_block_delete_plan() {
        let change = Change::BlockDelete {
            block_key: "b9".into(),
            index: 0,
        };
        let plan = plan_commands(&change, None);
        assert_eq!(
            plan.commands,
            vec![Command::DeleteBlock {
                block_key: "b9".into(),
            }]
        );
    }

    #[test]
    fn test_no_change_is_empty_plan() {
        let plan = plan_commands(&Change::None, Some(3));
        assert!(plan.is_empty());
        assert_eq!(plan.selection_before, None);
    }
}
