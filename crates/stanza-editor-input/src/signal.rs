//! Raw edit signals consumed by the reconciler.
//!
//! Platform-agnostic representations of the signals an editable surface
//! emits. The `InputKind` vocabulary follows the W3C Input Events
//! specification's `inputType` values; the platform adapter converts its
//! native events into these closed variants before handing them to the
//! reconciler, so nothing downstream branches on raw strings.

use smol_str::SmolStr;
use stanza_editor_core::SpanRange;

/// Semantic intent of a `beforeEdit` signal.
///
/// Based on the W3C Input Events `inputType` vocabulary, abstracted from the
/// event source so native input methods and programmatic edits can produce
/// the same kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    // === Insertion ===
    /// Insert typed text.
    InsertText,
    /// Insert text from IME composition.
    InsertCompositionText,
    /// Insert a soft line break (Shift+Enter).
    InsertLineBreak,
    /// Insert a paragraph break (Enter).
    InsertParagraph,
    /// Insert from paste.
    InsertFromPaste,
    /// Insert from drop.
    InsertFromDrop,
    /// Insert replacement text (spell check / autocorrect).
    InsertReplacementText,
    /// Insert from kill-ring yank.
    InsertFromYank,

    // === Deletion ===
    /// Delete content backward (Backspace).
    DeleteContentBackward,
    /// Delete content forward (Delete key).
    DeleteContentForward,
    /// Delete word backward.
    DeleteWordBackward,
    /// Delete word forward.
    DeleteWordForward,
    /// Delete to soft line boundary backward.
    DeleteSoftLineBackward,
    /// Delete to soft line boundary forward.
    DeleteSoftLineForward,
    /// Delete to hard line boundary backward.
    DeleteHardLineBackward,
    /// Delete to hard line boundary forward.
    DeleteHardLineForward,
    /// Delete by cut.
    DeleteByCut,
    /// Delete by drag.
    DeleteByDrag,
    /// Generic content deletion.
    DeleteContent,

    // === Unknown ===
    /// Unrecognized input kind. Never fast-pathed.
    Unknown(String),
}

impl InputKind {
    /// Whether this kind is a deletion operation.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteContentBackward
                | Self::DeleteContentForward
                | Self::DeleteWordBackward
                | Self::DeleteWordForward
                | Self::DeleteSoftLineBackward
                | Self::DeleteSoftLineForward
                | Self::DeleteHardLineBackward
                | Self::DeleteHardLineForward
                | Self::DeleteByCut
                | Self::DeleteByDrag
                | Self::DeleteContent
        )
    }

    /// Whether this kind is an insertion operation.
    pub fn is_insertion(&self) -> bool {
        matches!(
            self,
            Self::InsertText
                | Self::InsertCompositionText
                | Self::InsertLineBreak
                | Self::InsertParagraph
                | Self::InsertFromPaste
                | Self::InsertFromDrop
                | Self::InsertReplacementText
                | Self::InsertFromYank
        )
    }
}

/// Parse a platform `inputType` string to an `InputKind`.
///
/// Handles the W3C Input Events values as reported by `InputEvent.inputType`.
pub fn parse_input_kind(s: &str) -> InputKind {
    match s {
        "insertText" => InputKind::InsertText,
        "insertCompositionText" => InputKind::InsertCompositionText,
        "insertLineBreak" => InputKind::InsertLineBreak,
        "insertParagraph" => InputKind::InsertParagraph,
        "insertFromPaste" => InputKind::InsertFromPaste,
        "insertFromDrop" => InputKind::InsertFromDrop,
        "insertReplacementText" => InputKind::InsertReplacementText,
        "insertFromYank" => InputKind::InsertFromYank,

        "deleteContentBackward" => InputKind::DeleteContentBackward,
        "deleteContentForward" => InputKind::DeleteContentForward,
        "deleteWordBackward" | "deleteEntireWordBackward" => InputKind::DeleteWordBackward,
        "deleteWordForward" | "deleteEntireWordForward" => InputKind::DeleteWordForward,
        "deleteSoftLineBackward" | "deleteEntireSoftLine" => InputKind::DeleteSoftLineBackward,
        "deleteSoftLineForward" => InputKind::DeleteSoftLineForward,
        "deleteHardLineBackward" => InputKind::DeleteHardLineBackward,
        "deleteHardLineForward" => InputKind::DeleteHardLineForward,
        "deleteByCut" => InputKind::DeleteByCut,
        "deleteByDrag" => InputKind::DeleteByDrag,
        "deleteContent" => InputKind::DeleteContent,

        other => InputKind::Unknown(other.to_string()),
    }
}

/// A record of one native node the platform mutated.
///
/// Opaque to the reconciler beyond identity: it is collected into the
/// touched-region set that hints the reparse to skip unaffected subtrees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationRecord {
    /// Stable identity of the touched native node (the adapter's choice,
    /// typically the enclosing block key).
    pub region: SmolStr,
}

impl MutationRecord {
    pub fn new(region: impl Into<SmolStr>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

/// Current user selection, as global UTF-16 offsets over the flattened
/// document (+1 separator per block boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    /// Where the selection started.
    pub anchor: usize,
    /// Where the caret is now.
    pub focus: usize,
}

impl SelectionRange {
    pub fn caret(offset: usize) -> Self {
        Self {
            anchor: offset,
            focus: offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Modifier key state accompanying a `keyDown` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

/// A raw edit signal from the platform.
///
/// One closed enum for the whole upstream surface, exhaustively matched by
/// the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSignal {
    /// The platform is about to apply an edit. When `cancelable` the host
    /// may still suppress it; otherwise the mutation will happen regardless.
    BeforeEdit {
        kind: InputKind,
        cancelable: bool,
        /// The platform-reported range the edit targets, already converted
        /// to span coordinates by the adapter.
        target_range: Option<SpanRange>,
        /// Text payload (typed text, paste/drop/yank transfer).
        payload: Option<String>,
    },
    /// An IME composition began.
    CompositionStart,
    /// The IME composition ended.
    CompositionEnd,
    /// The platform finished applying its own mutation.
    AfterEdit,
    /// A batch of native mutation records was observed.
    MutationBatch(Vec<MutationRecord>),
    /// The user selection changed.
    SelectionChanged(SelectionRange),
    /// A key went down. Only structural keys matter to the reconciler.
    KeyDown { key: SmolStr, modifiers: Modifiers },
}

/// How the reconciler disposed of a signal.
///
/// Tells the embedding layer whether to suppress the platform's native
/// mutation (`preventDefault`) or let it proceed and reconcile afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fast path taken; suppress the native mutation.
    Handled,
    /// Slow path; let the platform mutate and reconcile later.
    PassThrough,
}
