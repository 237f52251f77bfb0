//! Hybrid input reconciliation.
//!
//! The reconciler turns raw platform edit signals into semantic commands for
//! the external behavior executor, through one of two paths:
//!
//! - **Fast path**: the signal is cancelable and no composition is running.
//!   Classify it against a fixed lookup table, suppress the native mutation,
//!   and issue the command directly. No parse, no diff.
//! - **Slow path**: the platform will mutate (or already mutated) the
//!   surface unilaterally. Let it happen, wait for quiescence, reparse the
//!   surface, diff against the last known snapshot, map the change to
//!   commands, and issue them.
//!
//! The reconciler owns the single mutable mutation buffer and the single
//! last-known snapshot; collaborators only ever receive commands, selection
//! hints, and emitted results.

use std::collections::HashSet;

use smol_str::SmolStr;
use tracing::{debug, trace, warn};
use web_time::Instant;

use stanza_editor_core::{
    Change, Command, DeleteDirection, DeleteUnit, Snapshot, detect_change, plan_commands,
};

use crate::platform::{EditableSurface, ParseHint};
use crate::signal::{Disposition, InputKind, InputSignal, SelectionRange};
use crate::timers::{ReconcilerTiming, TimerKind, Timers};

/// Stateful orchestrator for one editor instance.
///
/// Single-threaded by construction: every method runs to completion on the
/// host's event loop, and suspension only ever happens between calls.
pub struct InputReconciler {
    timing: ReconcilerTiming,
    timers: Timers,
    /// A native mutation is pending reconciliation.
    pending_action: bool,
    /// An IME composition is in progress.
    composing: bool,
    /// Native regions touched since the last successful cycle, used to hint
    /// the reparse past unaffected subtrees.
    mutated_regions: HashSet<SmolStr>,
    /// Baseline for the next diff. Overwritten only after a successful
    /// cycle, so a failed cycle retries from an uncorrupted baseline.
    last_snapshot: Snapshot,
    /// Latest user selection reported by the platform.
    selection: Option<SelectionRange>,
    /// Snapshot captured at composition start: the whole composition is
    /// diffed as one unit against this, not per keystroke.
    composition_baseline: Option<Snapshot>,
    /// Surface state captured synchronously at composition end, before a
    /// re-render can structurally revert the composition's side effects.
    post_composition_parse: Option<Snapshot>,
    in_flush: bool,
    deferred_flush: bool,
}

impl InputReconciler {
    pub fn new(initial: Snapshot, timing: ReconcilerTiming) -> Self {
        Self {
            timing,
            timers: Timers::default(),
            pending_action: false,
            composing: false,
            mutated_regions: HashSet::new(),
            last_snapshot: initial,
            selection: None,
            composition_baseline: None,
            post_composition_parse: None,
            in_flush: false,
            deferred_flush: false,
        }
    }

    /// The diff baseline for the next reconciliation cycle.
    pub fn last_snapshot(&self) -> &Snapshot {
        &self.last_snapshot
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn has_pending_action(&self) -> bool {
        self.pending_action
    }

    /// Earliest armed timer deadline; the host schedules a platform timer
    /// for it and calls [`Self::fire_due`] when it elapses.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Feed back the executor's model state after fast-path commands were
    /// applied, keeping the diff baseline fresh without a surface reparse.
    pub fn sync_snapshot(&mut self, snapshot: Snapshot) {
        self.last_snapshot = snapshot;
    }

    /// Dispatch one raw platform signal.
    pub fn handle_signal(
        &mut self,
        surface: &mut impl EditableSurface,
        signal: InputSignal,
        now: Instant,
    ) -> Disposition {
        match signal {
            InputSignal::BeforeEdit {
                kind,
                cancelable,
                target_range,
                payload,
            } => self.handle_before_edit(surface, kind, cancelable, target_range, payload, now),

            InputSignal::CompositionStart => {
                trace!("composition start");
                // Settle any pending native edit first so the composition
                // baseline is not contaminated by it.
                if self.pending_action {
                    self.flush(surface, now);
                }
                self.composing = true;
                self.composition_baseline = Some(self.last_snapshot.clone());
                Disposition::PassThrough
            }

            InputSignal::CompositionEnd => {
                trace!("composition end");
                self.composing = false;
                // Reparse synchronously: a subsequent re-render may revert
                // the composition's native side effects, so the flush must
                // consume this cached state instead of a live reparse.
                let records = surface.drain_pending_mutations();
                self.mutated_regions
                    .extend(records.into_iter().map(|r| r.region));
                let hint = self.parse_hint();
                self.post_composition_parse = Some(surface.parse_snapshot(&hint));
                self.pending_action = true;
                self.timers.arm(
                    TimerKind::CompositionSettle,
                    now + self.timing.composition_settle,
                );
                Disposition::PassThrough
            }

            InputSignal::AfterEdit => {
                if self.pending_action && !self.composing {
                    // Reschedule: quiescence is measured from the latest signal.
                    self.timers
                        .arm(TimerKind::IdleFlush, now + self.timing.idle_flush);
                }
                Disposition::PassThrough
            }

            InputSignal::MutationBatch(records) => {
                self.mutated_regions
                    .extend(records.into_iter().map(|r| r.region));
                if !self.composing && !self.in_flush {
                    self.pending_action = true;
                    self.timers
                        .arm(TimerKind::IdleFlush, now + self.timing.idle_flush);
                }
                Disposition::PassThrough
            }

            InputSignal::SelectionChanged(range) => {
                self.selection = Some(range);
                if self.pending_action && !self.composing {
                    // The user moved on; reconcile what happened first.
                    self.flush(surface, now);
                }
                Disposition::PassThrough
            }

            InputSignal::KeyDown { key, .. } => {
                if self.pending_action && !self.composing && is_structural_key(&key) {
                    self.flush(surface, now);
                }
                Disposition::PassThrough
            }
        }
    }

    /// Fire any timers whose deadline has passed.
    pub fn fire_due(&mut self, surface: &mut impl EditableSurface, now: Instant) {
        for kind in self.timers.take_due(now) {
            match kind {
                TimerKind::IdleFlush | TimerKind::CompositionSettle => {
                    if self.pending_action {
                        self.flush(surface, now);
                    }
                }
            }
        }
    }

    fn handle_before_edit(
        &mut self,
        surface: &mut impl EditableSurface,
        kind: InputKind,
        cancelable: bool,
        target_range: Option<stanza_editor_core::SpanRange>,
        payload: Option<String>,
        now: Instant,
    ) -> Disposition {
        // The fast path is only safe when the platform lets us preempt the
        // mutation and no composition is rewriting the surface underneath.
        if cancelable && !self.composing && kind != InputKind::InsertCompositionText {
            if let Some(command) = self.fast_path_command(&kind, target_range, payload) {
                trace!(?command, "fast path");
                if let Err(err) = surface.execute(command) {
                    // Abort without touching the baseline; the next signal
                    // starts a fresh cycle.
                    warn!(%err, "fast-path executor failure, edit dropped");
                }
                return Disposition::Handled;
            }
        }

        trace!(?kind, cancelable, "slow path");
        self.pending_action = true;
        self.timers
            .arm(TimerKind::IdleFlush, now + self.timing.idle_flush);
        Disposition::PassThrough
    }

    /// Fixed signal-subtype lookup table, with two guarded exceptions.
    fn fast_path_command(
        &self,
        kind: &InputKind,
        target_range: Option<stanza_editor_core::SpanRange>,
        payload: Option<String>,
    ) -> Option<Command> {
        let selection_collapsed = self.selection.map(|s| s.is_collapsed()).unwrap_or(true);

        // Exception (a): with a selection to remove, the unit is irrelevant.
        // Any delete variant collapses to a single generic directional delete.
        if kind.is_deletion() && !selection_collapsed {
            return Some(Command::Delete {
                direction: delete_direction(kind),
                unit: DeleteUnit::Character,
            });
        }

        // Exception (b): a character delete whose platform-reported target
        // range spans more than one code unit is an autocorrect/spell-correct
        // signature. Escalate to a range delete over exactly that range, or
        // a multi-character replacement gets corrupted.
        if matches!(
            kind,
            InputKind::DeleteContentBackward | InputKind::DeleteContentForward
        ) {
            if let Some(range) = &target_range {
                if range.to.saturating_sub(range.from) > 1 {
                    return Some(Command::DeleteRange {
                        range: range.clone(),
                        direction: delete_direction(kind),
                    });
                }
            }
        }

        match kind {
            InputKind::InsertText
            | InputKind::InsertFromPaste
            | InputKind::InsertFromDrop
            | InputKind::InsertFromYank => payload.map(|text| Command::InsertText { text }),

            InputKind::InsertParagraph => Some(Command::InsertBreak),
            InputKind::InsertLineBreak => Some(Command::InsertSoftBreak),

            InputKind::DeleteContentBackward => Some(Command::Delete {
                direction: DeleteDirection::Backward,
                unit: DeleteUnit::Character,
            }),
            InputKind::DeleteContentForward => Some(Command::Delete {
                direction: DeleteDirection::Forward,
                unit: DeleteUnit::Character,
            }),
            InputKind::DeleteWordBackward => Some(Command::Delete {
                direction: DeleteDirection::Backward,
                unit: DeleteUnit::Word,
            }),
            InputKind::DeleteWordForward => Some(Command::Delete {
                direction: DeleteDirection::Forward,
                unit: DeleteUnit::Word,
            }),
            InputKind::DeleteSoftLineBackward | InputKind::DeleteHardLineBackward => {
                Some(Command::Delete {
                    direction: DeleteDirection::Backward,
                    unit: DeleteUnit::Line,
                })
            }
            InputKind::DeleteSoftLineForward | InputKind::DeleteHardLineForward => {
                Some(Command::Delete {
                    direction: DeleteDirection::Forward,
                    unit: DeleteUnit::Line,
                })
            }
            // Cut/drag/content deletes act on a selection; collapsed-caret
            // occurrences have nothing to remove and fall through to the
            // slow path along with everything unclassified.
            _ => None,
        }
    }

    fn parse_hint(&self) -> ParseHint {
        ParseHint {
            touched_regions: self.mutated_regions.clone(),
        }
    }

    /// Reconcile one accumulated edit window: reparse, diff, map, apply
    /// selection, issue commands, advance the baseline.
    ///
    /// Non-reentrant: a flush requested while one is executing is deferred
    /// and run immediately after, never concurrently.
    fn flush(&mut self, surface: &mut impl EditableSurface, now: Instant) {
        if self.in_flush {
            self.deferred_flush = true;
            return;
        }
        self.in_flush = true;
        loop {
            self.flush_cycle(surface, now);
            if self.deferred_flush {
                self.deferred_flush = false;
                continue;
            }
            break;
        }
        self.in_flush = false;
    }

    fn flush_cycle(&mut self, surface: &mut impl EditableSurface, _now: Instant) {
        self.pending_action = false;
        self.timers.cancel(TimerKind::IdleFlush);
        self.timers.cancel(TimerKind::CompositionSettle);

        let records = surface.drain_pending_mutations();
        self.mutated_regions
            .extend(records.into_iter().map(|r| r.region));

        let new_snapshot = match self.post_composition_parse.take() {
            Some(cached) => cached,
            None => {
                let hint = self.parse_hint();
                surface.parse_snapshot(&hint)
            }
        };
        let baseline = self
            .composition_baseline
            .take()
            .unwrap_or_else(|| self.last_snapshot.clone());

        let cursor_hint = self.selection.map(|s| s.focus);
        let change = detect_change(&baseline, &new_snapshot, cursor_hint);
        debug!(?change, "flush cycle");

        if change == Change::None {
            // Quiet cycle; the reparse is still the freshest truth.
            self.last_snapshot = new_snapshot;
            self.mutated_regions.clear();
            return;
        }

        // The block-local cursor only means anything inside the changed
        // block; a foreign-block offset would skew direction inference.
        let local_cursor = match (cursor_hint, change.text_block_key()) {
            (Some(offset), Some(changed)) => new_snapshot
                .block_at_global_offset(offset)
                .and_then(|(block, local)| (block.key() == changed).then_some(local)),
            _ => None,
        };
        let plan = plan_commands(&change, local_cursor);

        // Place the caret first so the commands consume exactly the
        // intended content.
        if let Some(point) = &plan.selection_before {
            if !surface.set_selection(point) {
                // Losing a cursor refinement is recoverable; aborting the
                // whole cycle is not.
                trace!(?point, "selection hint unresolvable, skipping");
            }
        }

        for command in plan.commands {
            if let Err(err) = surface.execute(command) {
                warn!(%err, "executor failure, cycle aborted without baseline update");
                return;
            }
        }

        self.last_snapshot = new_snapshot;
        self.mutated_regions.clear();
    }
}

fn delete_direction(kind: &InputKind) -> DeleteDirection {
    match kind {
        InputKind::DeleteContentForward
        | InputKind::DeleteWordForward
        | InputKind::DeleteSoftLineForward
        | InputKind::DeleteHardLineForward => DeleteDirection::Forward,
        _ => DeleteDirection::Backward,
    }
}

/// Keys whose arrival means the previous edit window is over.
fn is_structural_key(key: &str) -> bool {
    matches!(key, "Enter" | "Backspace" | "Delete")
}
