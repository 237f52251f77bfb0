//! Editor lifecycle state machine.
//!
//! Supervises setup, read-only/editable transitions, and the event buffer
//! that keeps downstream collaborators from observing document changes
//! before the document has finished its own internal normalization pass.
//!
//! Two charts run in parallel:
//!
//! ```text
//! edit-mode: determining-initial | read-only
//!          | editable { idle, focusing { checking-busy, busy }, dragging-internally }
//! setup:    setting-up
//!         | set-up { value-sync { idle, syncing },
//!                    writing { pristine { idle, normalizing }, dirty } }
//! ```
//!
//! Timer-armed transitions (the focus busy poll) are host-driven, like the
//! reconciler's timers: the host polls at `BUSY_POLL_INTERVAL` until the
//! machine reports the focus side effect may happen.

use tracing::{debug, trace};
use web_time::Duration;

use crate::events::EditorEvent;

/// Fixed interval for polling the surface's operation queue while focusing.
pub const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Focus sequencing: don't focus while a reconciliation flush is still
/// mutating the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusPhase {
    /// Waiting for the first poll of the surface's operation queue.
    CheckingBusy,
    /// The queue was busy; keep polling.
    Busy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditableState {
    Idle,
    Focusing(FocusPhase),
    DraggingInternally,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMode {
    /// Resolves exactly once, to read-only or editable; never reverses on
    /// its own.
    DeterminingInitial,
    ReadOnly,
    Editable(EditableState),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSync {
    Idle,
    Syncing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PristinePhase {
    Idle,
    Normalizing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Writing {
    /// No edit has been observed yet; document events are buffered.
    Pristine(PristinePhase),
    /// At least one edit happened; events flow freely.
    Dirty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setup {
    SettingUp,
    SetUp { value_sync: ValueSync, writing: Writing },
}

/// Lifecycle signals fed into the machine by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleSignal {
    ValueSyncStarted,
    /// The external value sync completed; resolves `determining-initial`.
    ValueSyncFinished,
    NormalizationStarted,
    NormalizationFinished,
    /// The caller toggled the read-only flag after setup.
    ReadOnlyToggled(bool),
    FocusRequested,
    /// One busy-poll tick, with the surface's current queue state.
    BusyPolled { surface_busy: bool },
    DragStarted,
    DragEnded,
}

/// Host intents checked against the read-only allowlist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostIntent {
    Copy,
    ClickSelect,
    Serialize,
    Mutate,
}

/// The editor lifecycle machine.
///
/// `handle` consumes a lifecycle signal and returns the events to deliver to
/// subscribers now; `emit` routes a document event through the buffer.
#[derive(Debug)]
pub struct EditorStateMachine {
    mode: EditMode,
    setup: Setup,
    initial_read_only: bool,
    buffered: Vec<EditorEvent>,
}

impl EditorStateMachine {
    pub fn new(initial_read_only: bool) -> Self {
        Self {
            mode: EditMode::DeterminingInitial,
            setup: Setup::SettingUp,
            initial_read_only,
            buffered: Vec::new(),
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn setup(&self) -> Setup {
        self.setup
    }

    /// Whether the host should currently be running the busy-poll timer.
    pub fn is_awaiting_focus(&self) -> bool {
        matches!(self.mode, EditMode::Editable(EditableState::Focusing(_)))
    }

    /// Whether an incoming intent is accepted in the current mode.
    ///
    /// In read-only mode only the non-mutating allowlist passes; everything
    /// else is rejected by omission (no transition, no emission).
    pub fn accepts(&self, intent: HostIntent) -> bool {
        match self.mode {
            EditMode::ReadOnly | EditMode::DeterminingInitial => matches!(
                intent,
                HostIntent::Copy | HostIntent::ClickSelect | HostIntent::Serialize
            ),
            EditMode::Editable(_) => true,
        }
    }

    /// Feed one lifecycle signal. Returns the events to deliver now.
    pub fn handle(&mut self, signal: LifecycleSignal) -> Vec<EditorEvent> {
        trace!(?signal, mode = ?self.mode, setup = ?self.setup, "lifecycle signal");
        match signal {
            LifecycleSignal::ValueSyncStarted => {
                if let Setup::SetUp { value_sync, .. } = &mut self.setup {
                    *value_sync = ValueSync::Syncing;
                }
                Vec::new()
            }

            LifecycleSignal::ValueSyncFinished => {
                match self.setup {
                    Setup::SettingUp => {
                        self.setup = Setup::SetUp {
                            value_sync: ValueSync::Idle,
                            writing: Writing::Pristine(PristinePhase::Idle),
                        };
                        // determining-initial resolves exactly once.
                        let mode_event = if self.mode == EditMode::DeterminingInitial {
                            if self.initial_read_only {
                                self.mode = EditMode::ReadOnly;
                                Some(EditorEvent::ReadOnly)
                            } else {
                                self.mode = EditMode::Editable(EditableState::Idle);
                                Some(EditorEvent::Editable)
                            }
                        } else {
                            None
                        };
                        debug!(mode = ?self.mode, "setup complete");
                        let mut out = vec![EditorEvent::Ready];
                        out.extend(mode_event);
                        out
                    }
                    Setup::SetUp { writing, .. } => {
                        self.setup = Setup::SetUp {
                            value_sync: ValueSync::Idle,
                            writing,
                        };
                        Vec::new()
                    }
                }
            }

            LifecycleSignal::NormalizationStarted => {
                if let Setup::SetUp {
                    writing: Writing::Pristine(phase),
                    ..
                } = &mut self.setup
                {
                    *phase = PristinePhase::Normalizing;
                }
                Vec::new()
            }

            LifecycleSignal::NormalizationFinished => {
                if let Setup::SetUp {
                    writing: Writing::Pristine(phase),
                    ..
                } = &mut self.setup
                {
                    *phase = PristinePhase::Idle;
                }
                Vec::new()
            }

            LifecycleSignal::ReadOnlyToggled(read_only) => match (self.mode, read_only) {
                (EditMode::Editable(_), true) => {
                    self.mode = EditMode::ReadOnly;
                    vec![EditorEvent::ReadOnly]
                }
                (EditMode::ReadOnly, false) => {
                    self.mode = EditMode::Editable(EditableState::Idle);
                    vec![EditorEvent::Editable]
                }
                // Before determining-initial resolves, only record the wish.
                (EditMode::DeterminingInitial, flag) => {
                    self.initial_read_only = flag;
                    Vec::new()
                }
                _ => Vec::new(),
            },

            LifecycleSignal::FocusRequested => {
                if let EditMode::Editable(EditableState::Idle) = self.mode {
                    self.mode =
                        EditMode::Editable(EditableState::Focusing(FocusPhase::CheckingBusy));
                }
                Vec::new()
            }

            LifecycleSignal::BusyPolled { surface_busy } => {
                if let EditMode::Editable(EditableState::Focusing(_)) = self.mode {
                    if surface_busy {
                        self.mode =
                            EditMode::Editable(EditableState::Focusing(FocusPhase::Busy));
                    } else {
                        // The host performs the focus side effect now.
                        self.mode = EditMode::Editable(EditableState::Idle);
                    }
                }
                Vec::new()
            }

            LifecycleSignal::DragStarted => {
                if let EditMode::Editable(EditableState::Idle) = self.mode {
                    self.mode = EditMode::Editable(EditableState::DraggingInternally);
                }
                Vec::new()
            }

            LifecycleSignal::DragEnded => {
                if let EditMode::Editable(EditableState::DraggingInternally) = self.mode {
                    self.mode = EditMode::Editable(EditableState::Idle);
                }
                Vec::new()
            }
        }
    }

    /// Route a document event through the stability buffer.
    ///
    /// Returns the events to deliver now: nothing while the document is not
    /// yet observable, or the whole buffer the instant the first edit lands
    /// in `writing.pristine.idle` and flips it to `dirty`.
    pub fn emit(&mut self, event: EditorEvent) -> Vec<EditorEvent> {
        if !event.is_document_event() {
            return vec![event];
        }

        match &mut self.setup {
            Setup::SettingUp => {
                self.buffered.push(event);
                Vec::new()
            }
            Setup::SetUp { writing, .. } => match writing {
                Writing::Pristine(PristinePhase::Normalizing) => {
                    // Normalization's own churn; not for observers.
                    self.buffered.push(event);
                    Vec::new()
                }
                Writing::Pristine(PristinePhase::Idle) => {
                    *writing = Writing::Dirty;
                    debug!(buffered = self.buffered.len(), "entering dirty, flushing buffer");
                    let mut out = std::mem::take(&mut self.buffered);
                    out.push(event);
                    out
                }
                Writing::Dirty => vec![event],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stanza_editor_core::{SelectionPoint, Snapshot, text_block};

    fn mutation(text: &str) -> EditorEvent {
        EditorEvent::Mutation {
            patches: vec![serde_json::json!({"op": "set"})],
            snapshot: Snapshot::new(vec![text_block("b1", "s1", text)]),
        }
    }

    #[test]
    fn test_setup_resolves_to_editable() {
        let mut sm = EditorStateMachine::new(false);
        assert_eq!(sm.mode(), EditMode::DeterminingInitial);

        let out = sm.handle(LifecycleSignal::ValueSyncFinished);
        assert_eq!(out, vec![EditorEvent::Ready, EditorEvent::Editable]);
        assert_eq!(sm.mode(), EditMode::Editable(EditableState::Idle));
    }

    #[test]
    fn test_setup_resolves_to_read_only() {
        let mut sm = EditorStateMachine::new(true);
        let out = sm.handle(LifecycleSignal::ValueSyncFinished);
        assert_eq!(out, vec![EditorEvent::Ready, EditorEvent::ReadOnly]);
        assert_eq!(sm.mode(), EditMode::ReadOnly);
    }

    #[test]
    fn test_resolution_happens_once() {
        let mut sm = EditorStateMachine::new(false);
        sm.handle(LifecycleSignal::ValueSyncFinished);
        // A later sync round emits nothing and does not re-resolve.
        sm.handle(LifecycleSignal::ValueSyncStarted);
        let out = sm.handle(LifecycleSignal::ValueSyncFinished);
        assert!(out.is_empty());
        assert_eq!(sm.mode(), EditMode::Editable(EditableState::Idle));
    }

    #[test]
    fn test_events_buffered_until_dirty() {
        let mut sm = EditorStateMachine::new(false);

        // During setting-up: buffered.
        assert!(sm.emit(mutation("a")).is_empty());

        sm.handle(LifecycleSignal::ValueSyncFinished);
        sm.handle(LifecycleSignal::NormalizationStarted);
        // Normalization churn: still buffered.
        assert!(sm.emit(mutation("b")).is_empty());
        sm.handle(LifecycleSignal::NormalizationFinished);

        // First real edit flips pristine -> dirty and flushes everything,
        // in order, with the triggering event last.
        let out = sm.emit(mutation("c"));
        assert_eq!(out, vec![mutation("a"), mutation("b"), mutation("c")]);

        // Dirty: straight through, buffer stays empty.
        assert_eq!(sm.emit(mutation("d")), vec![mutation("d")]);
    }

    #[test]
    fn test_non_document_events_bypass_buffer() {
        let mut sm = EditorStateMachine::new(false);
        let selection = EditorEvent::Selection {
            position: SelectionPoint::new("b1", 3),
        };
        assert_eq!(sm.emit(selection.clone()), vec![selection]);
        // And emitting it did not dirty the document.
        if let Setup::SettingUp = sm.setup() {
        } else {
            panic!("setup must still be in progress");
        }
    }

    #[test]
    fn test_focus_polls_until_surface_quiet() {
        let mut sm = EditorStateMachine::new(false);
        sm.handle(LifecycleSignal::ValueSyncFinished);

        sm.handle(LifecycleSignal::FocusRequested);
        assert_eq!(
            sm.mode(),
            EditMode::Editable(EditableState::Focusing(FocusPhase::CheckingBusy))
        );
        assert!(sm.is_awaiting_focus());

        sm.handle(LifecycleSignal::BusyPolled { surface_busy: true });
        assert_eq!(
            sm.mode(),
            EditMode::Editable(EditableState::Focusing(FocusPhase::Busy))
        );

        sm.handle(LifecycleSignal::BusyPolled {
            surface_busy: false,
        });
        assert_eq!(sm.mode(), EditMode::Editable(EditableState::Idle));
        assert!(!sm.is_awaiting_focus());
    }

    #[test]
    fn test_read_only_allowlist() {
        let mut sm = EditorStateMachine::new(true);
        sm.handle(LifecycleSignal::ValueSyncFinished);

        assert!(sm.accepts(HostIntent::Copy));
        assert!(sm.accepts(HostIntent::ClickSelect));
        assert!(sm.accepts(HostIntent::Serialize));
        assert!(!sm.accepts(HostIntent::Mutate));

        sm.handle(LifecycleSignal::ReadOnlyToggled(false));
        assert!(sm.accepts(HostIntent::Mutate));
    }

    #[test]
    fn test_read_only_toggle_emits_mode_events() {
        let mut sm = EditorStateMachine::new(false);
        sm.handle(LifecycleSignal::ValueSyncFinished);

        let out = sm.handle(LifecycleSignal::ReadOnlyToggled(true));
        assert_eq!(out, vec![EditorEvent::ReadOnly]);
        let out = sm.handle(LifecycleSignal::ReadOnlyToggled(false));
        assert_eq!(out, vec![EditorEvent::Editable]);
        // No-op toggle emits nothing.
        assert!(sm.handle(LifecycleSignal::ReadOnlyToggled(false)).is_empty());
    }

    #[test]
    fn test_toggle_before_resolution_only_records_wish() {
        let mut sm = EditorStateMachine::new(false);
        assert!(sm.handle(LifecycleSignal::ReadOnlyToggled(true)).is_empty());
        let out = sm.handle(LifecycleSignal::ValueSyncFinished);
        assert_eq!(out, vec![EditorEvent::Ready, EditorEvent::ReadOnly]);
    }

    #[test]
    fn test_drag_transitions() {
        let mut sm = EditorStateMachine::new(false);
        sm.handle(LifecycleSignal::ValueSyncFinished);

        sm.handle(LifecycleSignal::DragStarted);
        assert_eq!(
            sm.mode(),
            EditMode::Editable(EditableState::DraggingInternally)
        );
        sm.handle(LifecycleSignal::DragEnded);
        assert_eq!(sm.mode(), EditMode::Editable(EditableState::Idle));
    }
}
