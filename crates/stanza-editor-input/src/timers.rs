//! Host-driven timer table for the reconciler.
//!
//! There is no background thread: the host arms its own platform timer for
//! `next_deadline()` and calls `fire_due()` when it elapses. Re-arming an
//! already-armed timer replaces its deadline, which is how a fresh signal
//! cancels and reschedules a pending flush.

use web_time::{Duration, Instant};

/// Timing knobs for the reconciler, injected at construction.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerTiming {
    /// How long to wait for further signals before flushing on idle.
    pub idle_flush: Duration,
    /// How long to let a finished composition settle before flushing.
    pub composition_settle: Duration,
}

impl Default for ReconcilerTiming {
    fn default() -> Self {
        Self {
            idle_flush: Duration::from_millis(200),
            composition_settle: Duration::from_millis(50),
        }
    }
}

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    IdleFlush,
    CompositionSettle,
}

/// Armed deadlines, at most one per kind.
#[derive(Debug, Default)]
pub struct Timers {
    idle_flush: Option<Instant>,
    composition_settle: Option<Instant>,
}

impl Timers {
    pub fn arm(&mut self, kind: TimerKind, deadline: Instant) {
        match kind {
            TimerKind::IdleFlush => self.idle_flush = Some(deadline),
            TimerKind::CompositionSettle => self.composition_settle = Some(deadline),
        }
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::IdleFlush => self.idle_flush = None,
            TimerKind::CompositionSettle => self.composition_settle = None,
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::IdleFlush => self.idle_flush.is_some(),
            TimerKind::CompositionSettle => self.composition_settle.is_some(),
        }
    }

    /// Earliest armed deadline, if any. The host schedules one platform
    /// timer for this instant.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.idle_flush, self.composition_settle]
            .into_iter()
            .flatten()
            .min()
    }

    /// Take the timers whose deadline has passed, disarming them.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due = Vec::new();
        if self.idle_flush.is_some_and(|t| t <= now) {
            self.idle_flush = None;
            due.push(TimerKind::IdleFlush);
        }
        if self.composition_settle.is_some_and(|t| t <= now) {
            self.composition_settle = None;
            due.push(TimerKind::CompositionSettle);
        }
        due
    }
}
