//! Fixed-tick phase: deterministic pacing by tick count.

use crate::sequencer::{Phase, PhaseTick};
use crate::signals::SignalBus;

use super::SignalTap;

/// Completes after a fixed number of ticks per visit.
///
/// The counter resets on every entry, so the phase runs its full count in
/// each repetition. An operator override completes it early.
pub struct FixedPhase {
    name: String,
    ticks: u32,
    elapsed: u32,
    alive: bool,
    tap: SignalTap,
}

impl FixedPhase {
    /// Creates a phase that runs for `ticks` ticks (at least 1).
    #[must_use]
    pub fn new(name: impl Into<String>, ticks: u32, bus: SignalBus) -> Self {
        Self {
            name: name.into(),
            ticks: ticks.max(1),
            elapsed: 0,
            alive: false,
            tap: SignalTap::new(bus),
        }
    }
}

impl Phase for FixedPhase {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn enter(&mut self) {
        self.alive = true;
        self.elapsed = 0;
        self.tap.resubscribe();
    }

    fn tick(&mut self) -> PhaseTick {
        if self.tap.forced() {
            self.alive = false;
            return PhaseTick::Complete;
        }
        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed >= self.ticks {
            self.alive = false;
            PhaseTick::Complete
        } else {
            PhaseTick::Running
        }
    }
}
