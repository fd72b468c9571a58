//! Operator-cued phase: waits for an explicit go-ahead.

use crate::sequencer::{Phase, PhaseTick};
use crate::signals::SignalBus;

use super::SignalTap;

/// Runs until the next operator `NextPhase` cue observed since entry.
///
/// Used for self-paced breaks and instruction screens where the operator
/// decides when the experiment moves on.
pub struct CuedPhase {
    name: String,
    alive: bool,
    tap: SignalTap,
}

impl CuedPhase {
    /// Creates a cue-gated phase.
    #[must_use]
    pub fn new(name: impl Into<String>, bus: SignalBus) -> Self {
        Self {
            name: name.into(),
            alive: false,
            tap: SignalTap::new(bus),
        }
    }
}

impl Phase for CuedPhase {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn enter(&mut self) {
        self.alive = true;
        self.tap.resubscribe();
    }

    fn tick(&mut self) -> PhaseTick {
        if self.tap.forced() {
            self.alive = false;
            PhaseTick::Complete
        } else {
            PhaseTick::Running
        }
    }
}
