//! Wall-clock timed phase.

use std::time::{Duration, Instant};

use crate::sequencer::{Phase, PhaseTick};
use crate::signals::SignalBus;

use super::SignalTap;

/// Completes once a wall-clock duration has elapsed since entry.
///
/// The deadline is re-armed on every entry. Elapsed time is only observed
/// at tick boundaries, so the actual phase length is the configured
/// duration rounded up to the next tick. An operator override completes it
/// early.
pub struct TimedPhase {
    name: String,
    duration: Duration,
    deadline: Option<Instant>,
    alive: bool,
    tap: SignalTap,
}

impl TimedPhase {
    /// Creates a phase that runs for `duration` per visit.
    #[must_use]
    pub fn new(name: impl Into<String>, duration: Duration, bus: SignalBus) -> Self {
        Self {
            name: name.into(),
            duration,
            deadline: None,
            alive: false,
            tap: SignalTap::new(bus),
        }
    }
}

impl Phase for TimedPhase {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn enter(&mut self) {
        self.alive = true;
        self.deadline = Some(Instant::now() + self.duration);
        self.tap.resubscribe();
    }

    fn tick(&mut self) -> PhaseTick {
        if self.tap.forced() {
            self.alive = false;
            return PhaseTick::Complete;
        }
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        if expired {
            self.alive = false;
            PhaseTick::Complete
        } else {
            PhaseTick::Running
        }
    }
}
