//! Input-driven phase: paced by participant responses.

use crate::sequencer::{Phase, PhaseTick};
use crate::signals::{Signal, SignalBus};

use super::SignalTap;

/// Completes after a number of participant `Input` signals observed since
/// entry.
///
/// Resubscribes on entry, so responses given before the phase became
/// current never count. An operator override completes it regardless of
/// how many responses have arrived.
pub struct InputPhase {
    name: String,
    required: u32,
    seen: u32,
    alive: bool,
    tap: SignalTap,
}

impl InputPhase {
    /// Creates a phase that waits for `required` responses (at least 1).
    #[must_use]
    pub fn new(name: impl Into<String>, required: u32, bus: SignalBus) -> Self {
        Self {
            name: name.into(),
            required: required.max(1),
            seen: 0,
            alive: false,
            tap: SignalTap::new(bus),
        }
    }

    /// Responses observed since the current entry.
    #[must_use]
    pub const fn responses_seen(&self) -> u32 {
        self.seen
    }
}

impl Phase for InputPhase {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn enter(&mut self) {
        self.alive = true;
        self.seen = 0;
        self.tap.resubscribe();
    }

    fn tick(&mut self) -> PhaseTick {
        let mut forced = false;
        for signal in self.tap.drain() {
            match signal {
                Signal::Input { .. } => self.seen = self.seen.saturating_add(1),
                Signal::NextPhase => forced = true,
                Signal::TrialStarted { .. } | Signal::PhaseStarted { .. } => {}
            }
        }
        if forced || self.seen >= self.required {
            self.alive = false;
            PhaseTick::Complete
        } else {
            PhaseTick::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waits_for_required_responses() {
        let bus = SignalBus::new();
        let mut phase = InputPhase::new("response", 2, bus.clone());
        phase.enter();
        assert_eq!(phase.tick(), PhaseTick::Running);
        bus.input("left");
        assert_eq!(phase.tick(), PhaseTick::Running);
        bus.input("right");
        assert_eq!(phase.tick(), PhaseTick::Complete);
        assert!(!phase.is_alive());
    }

    #[test]
    fn test_multiple_responses_in_one_tick() {
        let bus = SignalBus::new();
        let mut phase = InputPhase::new("response", 2, bus.clone());
        phase.enter();
        bus.input("a");
        bus.input("b");
        assert_eq!(phase.tick(), PhaseTick::Complete);
    }

    #[test]
    fn test_pre_entry_responses_ignored() {
        let bus = SignalBus::new();
        let mut phase = InputPhase::new("response", 1, bus.clone());
        bus.input("early");
        phase.enter();
        assert_eq!(phase.tick(), PhaseTick::Running);
    }

    #[test]
    fn test_count_resets_each_visit() {
        let bus = SignalBus::new();
        let mut phase = InputPhase::new("response", 1, bus.clone());
        phase.enter();
        bus.input("x");
        phase.tick();
        phase.enter();
        assert_eq!(phase.responses_seen(), 0);
        assert_eq!(phase.tick(), PhaseTick::Running);
    }

    #[test]
    fn test_operator_override_completes_without_responses() {
        let bus = SignalBus::new();
        let mut phase = InputPhase::new("response", 5, bus.clone());
        phase.enter();
        bus.force_next_phase();
        assert_eq!(phase.tick(), PhaseTick::Complete);
    }
}
