//! The phase capability contract.
//!
//! A phase is a leaf unit of experiment content with an alive lifecycle:
//! entered, ticked while alive, exited when it decides it is done. The trial
//! core depends only on this contract and never reaches into a variant's
//! internals — pacing (fixed duration, participant input, operator cue) is
//! entirely the variant's own business.

/// Stable reference to a phase within its owning trial's ordered sequence.
///
/// A `PhaseId` is an index scoped to the trial that issued it; it is the
/// identity used by the completion and goto protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhaseId(pub(crate) usize);

impl PhaseId {
    /// Creates an id for the phase at `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the zero-based index into the trial's phase sequence.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "phase[{}]", self.0)
    }
}

/// Outcome of one phase tick.
///
/// Completion is phase-decided: returning [`Complete`](Self::Complete) is
/// the variant's way of reporting that its own completion condition was met.
/// The trial routes it through its validated completion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTick {
    /// The phase is still running.
    Running,
    /// The phase finished this tick and has exited (no longer alive).
    Complete,
}

/// Capability contract every phase variant implements.
///
/// The trial guarantees the calling discipline: `enter` is invoked exactly
/// once per visit (not-alive → alive), `tick` only while the phase is
/// current, and entry and first tick happen within the same external tick —
/// a phase never goes a full tick without having been entered first.
pub trait Phase: Send {
    /// Stable display name for logs and events.
    fn name(&self) -> &str;

    /// Whether the phase is currently alive (between entry and exit).
    fn is_alive(&self) -> bool;

    /// Transitions not-alive → alive and runs one-time per-visit setup.
    ///
    /// Called again on later visits (one visit per repetition); variants
    /// reset their per-visit pacing state here.
    fn enter(&mut self);

    /// Runs one step of the phase's internal logic.
    ///
    /// Returns [`PhaseTick::Complete`] when the variant's own completion
    /// condition is met; the variant clears its alive flag before doing so.
    fn tick(&mut self) -> PhaseTick;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneShot {
        alive: bool,
    }

    impl Phase for OneShot {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn is_alive(&self) -> bool {
            self.alive
        }

        fn enter(&mut self) {
            self.alive = true;
        }

        fn tick(&mut self) -> PhaseTick {
            self.alive = false;
            PhaseTick::Complete
        }
    }

    #[test]
    fn test_phase_id_index() {
        assert_eq!(PhaseId::new(3).index(), 3);
        assert_eq!(PhaseId::new(3), PhaseId::new(3));
        assert_ne!(PhaseId::new(3), PhaseId::new(4));
    }

    #[test]
    fn test_phase_id_display() {
        assert_eq!(PhaseId::new(2).to_string(), "phase[2]");
    }

    #[test]
    fn test_alive_lifecycle_through_trait_object() {
        let mut phase: Box<dyn Phase> = Box::new(OneShot { alive: false });
        assert!(!phase.is_alive());
        phase.enter();
        assert!(phase.is_alive());
        assert_eq!(phase.tick(), PhaseTick::Complete);
        assert!(!phase.is_alive());
    }
}
