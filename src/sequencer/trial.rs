//! The trial state machine.
//!
//! A trial owns an ordered sequence of phases, fixed at construction, and
//! steps them one external tick at a time across one or more repetitions.
//! `state` indexes the current phase and ranges over `0..=phase_count`;
//! `state == phase_count` means "all phases in this repetition finished".
//! Completion is a latch: once set, the trial is terminal until restarted.
//!
//! Upward notification is modeled as returned [`TrialEvent`] values the
//! owning block consumes within the same tick.

use tracing::{debug, error, info, warn};

use crate::error::SequenceError;

use super::phase::{Phase, PhaseId, PhaseTick};

/// Notification produced by a trial for its owning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialEvent {
    /// A phase transitioned not-alive → alive and became current.
    PhaseEntered {
        /// The entered phase.
        phase: PhaseId,
    },
    /// A phase reported completion (or a goto jumped the cursor); the block
    /// records this for bookkeeping only.
    PhaseCompleted {
        /// The completed (or goto-targeted) phase.
        phase: PhaseId,
    },
    /// A new repetition began; the phase cursor was reset to 0.
    RepetitionStarted {
        /// The 0-based repetition now running.
        repetition: u32,
    },
    /// The trial reached its terminal state. Emitted exactly once per run.
    Completed,
}

// ============================================================================
// Hooks
// ============================================================================

/// Context handed to trial hooks.
///
/// Hooks may request re-entrant termination via [`end_trial`](Self::end_trial);
/// the trial re-checks its completion latch immediately after every hook
/// invocation, before touching any phase.
#[derive(Debug)]
pub struct HookContext {
    repetition: u32,
    end_requested: bool,
}

impl HookContext {
    const fn new(repetition: u32) -> Self {
        Self {
            repetition,
            end_requested: false,
        }
    }

    /// The 0-based repetition the trial is in (or about to start).
    #[must_use]
    pub const fn repetition(&self) -> u32 {
        self.repetition
    }

    /// Requests that the trial end before any further phase work.
    pub fn end_trial(&mut self) {
        self.end_requested = true;
    }
}

/// Extension hooks invoked at trial lifecycle boundaries.
///
/// All hooks are no-ops by default; concrete experiment logic overrides the
/// ones it cares about. Pre-first-repetition setup is identical to
/// inter-repetition setup: `on_next_repetition` runs once right after
/// `on_trial_begin` and again at every repetition boundary.
pub trait TrialHooks: Send {
    /// Runs when the trial is started, before the first repetition setup.
    fn on_trial_begin(&mut self, _ctx: &mut HookContext) {}

    /// Runs before each repetition (including the first).
    fn on_next_repetition(&mut self, _ctx: &mut HookContext) {}

    /// Runs exactly once when the trial reaches its terminal state.
    fn on_trial_complete(&mut self, _ctx: &mut HookContext) {}
}

/// The default no-op hook set.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl TrialHooks for NoHooks {}

#[derive(Debug, Clone, Copy)]
enum HookKind {
    Begin,
    NextRepetition,
    Complete,
}

// ============================================================================
// Trial
// ============================================================================

/// Stateful sequencer of phases across one or more repetitions.
pub struct Trial {
    name: String,
    phases: Vec<Box<dyn Phase>>,
    /// Pass count; >= 1, or 0 as the sentinel while `endless` is set.
    repetitions: u32,
    endless: bool,
    /// Index of the current phase, `0..=phases.len()`.
    state: usize,
    current_repetition: u32,
    complete: bool,
    started: bool,
    active_phase: Option<PhaseId>,
    hooks: Box<dyn TrialHooks>,
}

impl Trial {
    /// Creates a trial with the default no-op hooks and a single repetition.
    ///
    /// The phase list is structural and fixed for the trial's lifetime;
    /// disabled phases must be excluded by the caller before construction.
    #[must_use]
    pub fn new(name: impl Into<String>, phases: Vec<Box<dyn Phase>>) -> Self {
        Self::with_hooks(name, phases, Box::new(NoHooks))
    }

    /// Creates a trial with custom lifecycle hooks.
    #[must_use]
    pub fn with_hooks(
        name: impl Into<String>,
        phases: Vec<Box<dyn Phase>>,
        hooks: Box<dyn TrialHooks>,
    ) -> Self {
        Self {
            name: name.into(),
            phases,
            repetitions: 1,
            endless: false,
            state: 0,
            current_repetition: 0,
            complete: false,
            started: false,
            active_phase: None,
            hooks,
        }
    }

    /// The trial's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of phases in the (fixed) sequence.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// The current phase cursor, `0..=phase_count`.
    #[must_use]
    pub const fn state(&self) -> usize {
        self.state
    }

    /// The 0-based repetition counter.
    #[must_use]
    pub const fn current_repetition(&self) -> u32 {
        self.current_repetition
    }

    /// Configured pass count (0 while endless).
    #[must_use]
    pub const fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Whether the trial repeats without bound.
    #[must_use]
    pub const fn is_endless(&self) -> bool {
        self.endless
    }

    /// Whether the completion latch is set.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the trial has been started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the trial can be started at all (has at least one phase).
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        !self.phases.is_empty()
    }

    /// The currently tracked alive phase, if any.
    #[must_use]
    pub const fn active_phase(&self) -> Option<PhaseId> {
        self.active_phase
    }

    /// The display name of the phase at `id`, if in range.
    #[must_use]
    pub fn phase_name(&self, id: PhaseId) -> Option<&str> {
        self.phases.get(id.index()).map(|p| p.name())
    }

    /// Sets the pass count, clamping 0 to 1 with a warning.
    ///
    /// A zero pass count is never interpreted as endless; unbounded
    /// repetition is a distinct explicit flag ([`set_endless`](Self::set_endless)).
    pub fn set_repetitions(&mut self, repetitions: u32) {
        if repetitions == 0 {
            warn!(
                trial = %self.name,
                "repetitions 0 clamped to 1; use endless for unbounded trials"
            );
            self.repetitions = 1;
        } else {
            self.repetitions = repetitions;
        }
    }

    /// Sets or clears endless mode.
    ///
    /// Enabling forces `repetitions = 0` as a sentinel and leaves the
    /// repetition counter and phase cursor untouched. Disabling restores a
    /// single pass if the sentinel is still in place.
    pub fn set_endless(&mut self, endless: bool) {
        self.endless = endless;
        if endless {
            self.repetitions = 0;
        } else if self.repetitions == 0 {
            self.repetitions = 1;
        }
    }

    /// Starts (or restarts) the trial.
    ///
    /// Resets the completion latch, phase cursor, and repetition counter,
    /// then runs `on_trial_begin` followed by the first `on_next_repetition`.
    /// If a hook requests termination the trial ends before any phase runs
    /// and the returned events carry the completion notification.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::EmptyTrial`] if the trial has no usable
    /// phases; such trials are deactivated at setup and never started.
    pub fn start(&mut self) -> Result<Vec<TrialEvent>, SequenceError> {
        if self.phases.is_empty() {
            warn!(trial = %self.name, "trial has no usable phases; deactivated");
            return Err(SequenceError::EmptyTrial {
                trial: self.name.clone(),
            });
        }

        self.complete = false;
        self.state = 0;
        self.current_repetition = 0;
        self.active_phase = None;
        self.started = true;
        info!(trial = %self.name, repetitions = self.repetitions, endless = self.endless, "trial started");

        let mut events = Vec::new();
        if self.run_hook(HookKind::Begin) || self.run_hook(HookKind::NextRepetition) {
            self.end_into(&mut events);
        }
        Ok(events)
    }

    /// Advances the trial by one external tick.
    ///
    /// While incomplete: finishes a repetition when the cursor has passed
    /// the last phase (ending the trial or starting the next repetition),
    /// enters the current phase if it is not alive, then ticks it. Entry
    /// and tick happen within the same call when a phase first becomes
    /// current.
    pub fn advance(&mut self) -> Vec<TrialEvent> {
        let mut events = Vec::new();
        if !self.started || self.complete {
            return events;
        }

        if self.state >= self.phases.len() {
            let exhausted = !self.endless
                && self.current_repetition.saturating_add(1) >= self.repetitions;
            if exhausted {
                self.end_into(&mut events);
                return events;
            }

            self.current_repetition = self.current_repetition.saturating_add(1);
            // The hook may end the trial re-entrantly; re-check the latch
            // before touching any phase.
            if self.run_hook(HookKind::NextRepetition) || self.complete {
                self.end_into(&mut events);
                return events;
            }
            self.state = 0;
            debug!(trial = %self.name, repetition = self.current_repetition, "repetition started");
            events.push(TrialEvent::RepetitionStarted {
                repetition: self.current_repetition,
            });
        }

        let id = PhaseId(self.state);
        if !self.phases[self.state].is_alive() {
            self.phases[self.state].enter();
            self.active_phase = Some(id);
            debug!(
                trial = %self.name,
                phase = self.phases[self.state].name(),
                index = self.state,
                "phase entered"
            );
            events.push(TrialEvent::PhaseEntered { phase: id });
        }

        if self.phases[self.state].tick() == PhaseTick::Complete {
            match self.phase_complete(id) {
                Ok(event) => events.push(event),
                // Unreachable from this path; kept for protocol symmetry.
                Err(err) => error!(trial = %self.name, %err, "phase completion rejected"),
            }
        }
        events
    }

    /// Records that `phase` finished.
    ///
    /// The protocol requires `phase` to be the current one; a completion
    /// reported by any other phase is a violation — reported and ignored,
    /// state unchanged, owner not notified. On success the cursor advances
    /// by one; the next phase is entered on the next [`advance`](Self::advance)
    /// tick, not here.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::ProtocolViolation`] for a non-current phase.
    pub fn phase_complete(&mut self, phase: PhaseId) -> Result<TrialEvent, SequenceError> {
        if phase.index() != self.state || self.state >= self.phases.len() {
            error!(
                trial = %self.name,
                expected = self.state,
                got = phase.index(),
                "phase completion from non-current phase ignored"
            );
            return Err(SequenceError::ProtocolViolation {
                context: "phase completion".to_string(),
                expected: self.state,
                got: phase.index(),
            });
        }

        self.state += 1;
        self.active_phase = None;
        debug!(trial = %self.name, phase = %phase, "phase completed");
        Ok(TrialEvent::PhaseCompleted { phase })
    }

    /// Administrative override: moves the cursor directly to `phase`.
    ///
    /// No alive or entry semantics are applied — the target is entered on
    /// the next tick like any other current phase, and any previously alive
    /// phase is simply never ticked again. The owner is notified the same
    /// way as for an organic completion.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::InvalidTarget`] if `phase` is outside this
    /// trial's sequence; state is left unchanged.
    pub fn goto_phase(&mut self, phase: PhaseId) -> Result<TrialEvent, SequenceError> {
        if phase.index() >= self.phases.len() {
            error!(
                trial = %self.name,
                target = phase.index(),
                count = self.phases.len(),
                "goto target out of range"
            );
            return Err(SequenceError::InvalidTarget {
                index: phase.index(),
                count: self.phases.len(),
            });
        }

        self.state = phase.index();
        info!(trial = %self.name, phase = %phase, "goto phase");
        Ok(TrialEvent::PhaseCompleted { phase })
    }

    /// Sets the completion latch.
    ///
    /// Idempotent: the first call clears active-phase tracking, runs
    /// `on_trial_complete`, and returns the completion notification; later
    /// calls return `None` so the owner is notified exactly once. Safe to
    /// call before any phase tick.
    pub fn end(&mut self) -> Option<TrialEvent> {
        if self.complete {
            return None;
        }
        self.complete = true;
        self.active_phase = None;
        let _ = self.run_hook(HookKind::Complete);
        info!(trial = %self.name, repetition = self.current_repetition, "trial complete");
        Some(TrialEvent::Completed)
    }

    fn end_into(&mut self, events: &mut Vec<TrialEvent>) {
        if let Some(event) = self.end() {
            events.push(event);
        }
    }

    /// Runs a hook and reports whether it requested termination.
    fn run_hook(&mut self, kind: HookKind) -> bool {
        let mut ctx = HookContext::new(self.current_repetition);
        match kind {
            HookKind::Begin => self.hooks.on_trial_begin(&mut ctx),
            HookKind::NextRepetition => self.hooks.on_next_repetition(&mut ctx),
            HookKind::Complete => self.hooks.on_trial_complete(&mut ctx),
        }
        ctx.end_requested
    }
}

impl std::fmt::Debug for Trial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trial")
            .field("name", &self.name)
            .field("phase_count", &self.phases.len())
            .field("state", &self.state)
            .field("current_repetition", &self.current_repetition)
            .field("repetitions", &self.repetitions)
            .field("endless", &self.endless)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
