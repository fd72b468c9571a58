//! Block sequencing: one trial active at a time, in declaration order.
//!
//! A block drives exactly one trial per tick. When the active trial reports
//! completion the block advances to the next trial and starts it; trials
//! with no usable phases are skipped at start with a warning. When the
//! sequence is exhausted the block latches complete and notifies its owner
//! once.

use tracing::{error, info, warn};

use crate::error::SequenceError;

use super::phase::PhaseId;
use super::trial::{Trial, TrialEvent};

/// Stable reference to a trial within its owning block's ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrialId(pub(crate) usize);

impl TrialId {
    /// Creates an id for the trial at `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the zero-based index into the block's trial sequence.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TrialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trial[{}]", self.0)
    }
}

/// Notification produced by a block for its owner (the experiment runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEvent {
    /// A trial became active and was started.
    TrialStarted {
        /// The started trial.
        trial: TrialId,
    },
    /// A phase in the active trial was entered.
    PhaseEntered {
        /// The owning trial.
        trial: TrialId,
        /// The entered phase.
        phase: PhaseId,
    },
    /// A phase in the active trial completed (bookkeeping only).
    PhaseCompleted {
        /// The owning trial.
        trial: TrialId,
        /// The completed phase.
        phase: PhaseId,
    },
    /// The active trial began a new repetition.
    RepetitionStarted {
        /// The owning trial.
        trial: TrialId,
        /// The 0-based repetition now running.
        repetition: u32,
    },
    /// A trial reached its terminal state. Emitted exactly once per trial run.
    TrialCompleted {
        /// The completed trial.
        trial: TrialId,
    },
    /// The block exhausted its trial sequence.
    Completed,
}

/// Ordered sequence of trials, advanced one at a time.
pub struct Block {
    name: String,
    trials: Vec<Trial>,
    /// Index of the active trial; `trials.len()` once exhausted.
    current: usize,
    complete: bool,
    started: bool,
}

impl Block {
    /// Creates a block over a fixed trial sequence.
    #[must_use]
    pub fn new(name: impl Into<String>, trials: Vec<Trial>) -> Self {
        Self {
            name: name.into(),
            trials,
            current: 0,
            complete: false,
            started: false,
        }
    }

    /// The block's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of trials in the sequence.
    #[must_use]
    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    /// Whether the block has exhausted its trial sequence.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the block has been started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// The id of the active trial, if the block is running.
    #[must_use]
    pub fn current_trial(&self) -> Option<TrialId> {
        (self.started && !self.complete && self.current < self.trials.len())
            .then(|| TrialId(self.current))
    }

    /// Shared access to the trial at `id`.
    #[must_use]
    pub fn trial(&self, id: TrialId) -> Option<&Trial> {
        self.trials.get(id.index())
    }

    /// Mutable access to the active trial, for administrative overrides
    /// (goto, forced completion) applied between ticks.
    pub fn active_trial_mut(&mut self) -> Option<&mut Trial> {
        let id = self.current_trial()?;
        self.trials.get_mut(id.index())
    }

    /// Starts (or restarts) the block.
    ///
    /// Begins the first runnable trial; trials that cannot start are
    /// skipped with a warning. An empty (or entirely unrunnable) block
    /// completes immediately.
    pub fn start(&mut self) -> Vec<BlockEvent> {
        self.started = true;
        self.complete = false;
        info!(block = %self.name, trials = self.trials.len(), "block started");
        self.start_from(0)
    }

    /// Advances the active trial by one tick, translating its events and
    /// moving to the next trial when it completes.
    pub fn advance(&mut self) -> Vec<BlockEvent> {
        let mut events = Vec::new();
        if !self.started || self.complete || self.current >= self.trials.len() {
            return events;
        }

        let id = TrialId(self.current);
        let mut finished = false;
        for trial_event in self.trials[self.current].advance() {
            if matches!(trial_event, TrialEvent::Completed) {
                finished = true;
            }
            events.push(Self::translate(id, trial_event));
        }

        if finished {
            events.extend(self.start_from(self.current + 1));
        }
        events
    }

    /// Records that `trial` finished and advances the sequence.
    ///
    /// Mirrors the trial-level completion protocol: `trial` must be the
    /// active one, otherwise the call is a violation — reported and
    /// ignored, sequence unchanged. The trial's completion latch is set
    /// here if an external caller forced the completion; the latch
    /// guarantees the owner notification fires exactly once either way.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::ProtocolViolation`] for a non-active trial.
    pub fn trial_complete(&mut self, trial: TrialId) -> Result<Vec<BlockEvent>, SequenceError> {
        if !self.started
            || self.complete
            || self.current >= self.trials.len()
            || trial.index() != self.current
        {
            error!(
                block = %self.name,
                expected = self.current,
                got = trial.index(),
                "trial completion from non-active trial ignored"
            );
            return Err(SequenceError::ProtocolViolation {
                context: "trial completion".to_string(),
                expected: self.current,
                got: trial.index(),
            });
        }

        let mut events = Vec::new();
        if self.trials[self.current].end().is_some() {
            events.push(BlockEvent::TrialCompleted { trial });
        }
        events.extend(self.start_from(self.current + 1));
        Ok(events)
    }

    /// Advances the cursor to the first runnable trial at or after `index`
    /// and starts it; latches block completion if none remains.
    fn start_from(&mut self, index: usize) -> Vec<BlockEvent> {
        let mut events = Vec::new();
        self.current = index;

        while self.current < self.trials.len() {
            let id = TrialId(self.current);
            match self.trials[self.current].start() {
                Ok(trial_events) => {
                    events.push(BlockEvent::TrialStarted { trial: id });
                    let mut finished = false;
                    for trial_event in trial_events {
                        if matches!(trial_event, TrialEvent::Completed) {
                            finished = true;
                        }
                        events.push(Self::translate(id, trial_event));
                    }
                    if finished {
                        // A begin hook ended the trial; keep moving.
                        self.current += 1;
                        continue;
                    }
                    return events;
                }
                Err(err) => {
                    warn!(block = %self.name, trial = %id, %err, "skipping unrunnable trial");
                    self.current += 1;
                }
            }
        }

        self.complete = true;
        info!(block = %self.name, "block complete");
        events.push(BlockEvent::Completed);
        events
    }

    const fn translate(trial: TrialId, event: TrialEvent) -> BlockEvent {
        match event {
            TrialEvent::PhaseEntered { phase } => BlockEvent::PhaseEntered { trial, phase },
            TrialEvent::PhaseCompleted { phase } => BlockEvent::PhaseCompleted { trial, phase },
            TrialEvent::RepetitionStarted { repetition } => {
                BlockEvent::RepetitionStarted { trial, repetition }
            }
            TrialEvent::Completed => BlockEvent::TrialCompleted { trial },
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("trial_count", &self.trials.len())
            .field("current", &self.current)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}
