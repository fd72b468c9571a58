//! Per-frame experiment driver.
//!
//! The runner owns the built blocks, the signal bus, and the event emitter.
//! `step()` is one external tick: advance the active block, translate its
//! events into the JSONL stream and bus notifications, and move to the next
//! block when one completes. `run()` wraps `step()` in a tokio interval loop
//! with cooperative cancellation.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ExperimentConfig;
use crate::error::ConfigError;
use crate::observability::{Event, EventEmitter, RunSummary, StopReason};
use crate::phases::PhaseRegistry;
use crate::phases::registry::parse_duration;
use crate::sequencer::{Block, BlockEvent, Trial};
use crate::signals::{Signal, SignalBus};

/// Default tick interval when neither the definition nor the CLI sets one.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Drives an experiment one tick at a time.
pub struct ExperimentRunner {
    experiment: String,
    run_id: String,
    blocks: Vec<Block>,
    current: usize,
    bus: SignalBus,
    /// The runner's own bus subscription, for override accounting.
    tap: Option<broadcast::Receiver<Signal>>,
    emitter: EventEmitter,
    tick_interval: Duration,
    started_at: Option<Instant>,
    started: bool,
    complete: bool,
    ticks: u64,
    trials_completed: u64,
    phases_completed: u64,
    overrides: u64,
}

impl ExperimentRunner {
    /// Builds a runner from a validated, normalized definition.
    ///
    /// Every enabled phase is constructed through `registry`; the trial and
    /// block structure mirrors the definition order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a phase cannot be built — loading
    /// validates the same way, so this only fires for definitions that
    /// bypassed [`crate::config::load`].
    pub fn from_config(
        config: &ExperimentConfig,
        registry: &PhaseRegistry,
        bus: SignalBus,
        emitter: EventEmitter,
    ) -> Result<Self, ConfigError> {
        let mut blocks = Vec::with_capacity(config.blocks.len());
        for (b, block_spec) in config.blocks.iter().enumerate() {
            let mut trials = Vec::with_capacity(block_spec.trials.len());
            for (t, trial_spec) in block_spec.trials.iter().enumerate() {
                let mut phases = Vec::new();
                for (p, phase_spec) in trial_spec.phases.iter().enumerate() {
                    if phase_spec.disabled {
                        continue;
                    }
                    let location = format!("blocks[{b}].trials[{t}].phases[{p}]");
                    phases.push(registry.build(phase_spec, &bus, &location)?);
                }
                let mut trial = Trial::new(trial_spec.name.clone(), phases);
                if trial_spec.endless {
                    trial.set_endless(true);
                } else {
                    trial.set_repetitions(trial_spec.repetitions);
                }
                trials.push(trial);
            }
            blocks.push(Block::new(block_spec.name.clone(), trials));
        }

        let tick_interval = match &config.experiment.tick_interval {
            Some(raw) => parse_duration(raw, "experiment")?,
            None => DEFAULT_TICK_INTERVAL,
        };

        Ok(Self {
            experiment: config.experiment.name.clone(),
            run_id: Uuid::new_v4().to_string(),
            blocks,
            current: 0,
            bus,
            tap: None,
            emitter,
            tick_interval,
            started_at: None,
            started: false,
            complete: false,
            ticks: 0,
            trials_completed: 0,
            phases_completed: 0,
            overrides: 0,
        })
    }

    /// This run's unique id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The configured tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Overrides the tick interval (CLI flag wins over the definition).
    pub const fn set_tick_interval(&mut self, interval: Duration) {
        self.tick_interval = interval;
    }

    /// Whether every block has run to completion.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// External ticks driven so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The signal bus shared with the built phases.
    #[must_use]
    pub const fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Starts the run: emits the start event and begins the first block.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.started_at = Some(Instant::now());
        self.tap = Some(self.bus.subscribe());
        info!(experiment = %self.experiment, run_id = %self.run_id, "experiment started");
        self.emitter.emit(Event::ExperimentStarted {
            timestamp: Utc::now(),
            experiment: self.experiment.clone(),
            run_id: self.run_id.clone(),
            blocks: self.blocks.len(),
        });
        self.start_block(0);
    }

    /// Drives one external tick.
    pub fn step(&mut self) {
        if !self.started {
            self.start();
        }
        if self.complete {
            return;
        }
        self.ticks += 1;
        self.observe_overrides();
        let events = self.blocks[self.current].advance();
        let finished = self.process_events(self.current, &events);
        if finished {
            self.start_block(self.current + 1);
        }
    }

    /// Runs the tick loop until completion or cancellation.
    pub async fn run(&mut self, cancel: CancellationToken) -> StopReason {
        self.start();
        if self.complete {
            return StopReason::Completed;
        }

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(run_id = %self.run_id, "run cancelled");
                    self.finish(StopReason::Interrupted);
                    return StopReason::Interrupted;
                }
                _ = interval.tick() => {
                    self.step();
                    if self.complete {
                        return StopReason::Completed;
                    }
                }
            }
        }
    }

    /// Broadcasts the operator "force next phase" override.
    ///
    /// Accounting happens when the next tick observes the signal, so
    /// overrides published directly on the bus are recorded the same way.
    pub fn force_next_phase(&self) {
        self.bus.force_next_phase();
    }

    /// Broadcasts a participant input value.
    pub fn participant_input(&self, value: impl Into<String>) {
        self.bus.input(value);
    }

    /// Records overrides published on the bus since the last tick.
    fn observe_overrides(&mut self) {
        let mut commands: Vec<&'static str> = Vec::new();
        if let Some(rx) = self.tap.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(Signal::NextPhase) => commands.push("next"),
                    Ok(Signal::Input { .. }) => commands.push("input"),
                    Ok(Signal::TrialStarted { .. } | Signal::PhaseStarted { .. }) => {}
                    Err(TryRecvError::Lagged(_)) => {}
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }
        for command in commands {
            self.overrides += 1;
            self.emitter.emit(Event::OverrideReceived {
                timestamp: Utc::now(),
                command: command.to_owned(),
            });
        }
    }

    /// Starts the block at `index`, skipping any that complete immediately;
    /// finishes the run when the sequence is exhausted.
    fn start_block(&mut self, index: usize) {
        self.current = index;
        while self.current < self.blocks.len() {
            let name = self.blocks[self.current].name().to_owned();
            self.emitter.emit(Event::BlockStarted {
                timestamp: Utc::now(),
                block: name,
            });
            let events = self.blocks[self.current].start();
            let finished = self.process_events(self.current, &events);
            if !finished {
                return;
            }
            self.current += 1;
        }
        self.finish(StopReason::Completed);
    }

    /// Translates block events into the JSONL stream and bus notifications.
    /// Returns whether the block completed.
    fn process_events(&mut self, block_index: usize, events: &[BlockEvent]) -> bool {
        let block_name = self.blocks[block_index].name().to_owned();
        let mut finished = false;
        for event in events {
            match *event {
                BlockEvent::TrialStarted { trial } => {
                    let Some(t) = self.blocks[block_index].trial(trial) else {
                        continue;
                    };
                    let trial_name = t.name().to_owned();
                    self.emitter.emit(Event::TrialStarted {
                        timestamp: Utc::now(),
                        block: block_name.clone(),
                        trial: trial_name.clone(),
                        repetitions: t.repetitions(),
                        endless: t.is_endless(),
                    });
                    self.bus.publish(Signal::TrialStarted {
                        block: block_name.clone(),
                        trial: trial_name,
                    });
                }
                BlockEvent::PhaseEntered { trial, phase } => {
                    let Some(t) = self.blocks[block_index].trial(trial) else {
                        continue;
                    };
                    let trial_name = t.name().to_owned();
                    let phase_name = t.phase_name(phase).unwrap_or("?").to_owned();
                    self.emitter.emit(Event::PhaseEntered {
                        timestamp: Utc::now(),
                        trial: trial_name.clone(),
                        phase: phase_name.clone(),
                        phase_index: phase.index(),
                    });
                    self.bus.publish(Signal::PhaseStarted {
                        trial: trial_name,
                        phase: phase_name,
                    });
                }
                BlockEvent::PhaseCompleted { trial, phase } => {
                    self.phases_completed += 1;
                    let trial_name = self.blocks[block_index]
                        .trial(trial)
                        .map_or("?", Trial::name)
                        .to_owned();
                    self.emitter.emit(Event::PhaseCompleted {
                        timestamp: Utc::now(),
                        trial: trial_name,
                        phase_index: phase.index(),
                    });
                }
                BlockEvent::RepetitionStarted { trial, repetition } => {
                    let trial_name = self.blocks[block_index]
                        .trial(trial)
                        .map_or("?", Trial::name)
                        .to_owned();
                    self.emitter.emit(Event::RepetitionStarted {
                        timestamp: Utc::now(),
                        trial: trial_name,
                        repetition,
                    });
                }
                BlockEvent::TrialCompleted { trial } => {
                    self.trials_completed += 1;
                    let trial_name = self.blocks[block_index]
                        .trial(trial)
                        .map_or("?", Trial::name)
                        .to_owned();
                    self.emitter.emit(Event::TrialCompleted {
                        timestamp: Utc::now(),
                        block: block_name.clone(),
                        trial: trial_name,
                    });
                }
                BlockEvent::Completed => {
                    finished = true;
                    debug!(block = %block_name, "block finished");
                    self.emitter.emit(Event::BlockCompleted {
                        timestamp: Utc::now(),
                        block: block_name.clone(),
                    });
                }
            }
        }
        finished
    }

    /// Emits the final event with the run summary and flushes the stream.
    fn finish(&mut self, reason: StopReason) {
        if self.complete {
            return;
        }
        self.complete = true;
        let summary = RunSummary {
            ticks: self.ticks,
            trials_completed: self.trials_completed,
            phases_completed: self.phases_completed,
            overrides: self.overrides,
            uptime_secs: self
                .started_at
                .map_or(0.0, |t| t.elapsed().as_secs_f64()),
        };
        info!(run_id = %self.run_id, %summary, "experiment finished");
        self.emitter.emit(Event::ExperimentCompleted {
            timestamp: Utc::now(),
            reason,
            summary: Some(summary),
        });
        self.emitter.flush();
    }
}

impl std::fmt::Debug for ExperimentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentRunner")
            .field("experiment", &self.experiment)
            .field("run_id", &self.run_id)
            .field("blocks", &self.blocks.len())
            .field("current", &self.current)
            .field("ticks", &self.ticks)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}
