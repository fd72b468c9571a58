//! Shared integration-test helpers: fixture files, runners, and a scripted
//! phase for driving the sequencing core deterministically.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

use trialflow::config::ExperimentConfig;
use trialflow::observability::EventEmitter;
use trialflow::phases::PhaseRegistry;
use trialflow::runner::ExperimentRunner;
use trialflow::sequencer::{Phase, PhaseTick};
use trialflow::signals::SignalBus;

/// Writes a YAML definition to a temp file.
pub fn fixture(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write fixture");
    file
}

/// Builds a runner over `yaml` with a fresh bus and the given emitter.
pub fn runner_with_emitter(yaml: &str, emitter: EventEmitter) -> (ExperimentRunner, SignalBus) {
    let config: ExperimentConfig = serde_yaml::from_str(yaml).expect("parse fixture");
    let bus = SignalBus::new();
    let runner = ExperimentRunner::from_config(
        &config,
        &PhaseRegistry::with_defaults(),
        bus.clone(),
        emitter,
    )
    .expect("build runner");
    (runner, bus)
}

/// Builds a runner over `yaml` that discards its events.
pub fn runner(yaml: &str) -> (ExperimentRunner, SignalBus) {
    runner_with_emitter(yaml, EventEmitter::noop())
}

/// Steps `runner` until it completes or `max_ticks` elapse.
pub fn step_to_completion(runner: &mut ExperimentRunner, max_ticks: usize) {
    runner.start();
    for _ in 0..max_ticks {
        if runner.is_complete() {
            return;
        }
        runner.step();
    }
}

/// Phase that completes after a fixed number of ticks per visit, recording
/// how often it was entered.
pub struct ScriptedPhase {
    name: String,
    ticks_per_visit: u32,
    remaining: u32,
    alive: bool,
    pub entries: u32,
}

impl ScriptedPhase {
    pub fn new(name: &str, ticks_per_visit: u32) -> Self {
        Self {
            name: name.to_string(),
            ticks_per_visit: ticks_per_visit.max(1),
            remaining: 0,
            alive: false,
            entries: 0,
        }
    }

    pub fn boxed(name: &str, ticks_per_visit: u32) -> Box<dyn Phase> {
        Box::new(Self::new(name, ticks_per_visit))
    }
}

impl Phase for ScriptedPhase {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn enter(&mut self) {
        self.alive = true;
        self.remaining = self.ticks_per_visit;
        self.entries += 1;
    }

    fn tick(&mut self) -> PhaseTick {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.alive = false;
            PhaseTick::Complete
        } else {
            PhaseTick::Running
        }
    }
}
