//! Structured event stream for experiment runs.
//!
//! Discrete, typed events covering the run hierarchy (experiment, block,
//! trial, repetition, phase) plus operator overrides. Events are serialized
//! as newline-delimited JSON (JSONL) with a monotonically increasing
//! sequence number for ordering guarantees — downstream analysis relies on
//! this stream as the run record.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why the run stopped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All blocks ran to completion.
    Completed,
    /// Interrupted by SIGINT or the operator `quit` command.
    Interrupted,
    /// Terminated by SIGTERM.
    Terminated,
    /// Unrecoverable error.
    Error,
}

/// Summary statistics emitted when the run stops.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Total external ticks driven.
    pub ticks: u64,
    /// Trials completed.
    pub trials_completed: u64,
    /// Phase completions recorded.
    pub phases_completed: u64,
    /// Operator overrides received.
    pub overrides: u64,
    /// Wall-clock run time in seconds.
    pub uptime_secs: f64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} trials={} phases={} overrides={} uptime={:.1}s",
            self.ticks, self.trials_completed, self.phases_completed, self.overrides, self.uptime_secs,
        )
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during an experiment run.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The run began.
    ExperimentStarted {
        /// When the run began.
        timestamp: DateTime<Utc>,
        /// Experiment name from the definition.
        experiment: String,
        /// Unique id for this run.
        run_id: String,
        /// Number of blocks in the run.
        blocks: usize,
    },

    /// The run ended.
    ExperimentCompleted {
        /// When the run ended.
        timestamp: DateTime<Utc>,
        /// Why the run ended.
        reason: StopReason,
        /// Run summary statistics.
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<RunSummary>,
    },

    /// A block became active.
    BlockStarted {
        /// When the block started.
        timestamp: DateTime<Utc>,
        /// Block name.
        block: String,
    },

    /// A block exhausted its trials.
    BlockCompleted {
        /// When the block completed.
        timestamp: DateTime<Utc>,
        /// Block name.
        block: String,
    },

    /// A trial became active.
    TrialStarted {
        /// When the trial started.
        timestamp: DateTime<Utc>,
        /// Owning block name.
        block: String,
        /// Trial name.
        trial: String,
        /// Configured pass count (0 when endless).
        repetitions: u32,
        /// Whether the trial repeats without bound.
        endless: bool,
    },

    /// A trial reached its terminal state.
    TrialCompleted {
        /// When the trial completed.
        timestamp: DateTime<Utc>,
        /// Owning block name.
        block: String,
        /// Trial name.
        trial: String,
    },

    /// A phase was entered.
    PhaseEntered {
        /// When the phase was entered.
        timestamp: DateTime<Utc>,
        /// Owning trial name.
        trial: String,
        /// Phase display name.
        phase: String,
        /// Zero-based index in the trial's sequence.
        phase_index: usize,
    },

    /// A phase completed (or a goto jumped past it).
    PhaseCompleted {
        /// When the completion was recorded.
        timestamp: DateTime<Utc>,
        /// Owning trial name.
        trial: String,
        /// Zero-based index in the trial's sequence.
        phase_index: usize,
    },

    /// A trial began a new repetition.
    RepetitionStarted {
        /// When the repetition began.
        timestamp: DateTime<Utc>,
        /// Owning trial name.
        trial: String,
        /// The 0-based repetition now running.
        repetition: u32,
    },

    /// An operator override was received.
    OverrideReceived {
        /// When the override arrived.
        timestamp: DateTime<Utc>,
        /// The console command (e.g. `"next"`, `"input"`).
        command: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are silently dropped
/// because observability must never crash the run.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug — provide a manual impl.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    ///
    /// This is the default for run operation — the event stream is the
    /// primary output; logs go to stderr.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that appends to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    ///
    /// Failures are silently dropped — observability must not crash the run.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock()
            && let Ok(line) = serde_json::to_string(&envelope)
        {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Flushes the underlying writer.
    ///
    /// Call before shutdown so buffered events reach disk; failures are
    /// silently ignored.
    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
