//! Experiment definition schema.
//!
//! The YAML surface mirrors the run hierarchy: an experiment holds ordered
//! blocks, blocks hold ordered trials, trials hold ordered phases. Phase
//! entries carry a stable `kind` tag plus variant-specific parameters that
//! stay opaque here; the registry's builders deserialize them.

use serde::{Deserialize, Serialize};

/// Root of an experiment definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Experiment-level metadata.
    pub experiment: ExperimentMeta,
    /// Ordered blocks, run first to last.
    pub blocks: Vec<BlockSpec>,
}

/// Experiment-level metadata and run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentMeta {
    /// Display name, used in logs and the event stream.
    pub name: String,

    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tick interval as a humantime duration (e.g. "16ms"). Defaults to
    /// the runner's built-in interval; the CLI flag overrides both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval: Option<String>,
}

/// One block: an ordered sequence of trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockSpec {
    /// Display name.
    pub name: String,
    /// Ordered trials.
    pub trials: Vec<TrialSpec>,
}

/// One trial: an ordered sequence of phases plus repetition policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialSpec {
    /// Display name.
    pub name: String,

    /// Full passes over the phase sequence. Must be >= 1; 0 is clamped to
    /// 1 at validation time and never interpreted as endless.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,

    /// Repeat without bound; the trial then only ends via an explicit
    /// end (hook or operator).
    #[serde(default)]
    pub endless: bool,

    /// Ordered phases. Disabled entries are excluded permanently when the
    /// trial is built.
    pub phases: Vec<PhaseSpec>,
}

impl TrialSpec {
    /// Phases that will actually be part of the built sequence.
    pub fn enabled_phases(&self) -> impl Iterator<Item = &PhaseSpec> {
        self.phases.iter().filter(|p| !p.disabled)
    }
}

/// One phase entry: a kind tag plus variant-opaque parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// Display name.
    pub name: String,

    /// Registry tag selecting the variant (`fixed`, `timed`, `input`,
    /// `cued`, or an embedder-registered kind).
    pub kind: String,

    /// Excludes the phase from the built sequence entirely.
    #[serde(default)]
    pub disabled: bool,

    /// Variant-specific parameters, deserialized by the registry builder.
    #[serde(flatten)]
    pub params: serde_json::Value,
}

const fn default_repetitions() -> u32 {
    1
}
