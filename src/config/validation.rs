//! Experiment definition validation.
//!
//! Validation collects every issue in one pass instead of failing on the
//! first, so an author sees the full damage report. Errors block the run;
//! warnings describe corrections (like repetition clamping) that
//! normalization applies afterwards.

use crate::error::{Severity, ValidationIssue};
use crate::phases::PhaseRegistry;
use crate::phases::registry::parse_duration;
use crate::signals::SignalBus;

use super::schema::ExperimentConfig;

/// Validates `config`, returning every issue found.
#[must_use]
pub fn validate(config: &ExperimentConfig, registry: &PhaseRegistry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    // Throwaway bus: builders need one, but dry-run phases are discarded.
    let bus = SignalBus::new();

    if config.experiment.name.trim().is_empty() {
        issues.push(error("experiment.name", "experiment name is empty"));
    }

    if let Some(interval) = &config.experiment.tick_interval
        && parse_duration(interval, "experiment").is_err()
    {
        issues.push(error(
            "experiment.tick_interval",
            format!("'{interval}' is not a duration (expected e.g. '16ms')"),
        ));
    }

    if config.blocks.is_empty() {
        issues.push(warning("blocks", "experiment has no blocks"));
    }

    for (b, block) in config.blocks.iter().enumerate() {
        let block_path = format!("blocks[{b}]");
        if block.name.trim().is_empty() {
            issues.push(error(format!("{block_path}.name"), "block name is empty"));
        }
        if block.trials.is_empty() {
            issues.push(warning(
                format!("{block_path}.trials"),
                format!("block '{}' has no trials", block.name),
            ));
        }

        for (t, trial) in block.trials.iter().enumerate() {
            let trial_path = format!("{block_path}.trials[{t}]");
            if trial.name.trim().is_empty() {
                issues.push(error(format!("{trial_path}.name"), "trial name is empty"));
            }

            if trial.repetitions == 0 && !trial.endless {
                issues.push(warning(
                    format!("{trial_path}.repetitions"),
                    "repetitions must be >= 1; clamping to 1 (set endless for unbounded trials)",
                ));
            }
            if trial.endless && trial.repetitions > 1 {
                issues.push(warning(
                    format!("{trial_path}.repetitions"),
                    "repetitions is ignored for endless trials",
                ));
            }

            if trial.enabled_phases().next().is_none() {
                issues.push(warning(
                    format!("{trial_path}.phases"),
                    format!("trial '{}' has no usable phases and will be skipped", trial.name),
                ));
            }

            for (p, phase) in trial.phases.iter().enumerate() {
                let phase_path = format!("{trial_path}.phases[{p}]");
                if phase.name.trim().is_empty() {
                    issues.push(error(format!("{phase_path}.name"), "phase name is empty"));
                }
                if phase.disabled {
                    continue;
                }
                // Dry-run build to surface unknown kinds and bad parameters.
                if let Err(err) = registry.build(phase, &bus, &phase_path) {
                    issues.push(error(phase_path, err.to_string()));
                }
            }
        }
    }

    issues
}

/// Applies the corrections the warnings describe.
///
/// Clamps `repetitions: 0` (without endless) to 1 and forces the endless
/// sentinel `repetitions = 0`, so the built trials match the validated
/// report exactly.
pub fn normalize(config: &mut ExperimentConfig) {
    for block in &mut config.blocks {
        for trial in &mut block.trials {
            if trial.endless {
                trial.repetitions = 0;
            } else if trial.repetitions == 0 {
                trial.repetitions = 1;
            }
        }
    }
}

/// Whether any issue is error severity.
#[must_use]
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

fn error(path: impl Into<String>, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        path: path.into(),
        message: message.into(),
        severity: Severity::Error,
    }
}

fn warning(path: impl Into<String>, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        path: path.into(),
        message: message.into(),
        severity: Severity::Warning,
    }
}
