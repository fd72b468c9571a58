//! Registry mapping configuration `kind` tags to phase builders.
//!
//! Builders deserialize their own parameter structs from the flattened
//! remainder of a phase entry, so the schema stays closed per-variant
//! (unknown parameters are configuration errors) while the registry stays
//! open for embedder-registered kinds.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::schema::PhaseSpec;
use crate::error::ConfigError;
use crate::sequencer::Phase;
use crate::signals::SignalBus;

use super::{CuedPhase, FixedPhase, InputPhase, TimedPhase};

type BuildFn =
    Box<dyn Fn(&PhaseSpec, &SignalBus, &str) -> Result<Box<dyn Phase>, ConfigError> + Send + Sync>;

/// Builders for phase variants, keyed by the stable `kind` tag.
pub struct PhaseRegistry {
    builders: HashMap<String, BuildFn>,
}

impl PhaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in variants (`fixed`, `timed`,
    /// `input`, `cued`) registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("fixed", build_fixed);
        registry.register("timed", build_timed);
        registry.register("input", build_input);
        registry.register("cued", build_cued);
        registry
    }

    /// Registers (or replaces) a builder for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, builder: F)
    where
        F: Fn(&PhaseSpec, &SignalBus, &str) -> Result<Box<dyn Phase>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(kind.into(), Box::new(builder));
    }

    /// Whether a builder exists for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// Registered kind tags, sorted for stable diagnostics.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Builds the phase described by `spec`.
    ///
    /// `location` is the configuration path (e.g.
    /// `blocks[0].trials[1].phases[2]`) used in diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPhaseKind`] for an unregistered tag,
    /// or the builder's own error for bad parameters.
    pub fn build(
        &self,
        spec: &PhaseSpec,
        bus: &SignalBus,
        location: &str,
    ) -> Result<Box<dyn Phase>, ConfigError> {
        let builder = self
            .builders
            .get(&spec.kind)
            .ok_or_else(|| ConfigError::UnknownPhaseKind {
                kind: spec.kind.clone(),
                location: location.to_string(),
            })?;
        builder(spec, bus, location)
    }
}

impl Default for PhaseRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for PhaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

// ============================================================================
// Built-in builders
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixedParams {
    ticks: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimedParams {
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputParams {
    #[serde(default = "default_count")]
    count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CuedParams {}

const fn default_count() -> u32 {
    1
}

fn parse_params<T: DeserializeOwned>(spec: &PhaseSpec, location: &str) -> Result<T, ConfigError> {
    serde_json::from_value(spec.params.clone()).map_err(|err| ConfigError::InvalidValue {
        field: location.to_string(),
        value: spec.params.to_string(),
        expected: format!("valid '{}' parameters ({err})", spec.kind),
    })
}

fn build_fixed(
    spec: &PhaseSpec,
    bus: &SignalBus,
    location: &str,
) -> Result<Box<dyn Phase>, ConfigError> {
    let params: FixedParams = parse_params(spec, location)?;
    if params.ticks == 0 {
        return Err(ConfigError::InvalidValue {
            field: format!("{location}.ticks"),
            value: "0".to_string(),
            expected: "a tick count >= 1".to_string(),
        });
    }
    Ok(Box::new(FixedPhase::new(
        spec.name.clone(),
        params.ticks,
        bus.clone(),
    )))
}

fn build_timed(
    spec: &PhaseSpec,
    bus: &SignalBus,
    location: &str,
) -> Result<Box<dyn Phase>, ConfigError> {
    let params: TimedParams = parse_params(spec, location)?;
    let duration = parse_duration(&params.duration, location)?;
    Ok(Box::new(TimedPhase::new(
        spec.name.clone(),
        duration,
        bus.clone(),
    )))
}

fn build_input(
    spec: &PhaseSpec,
    bus: &SignalBus,
    location: &str,
) -> Result<Box<dyn Phase>, ConfigError> {
    let params: InputParams = parse_params(spec, location)?;
    if params.count == 0 {
        return Err(ConfigError::InvalidValue {
            field: format!("{location}.count"),
            value: "0".to_string(),
            expected: "a response count >= 1".to_string(),
        });
    }
    Ok(Box::new(InputPhase::new(
        spec.name.clone(),
        params.count,
        bus.clone(),
    )))
}

fn build_cued(
    spec: &PhaseSpec,
    bus: &SignalBus,
    location: &str,
) -> Result<Box<dyn Phase>, ConfigError> {
    let _params: CuedParams = parse_params(spec, location)?;
    Ok(Box::new(CuedPhase::new(spec.name.clone(), bus.clone())))
}

/// Parses a humantime duration string (e.g. "2s", "500ms").
pub(crate) fn parse_duration(value: &str, location: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|_| ConfigError::InvalidValue {
        field: format!("{location}.duration"),
        value: value.to_string(),
        expected: "a duration like '2s' or '500ms'".to_string(),
    })
}
