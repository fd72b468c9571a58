//! Experiment definition handling: schema, loading, validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{LoadedConfig, load};
pub use schema::{BlockSpec, ExperimentConfig, ExperimentMeta, PhaseSpec, TrialSpec};
pub use validation::{has_errors, normalize, validate};
