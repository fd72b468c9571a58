//! Experiment definition loading.
//!
//! Load order: read, parse, validate (collecting every issue), normalize,
//! freeze. Errors abort with the full issue list; warnings are logged and
//! returned so the CLI can surface them. The frozen config is shared
//! immutably for the rest of the run.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ConfigError, Severity, ValidationIssue};
use crate::phases::PhaseRegistry;

use super::schema::ExperimentConfig;
use super::validation::{normalize, validate};

/// A validated, normalized, frozen experiment definition.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The definition, immutable for the rest of the run.
    pub config: Arc<ExperimentConfig>,
    /// Non-fatal issues found during validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Loads and validates the experiment definition at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if the file does not exist,
/// [`ConfigError::ParseError`] for unreadable or malformed YAML, and
/// [`ConfigError::ValidationError`] carrying every error-severity issue
/// when validation fails.
pub fn load(path: &Path, registry: &PhaseRegistry) -> Result<LoadedConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::ParseError {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    })?;

    let mut config: ExperimentConfig =
        serde_yaml::from_str(&raw).map_err(|err| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    let (errors, warnings): (Vec<_>, Vec<_>) = validate(&config, registry)
        .into_iter()
        .partition(|issue| issue.severity == Severity::Error);

    if !errors.is_empty() {
        return Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            errors,
        });
    }

    for issue in &warnings {
        warn!(%issue, "configuration warning");
    }

    normalize(&mut config);
    debug!(
        experiment = %config.experiment.name,
        blocks = config.blocks.len(),
        "configuration loaded"
    );

    Ok(LoadedConfig {
        config: Arc::new(config),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r"
experiment:
  name: demo
blocks:
  - name: main
    trials:
      - name: t
        phases:
          - { name: p, kind: fixed, ticks: 10 }
",
        );
        let loaded = load(file.path(), &PhaseRegistry::with_defaults()).unwrap();
        assert_eq!(loaded.config.experiment.name, "demo");
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = load(
            Path::new("/nonexistent/experiment.yaml"),
            &PhaseRegistry::with_defaults(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_malformed_yaml() {
        let file = write_config("experiment: [unclosed");
        let err = load(file.path(), &PhaseRegistry::with_defaults()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validation_errors_abort() {
        let file = write_config(
            r"
experiment:
  name: demo
blocks:
  - name: b
    trials:
      - name: t
        phases:
          - { name: p, kind: mystery }
",
        );
        let err = load(file.path(), &PhaseRegistry::with_defaults()).unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("mystery"));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_warnings_survive_load_and_normalize_applies() {
        let file = write_config(
            r"
experiment:
  name: demo
blocks:
  - name: b
    trials:
      - name: t
        repetitions: 0
        phases:
          - { name: p, kind: cued }
",
        );
        let loaded = load(file.path(), &PhaseRegistry::with_defaults()).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.config.blocks[0].trials[0].repetitions, 1);
    }
}
