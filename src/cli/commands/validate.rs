//! The `validate` command: check definitions without running them.

use std::fs;
use std::path::Path;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::schema::ExperimentConfig;
use crate::config::validation::validate;
use crate::error::{ConfigError, Severity, TrialflowError, ValidationIssue};
use crate::phases::PhaseRegistry;

/// Validates each file, printing every issue found.
///
/// With `--strict`, warnings fail validation too.
///
/// # Errors
///
/// Returns the first file's failure (missing, unparsable, or carrying
/// error-severity issues) after all files have been reported.
pub fn run(args: &ValidateArgs) -> Result<(), TrialflowError> {
    let registry = PhaseRegistry::with_defaults();
    let mut first_failure: Option<ConfigError> = None;

    for path in &args.files {
        let result = check_file(path, &registry, args.strict);
        match &result {
            Ok(issues) => report(path, true, issues, args.format),
            Err(ConfigError::ValidationError { errors, .. }) => {
                report(path, false, errors, args.format);
            }
            Err(err) => report_unreadable(path, err, args.format),
        }
        if let Err(err) = result
            && first_failure.is_none()
        {
            first_failure = Some(err);
        }
    }

    first_failure.map_or(Ok(()), |err| Err(err.into()))
}

/// Parses and validates one file, returning its warnings on success.
fn check_file(
    path: &Path,
    registry: &PhaseRegistry,
    strict: bool,
) -> Result<Vec<ValidationIssue>, ConfigError> {
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
    let config: ExperimentConfig =
        serde_yaml::from_str(&raw).map_err(|err| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    let issues = validate(&config, registry);
    let failing = issues
        .iter()
        .any(|i| strict || i.severity == Severity::Error);
    if failing {
        Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            errors: issues,
        })
    } else {
        Ok(issues)
    }
}

fn report(path: &Path, valid: bool, issues: &[ValidationIssue], format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            let verdict = if valid { "ok" } else { "invalid" };
            println!("{}: {verdict} ({} issues)", path.display(), issues.len());
            for issue in issues {
                println!("  {issue}");
            }
        }
        OutputFormat::Json => {
            let issues: Vec<serde_json::Value> = issues
                .iter()
                .map(|i| {
                    serde_json::json!({
                        "path": i.path,
                        "message": i.message,
                        "severity": match i.severity {
                            Severity::Error => "error",
                            Severity::Warning => "warning",
                        },
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "file": path.display().to_string(),
                    "valid": valid,
                    "issues": issues,
                })
            );
        }
    }
}

fn report_unreadable(path: &Path, err: &ConfigError, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}: invalid ({err})", path.display()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "file": path.display().to_string(),
                "valid": false,
                "error": err.to_string(),
            })
        ),
    }
}
