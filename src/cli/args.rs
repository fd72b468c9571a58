//! CLI argument definitions.
//!
//! All clap derive structs for trialflow command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Stage sequencing engine for timed behavioral experiments.
#[derive(Parser, Debug)]
#[command(name = "trialflow", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRIALFLOW_COLOR")]
    pub color: ColorChoice,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub log_json: bool,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an experiment definition.
    Run(RunArgs),

    /// Validate experiment definitions without running them.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the YAML experiment definition.
    #[arg(short, long, env = "TRIALFLOW_CONFIG")]
    pub config: PathBuf,

    /// Tick interval override (e.g. "16ms"); wins over the definition.
    #[arg(long)]
    pub tick_interval: Option<String>,

    /// Append the JSONL event stream to this file instead of stdout.
    #[arg(long, env = "TRIALFLOW_EVENTS")]
    pub events: Option<PathBuf>,

    /// Disable the operator console (do not read stdin).
    #[arg(long)]
    pub no_console: bool,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Experiment definitions to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Human,
    /// Machine-readable JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["trialflow", "run", "--config", "exp.yaml"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("exp.yaml"));
                assert!(!args.no_console);
                assert!(args.tick_interval.is_none());
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "trialflow", "run", "--config", "exp.yaml", "-vv", "--color", "never",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_validate_multiple_files() {
        let cli =
            Cli::try_parse_from(["trialflow", "validate", "a.yaml", "b.yaml", "--strict"]).unwrap();
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.files.len(), 2);
                assert!(args.strict);
                assert_eq!(args.format, OutputFormat::Human);
            }
            other => panic!("expected validate, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_requires_files() {
        assert!(Cli::try_parse_from(["trialflow", "validate"]).is_err());
    }

    #[test]
    fn test_parse_version_json() {
        let cli = Cli::try_parse_from(["trialflow", "version", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Version(args) => assert_eq!(args.format, OutputFormat::Json),
            other => panic!("expected version, got {other:?}"),
        }
    }
}
