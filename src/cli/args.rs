//! CLI argument definitions
//!
//! All Clap derive structs for `trafficsignal` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::parse_duration;
use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Randomized traffic-signal simulation over a blocking phase queue.
#[derive(Parser, Debug)]
#[command(name = "trafficsignal", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRAFFICSIGNAL_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the signal with vehicles waiting for green.
    Run(RunArgs),

    /// Validate configuration files without running anything.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Run / Validate
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "TRAFFICSIGNAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of vehicles waiting at the intersection.
    #[arg(long, env = "TRAFFICSIGNAL_VEHICLES")]
    pub vehicles: Option<usize>,

    /// Stop after this long (e.g. `30s`, `2m`); runs until Ctrl+C if absent.
    #[arg(short, long, value_parser = duration_arg)]
    pub duration: Option<Duration>,

    /// Seed for the cycle generator.
    #[arg(long, env = "TRAFFICSIGNAL_SEED")]
    pub seed: Option<u64>,

    /// Use this exact cycle length instead of a random one.
    #[arg(long, value_parser = duration_arg)]
    pub fixed_cycle: Option<Duration>,

    /// Write JSONL events to this file (`-` for stdout).
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Summary output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
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

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["trafficsignal", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("Expected RunArgs, got {other:?}"),
        }
    }

    #[test]
    fn test_run_without_flags() {
        let args = run_args(&[]);
        assert!(args.config.is_none());
        assert!(args.duration.is_none());
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn test_run_all_flags() {
        let args = run_args(&[
            "--config",
            "signal.yaml",
            "--vehicles",
            "5",
            "--duration",
            "30s",
            "--seed",
            "42",
            "--fixed-cycle",
            "4500ms",
            "--events-file",
            "-",
            "--format",
            "json",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("signal.yaml")));
        assert_eq!(args.vehicles, Some(5));
        assert_eq!(args.duration, Some(Duration::from_secs(30)));
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.fixed_cycle, Some(Duration::from_millis(4500)));
        assert_eq!(args.events_file, Some(PathBuf::from("-")));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = Cli::try_parse_from(["trafficsignal", "run", "--duration", "forever"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["trafficsignal", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["trafficsignal", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_validate_requires_files() {
        let result = Cli::try_parse_from(["trafficsignal", "validate"]);
        assert!(result.is_err(), "Expected error for missing files");
    }

    #[test]
    fn test_completions_shells_parse() {
        for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["trafficsignal", "completions", shell]);
            assert!(cli.is_ok(), "Failed to parse shell={shell}");
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "trafficsignal",
            "-vv",
            "--quiet",
            "--color",
            "never",
            "--log-format",
            "json",
            "run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
