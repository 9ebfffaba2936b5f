//! Logging setup
//!
//! Log lines always go to stderr; stdout carries the run summary and, with
//! `--events-file -`, the event stream. Verbosity raises this crate's own
//! modules only. Dependencies stay at `warn` until `-vvv`.

use std::io::IsTerminal;

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::uptime;

use crate::cli::args::ColorChoice;

/// Environment variable holding an explicit `tracing` filter.
pub const LOG_LEVEL_ENV: &str = "TRAFFICSIGNAL_LOG_LEVEL";

/// Log line rendering on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Uptime-stamped text, so cycle lengths read straight off the log.
    #[default]
    Human,
    /// One flat JSON object per line.
    Json,
}

/// Filter directives used when [`LOG_LEVEL_ENV`] is unset.
///
/// `--quiet` keeps errors only (a failed phase loop still shows).
#[must_use]
pub fn default_directives(verbosity: u8, quiet: bool) -> String {
    let crate_name = env!("CARGO_CRATE_NAME");
    if quiet {
        return "error".to_owned();
    }
    match verbosity {
        0 => "warn".to_owned(),
        1 => format!("warn,{crate_name}=info"),
        2 => format!("warn,{crate_name}=debug"),
        _ => format!("debug,{crate_name}=trace"),
    }
}

fn use_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global subscriber. An explicit [`LOG_LEVEL_ENV`] filter
/// wins over `verbosity` and `quiet`.
///
/// Later calls are ignored, so tests may call this freely.
pub fn init_logging(format: LogFormat, verbosity: u8, quiet: bool, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity, quiet)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2);

    let _ = match format {
        LogFormat::Human => builder
            .with_ansi(use_ansi(color))
            .with_timer(uptime())
            .try_init(),
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
    };
}
