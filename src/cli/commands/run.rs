//! `run` command
//!
//! Resolves configuration from file, environment, and flags, then drives an
//! [`Intersection`] until the requested duration elapses or the process is
//! interrupted.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::SignalConfig;
use crate::config::loader::{load, validate};
use crate::config::schema::format_duration;
use crate::error::Result;
use crate::observability::EventEmitter;
use crate::phase::PhaseController;
use crate::simulation::{Intersection, SimulationSummary, StopReason};

/// Runs the simulation described by `args`.
///
/// # Errors
///
/// Returns an error if the configuration is missing or invalid, if the
/// events file cannot be created, or if the phase loop dies mid-run.
pub async fn run(args: &RunArgs, interrupt: CancellationToken) -> Result<()> {
    let config = resolve_config(args)?;
    let events = Arc::new(open_events(args.events_file.as_deref())?);

    info!(
        vehicles = config.vehicles,
        min = %format_duration(config.cycle.min),
        max = %format_duration(config.cycle.max),
        fixed = ?config.fixed_cycle,
        seed = config.seed,
        "starting signal"
    );

    // Own token: an interrupt must end the run as Interrupted, not Cancelled.
    let controller = Arc::new(PhaseController::from_config(
        &config,
        CancellationToken::new(),
        Some(Arc::clone(&events)),
    ));
    let summary = Intersection::new(controller, config.vehicles)
        .with_events(events)
        .run(stop_signal(args.duration, interrupt))
        .await?;

    println!("{}", render_summary(&summary, args.format));
    Ok(())
}

/// Loads the configuration file (or defaults) and applies flag overrides.
fn resolve_config(args: &RunArgs) -> Result<SignalConfig> {
    let mut config = match &args.config {
        Some(path) => load(path)?.config,
        None => SignalConfig::default(),
    };
    apply_overrides(&mut config, args);

    for warning in validate(&config)? {
        warn!(
            location = warning.location.as_deref().unwrap_or("-"),
            "{}",
            warning.message
        );
    }
    Ok(config)
}

fn apply_overrides(config: &mut SignalConfig, args: &RunArgs) {
    if let Some(vehicles) = args.vehicles {
        config.vehicles = vehicles;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(fixed) = args.fixed_cycle {
        config.fixed_cycle = Some(fixed);
    }
}

fn open_events(path: Option<&Path>) -> std::io::Result<EventEmitter> {
    match path {
        Some(p) if p == Path::new("-") => Ok(EventEmitter::stdout()),
        Some(p) => EventEmitter::from_file(p),
        None => Ok(EventEmitter::noop()),
    }
}

async fn stop_signal(duration: Option<Duration>, interrupt: CancellationToken) -> StopReason {
    match duration {
        Some(limit) => tokio::select! {
            () = interrupt.cancelled() => StopReason::Interrupted,
            () = tokio::time::sleep(limit) => StopReason::Deadline,
        },
        None => {
            interrupt.cancelled().await;
            StopReason::Interrupted
        }
    }
}

fn render_summary(summary: &SimulationSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format!(
            "stopped ({}): {} toggles, {} crossings, final phase {}",
            summary.reason, summary.toggles, summary.crossings, summary.final_phase
        ),
        OutputFormat::Json => serde_json::json!({
            "reason": summary.reason.to_string(),
            "toggles": summary.toggles,
            "crossings": summary.crossings,
            "final_phase": summary.final_phase,
        })
        .to_string(),
    }
}
