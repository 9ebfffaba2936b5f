//! Shared integration-test harness for running the `trafficsignal` binary
//! and building controllers with deterministic cycles.

#![allow(dead_code)]

use std::process::{Child, Command, Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use trafficsignal::phase::{ControllerOptions, FixedCycles, PhaseController};

/// Path to the compiled binary under test.
pub const BIN: &str = env!("CARGO_BIN_EXE_trafficsignal");

/// Runs the binary to completion with `args` and returns its output.
#[allow(clippy::missing_panics_doc)]
pub fn spawn_command(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env_remove("TRAFFICSIGNAL_CONFIG")
        .env_remove("TRAFFICSIGNAL_LOG_LEVEL")
        .output()
        .expect("failed to run trafficsignal")
}

/// Spawns the binary in the background with piped stdout.
#[allow(clippy::missing_panics_doc)]
pub fn spawn_background(args: &[&str]) -> Child {
    Command::new(BIN)
        .args(args)
        .env_remove("TRAFFICSIGNAL_CONFIG")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn trafficsignal")
}

/// Sends SIGINT to a running child.
#[allow(clippy::missing_panics_doc)]
pub fn interrupt(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success(), "kill -INT failed");
}

/// A controller whose every cycle lasts `cycle_ms`.
pub fn fixed_controller(cycle_ms: u64) -> Arc<PhaseController> {
    Arc::new(PhaseController::with_options(ControllerOptions {
        cycle: Box::new(FixedCycles::constant(Duration::from_millis(cycle_ms))),
        ..ControllerOptions::default()
    }))
}
