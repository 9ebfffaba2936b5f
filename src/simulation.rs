//! Intersection driver
//!
//! Starts a [`PhaseController`] and spawns vehicle tasks that repeatedly
//! wait for `Green`, cross, and queue up again. All vehicles share the
//! controller's single notification queue, so one `Green` releases exactly
//! one vehicle and the rest keep waiting for a later cycle.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::PhaseError;
use crate::observability::events::{Event, EventEmitter};
use crate::phase::{Phase, PhaseController};

/// Time a vehicle spends in the intersection after seeing green.
pub const DEFAULT_CROSSING_TIME: Duration = Duration::from_millis(500);

/// Why a simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured run duration elapsed.
    Deadline,
    /// SIGINT or SIGTERM was received.
    Interrupted,
    /// The controller's token was cancelled by someone else.
    Cancelled,
    /// The phase loop panicked or was aborted.
    Failed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Deadline => "deadline",
            Self::Interrupted => "interrupted",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        })
    }
}

/// Totals reported when a simulation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Why the run ended.
    pub reason: StopReason,
    /// Phase toggles performed by the controller.
    pub toggles: u64,
    /// Vehicles that crossed on green.
    pub crossings: u64,
    /// Phase in effect when the run ended.
    pub final_phase: Phase,
}

/// A single signalled intersection with a fixed number of vehicles.
pub struct Intersection {
    controller: Arc<PhaseController>,
    vehicles: usize,
    crossing_time: Duration,
    events: Option<Arc<EventEmitter>>,
}

impl Intersection {
    /// Creates an intersection driven by `controller`.
    #[must_use]
    pub const fn new(controller: Arc<PhaseController>, vehicles: usize) -> Self {
        Self {
            controller,
            vehicles,
            crossing_time: DEFAULT_CROSSING_TIME,
            events: None,
        }
    }

    /// Sets how long each vehicle spends crossing.
    #[must_use]
    pub const fn with_crossing_time(mut self, crossing_time: Duration) -> Self {
        self.crossing_time = crossing_time;
        self
    }

    /// Sets the sink for lifecycle and crossing events.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs until `shutdown` resolves, the controller is cancelled, or the
    /// phase loop dies.
    ///
    /// Starts the controller loop if it is not already running, then
    /// cancels the controller on exit and waits for every task to finish.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::LoopFailed` if the phase loop panicked. The
    /// `SimulationStopped` event is still emitted, with reason `failed`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub async fn run<F>(self, shutdown: F) -> Result<SimulationSummary, PhaseError>
    where
        F: Future<Output = StopReason>,
    {
        let mut loop_task = self.controller.simulate();
        let crossings = Arc::new(AtomicU64::new(0));

        self.emit(Event::SimulationStarted {
            vehicles: self.vehicles,
        });
        info!(vehicles = self.vehicles, "simulation started");

        let mut vehicles = JoinSet::new();
        for vehicle_id in 0..self.vehicles {
            vehicles.spawn(drive_vehicle(
                vehicle_id,
                Arc::clone(&self.controller),
                Arc::clone(&crossings),
                self.crossing_time,
                self.events.clone(),
            ));
        }

        let cancel = self.controller.cancel_token().clone();
        let mut reason = tokio::select! {
            reason = shutdown => reason,
            () = cancel.cancelled() => StopReason::Cancelled,
            e = loop_failure(&mut loop_task) => {
                error!(error = %e, "phase loop failed");
                StopReason::Failed
            }
        };
        self.controller.shutdown();

        while let Some(joined) = vehicles.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "vehicle task failed");
            }
        }
        if let Some(handle) = loop_task {
            if let Err(e) = handle.await {
                error!(error = %e, "phase loop failed");
                reason = StopReason::Failed;
            }
        }

        let summary = SimulationSummary {
            reason,
            toggles: self.controller.toggle_count(),
            crossings: crossings.load(Ordering::SeqCst),
            final_phase: self.controller.current_phase(),
        };

        self.emit(Event::SimulationStopped {
            reason: reason.to_string(),
            toggles: summary.toggles,
            crossings: summary.crossings,
        });
        info!(
            %reason,
            toggles = summary.toggles,
            crossings = summary.crossings,
            "simulation stopped"
        );

        if reason == StopReason::Failed {
            return Err(PhaseError::LoopFailed);
        }
        Ok(summary)
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

impl std::fmt::Debug for Intersection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intersection")
            .field("vehicles", &self.vehicles)
            .field("crossing_time", &self.crossing_time)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

async fn drive_vehicle(
    vehicle_id: usize,
    controller: Arc<PhaseController>,
    crossings: Arc<AtomicU64>,
    crossing_time: Duration,
    events: Option<Arc<EventEmitter>>,
) {
    let cancel = controller.cancel_token().clone();
    loop {
        if controller.wait_for_phase(Phase::Green).await.is_err() {
            break;
        }

        crossings.fetch_add(1, Ordering::SeqCst);
        info!(vehicle_id, "vehicle crossed on green");
        if let Some(events) = &events {
            events.emit(Event::VehicleCrossed { vehicle_id });
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(crossing_time) => {}
        }
    }
    debug!(vehicle_id, "vehicle stopped");
}

/// Resolves only if the loop task ends with a `JoinError`.
///
/// A cleanly finished loop clears `task` and never resolves, so the
/// caller's other `select!` branches decide the outcome.
async fn loop_failure(task: &mut Option<JoinHandle<()>>) -> JoinError {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let joined = handle.await;
    *task = None;
    match joined {
        Err(e) => e,
        Ok(()) => std::future::pending().await,
    }
}
