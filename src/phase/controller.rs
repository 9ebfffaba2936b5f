//! Phase controller
//!
//! The `PhaseController` owns the current phase and a shared queue of phase
//! notifications. Once [`simulate`](PhaseController::simulate) is called, a
//! background task toggles the phase whenever the current cycle length has
//! elapsed and pushes every new phase onto the queue. Callers block in
//! [`wait_for_phase`](PhaseController::wait_for_phase) until the phase they
//! want comes off the queue.
//!
//! The loop and the async waits need a tokio runtime. Plain OS threads can
//! still drive a controller: start the loop on a runtime they hold a
//! [`Handle`] to with [`simulate_on`](PhaseController::simulate_on), then
//! consume phases with [`BlockingQueue::blocking_receive`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::schema::{DEFAULT_POLL_INTERVAL, SignalConfig};
use crate::error::PhaseError;
use crate::observability::events::{Event, EventEmitter};
use crate::queue::BlockingQueue;

use super::cycle::{CycleSource, FixedCycles, RandomCycle};
use super::state::{Phase, PhaseCell};

/// Shortest pause the loop takes between checks.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Construction options for a [`PhaseController`].
pub struct ControllerOptions {
    /// Source of cycle lengths, consumed by the background loop.
    pub cycle: Box<dyn CycleSource>,
    /// Pause between two loop checks. Clamped to at least 1ms.
    pub poll_interval: Duration,
    /// Stops the loop and releases waiters when cancelled.
    pub cancel: CancellationToken,
    /// Optional sink for `PhaseChanged` events.
    pub events: Option<Arc<EventEmitter>>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            cycle: Box::new(RandomCycle::default()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
            events: None,
        }
    }
}

impl std::fmt::Debug for ControllerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerOptions")
            .field("poll_interval", &self.poll_interval)
            .field("has_events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

/// Two-phase signal that toggles on a randomized schedule.
///
/// Coordinates:
/// - the current phase, readable at any time without blocking
/// - a shared FIFO queue carrying every phase change
/// - a background tokio task that performs the toggles
///
/// All waiters share one queue and consume notifications destructively:
/// a waiter for `Green` discards any `Red` it receives, and a notification
/// taken by one waiter is never seen by another.
pub struct PhaseController {
    /// Last phase written by the loop
    current: Arc<PhaseCell>,
    /// Phase notifications, shared with the loop task
    queue: Arc<BlockingQueue<Phase>>,
    /// Toggles performed so far
    toggles: Arc<AtomicU64>,
    /// Taken by the first `simulate` call
    cycle: Mutex<Option<Box<dyn CycleSource>>>,
    /// Pause between loop checks
    poll_interval: Duration,
    /// Optional event sink
    events: Option<Arc<EventEmitter>>,
    /// Stops the loop and pending waits
    cancel: CancellationToken,
}

impl PhaseController {
    /// Creates a controller at `Red` with an empty queue, cycle lengths drawn
    /// uniformly from 4000..=6000 ms, and a 1ms poll interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ControllerOptions::default())
    }

    /// Creates a controller at `Red` with an empty queue from explicit options.
    #[must_use]
    pub fn with_options(options: ControllerOptions) -> Self {
        Self {
            current: Arc::new(PhaseCell::new(Phase::Red)),
            queue: Arc::new(BlockingQueue::new()),
            toggles: Arc::new(AtomicU64::new(0)),
            cycle: Mutex::new(Some(options.cycle)),
            poll_interval: options.poll_interval.max(MIN_POLL_INTERVAL),
            events: options.events,
            cancel: options.cancel,
        }
    }

    /// Creates a controller from validated configuration.
    ///
    /// A `fixed_cycle` takes precedence over the random range; otherwise the
    /// generator is seeded from `seed` or, when absent, from OS entropy.
    #[must_use]
    pub fn from_config(
        config: &SignalConfig,
        cancel: CancellationToken,
        events: Option<Arc<EventEmitter>>,
    ) -> Self {
        let cycle: Box<dyn CycleSource> = match (config.fixed_cycle, config.seed) {
            (Some(fixed), _) => Box::new(FixedCycles::constant(fixed)),
            (None, Some(seed)) => Box::new(RandomCycle::seeded(
                config.cycle.min,
                config.cycle.max,
                seed,
            )),
            (None, None) => Box::new(RandomCycle::new(config.cycle.min, config.cycle.max)),
        };

        Self::with_options(ControllerOptions {
            cycle,
            poll_interval: config.poll_interval,
            cancel,
            events,
        })
    }

    /// Returns the last phase written by the background loop.
    ///
    /// Never blocks. May lag a toggle that is happening concurrently.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.current.load()
    }

    /// Returns the number of toggles performed so far.
    #[must_use]
    pub fn toggle_count(&self) -> u64 {
        self.toggles.load(Ordering::SeqCst)
    }

    /// Returns a handle to the shared notification queue.
    #[must_use]
    pub fn queue(&self) -> Arc<BlockingQueue<Phase>> {
        Arc::clone(&self.queue)
    }

    /// Returns whether `simulate` has already started the loop.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Returns whether the loop has been started and not yet shut down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_started() && !self.cancel.is_cancelled()
    }

    /// Returns the token that stops the loop and releases waiters.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Starts the background toggling loop as a tokio task.
    ///
    /// Only the first call starts a loop and returns its handle. Repeat
    /// calls are ignored: they log a warning and return `None`.
    ///
    /// The task runs until the controller's cancellation token is
    /// cancelled. It owns its own handles to the queue and the phase cell,
    /// so it keeps running if the controller is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime; use
    /// [`simulate_on`](Self::simulate_on) from plain threads.
    pub fn simulate(&self) -> Option<JoinHandle<()>> {
        self.simulate_on(&Handle::current())
    }

    /// Like [`simulate`](Self::simulate), spawning the loop on `runtime`.
    ///
    /// Callable from any thread.
    pub fn simulate_on(&self, runtime: &Handle) -> Option<JoinHandle<()>> {
        let taken = self
            .cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(cycle) = taken else {
            warn!("phase loop already running; ignoring repeated simulate()");
            return None;
        };

        let task = CycleTask {
            current: Arc::clone(&self.current),
            queue: Arc::clone(&self.queue),
            toggles: Arc::clone(&self.toggles),
            cycle,
            poll_interval: self.poll_interval,
            events: self.events.clone(),
            cancel: self.cancel.clone(),
        };

        info!(
            poll_interval_ms = millis(self.poll_interval),
            "starting phase loop"
        );
        Some(runtime.spawn(task.run()))
    }

    /// Waits until `target` is received from the notification queue.
    ///
    /// Drains the queue: every received phase that is not `target` is
    /// discarded, so a waiter for `Green` also consumes a pending `Red`.
    ///
    /// If `simulate` was never called nothing is ever pushed, and this
    /// waits until the controller is shut down.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Cancelled` if the cancellation token fires
    /// first.
    pub async fn wait_for_phase(&self, target: Phase) -> Result<(), PhaseError> {
        loop {
            let received = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(PhaseError::Cancelled),
                phase = self.queue.receive() => phase,
            };

            if received == target {
                debug!(phase = %received, "target phase received");
                return Ok(());
            }
            debug!(phase = %received, target = %target, "discarding non-matching phase");
        }
    }

    /// Like [`wait_for_phase`](Self::wait_for_phase), bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Timeout` if `target` was not received in time,
    /// or `PhaseError::Cancelled` on shutdown.
    pub async fn wait_for_phase_timeout(
        &self,
        target: Phase,
        timeout: Duration,
    ) -> Result<(), PhaseError> {
        match tokio::time::timeout(timeout, self.wait_for_phase(target)).await {
            Ok(result) => result,
            Err(_) => Err(PhaseError::Timeout {
                target,
                waited: timeout,
            }),
        }
    }

    /// Stops the background loop and releases every pending waiter.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PhaseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseController")
            .field("current_phase", &self.current_phase())
            .field("toggles", &self.toggle_count())
            .field("pending", &self.queue.len())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

/// State moved into the background loop task.
struct CycleTask {
    current: Arc<PhaseCell>,
    queue: Arc<BlockingQueue<Phase>>,
    toggles: Arc<AtomicU64>,
    cycle: Box<dyn CycleSource>,
    poll_interval: Duration,
    events: Option<Arc<EventEmitter>>,
    cancel: CancellationToken,
}

impl CycleTask {
    async fn run(mut self) {
        let mut cycle = self.cycle.next_cycle();
        let mut last_toggle = Instant::now();
        debug!(cycle_ms = millis(cycle), "first cycle drawn");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!("phase loop cancelled");
                    break;
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }

            if last_toggle.elapsed() < cycle {
                continue;
            }

            // Store before pushing so a waiter that receives `next` also
            // reads it from `current_phase`.
            let next = self.current.load().toggled();
            self.current.store(next);
            let toggles = self.toggles.fetch_add(1, Ordering::SeqCst) + 1;
            self.queue.send(next);

            cycle = self.cycle.next_cycle();
            last_toggle = Instant::now();

            let next_cycle_ms = millis(cycle);
            info!(phase = %next, toggles, next_cycle_ms, "phase toggled");
            if let Some(events) = &self.events {
                events.emit(Event::PhaseChanged {
                    phase: next,
                    next_cycle_ms,
                });
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
