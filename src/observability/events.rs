//! JSONL event log
//!
//! Each event becomes one line:
//!
//! ```text
//! {"sequence":3,"timestamp":"2025-02-04T10:15:30Z","type":"PhaseChanged","phase":"green","next_cycle_ms":4712}
//! ```
//!
//! Sequence numbers and timestamps are assigned while the writer lock is
//! held, so file order matches sequence order however many tasks share
//! the log.

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::phase::Phase;

/// Something that happened at the intersection.
///
/// Serialized with an internal `"type"` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The controller loop and vehicles have started.
    SimulationStarted {
        /// Vehicle tasks spawned.
        vehicles: usize,
    },

    /// The controller toggled.
    PhaseChanged {
        /// Phase now in effect.
        phase: Phase,
        /// Length of the cycle that just began.
        next_cycle_ms: u64,
    },

    /// A vehicle saw green and crossed.
    VehicleCrossed {
        /// Index of the vehicle task.
        vehicle_id: usize,
    },

    /// The run is over.
    SimulationStopped {
        /// `deadline`, `interrupted`, `cancelled` or `failed`.
        reason: String,
        toggles: u64,
        crossings: u64,
    },
}

impl Event {
    /// The value written to the `type` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SimulationStarted { .. } => "SimulationStarted",
            Self::PhaseChanged { .. } => "PhaseChanged",
            Self::VehicleCrossed { .. } => "VehicleCrossed",
            Self::SimulationStopped { .. } => "SimulationStopped",
        }
    }
}

#[derive(Serialize)]
struct Record<'a> {
    sequence: u64,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a Event,
}

struct Log {
    out: Box<dyn Write + Send>,
    /// Sequence number of the next line written.
    next: u64,
}

/// Shared, ordered JSONL writer.
///
/// A line that fails to serialize or write is dropped with a `debug!` and
/// does not consume a sequence number, so written sequences stay contiguous.
pub struct EventEmitter {
    log: Option<Mutex<Log>>,
}

impl EventEmitter {
    /// Writes events to `writer`.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            log: Some(Mutex::new(Log {
                out: writer,
                next: 0,
            })),
        }
    }

    /// Writes events to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Discards every event without serializing it.
    #[must_use]
    pub const fn noop() -> Self {
        Self { log: None }
    }

    /// Creates (or truncates) `path` and writes events to it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(Box::new(std::fs::File::create(path)?)))
    }

    /// Appends `event` as one line and flushes.
    pub fn emit(&self, event: Event) {
        let Some(mut log) = self.lock() else {
            return;
        };

        let record = Record {
            sequence: log.next,
            timestamp: Utc::now(),
            event: &event,
        };
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                debug!(kind = event.kind(), error = %e, "dropping unserializable event");
                return;
            }
        };

        line.push(b'\n');

        let written = log.out.write_all(&line).and_then(|()| log.out.flush());
        match written {
            Ok(()) => log.next += 1,
            Err(e) => debug!(kind = event.kind(), error = %e, "event write failed"),
        }
    }

    /// Lines written so far. Always zero for [`noop`](Self::noop).
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.lock().map_or(0, |log| log.next)
    }

    fn lock(&self) -> Option<MutexGuard<'_, Log>> {
        self.log
            .as_ref()
            .map(|log| log.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("enabled", &self.log.is_some())
            .field("written", &self.event_count())
            .finish()
    }
}
