//! Phase values and the shared current-phase cell
//!
//! [`Phase`] has exactly two members. [`PhaseCell`] is the single-writer,
//! multi-reader scalar the controller loop writes and any caller may read
//! without taking a lock.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// One of the two signal phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Stop. Every controller starts here.
    #[default]
    Red,
    /// Go.
    Green,
}

impl Phase {
    /// Returns the other phase.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }

    /// Returns the lowercase name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        if bits == 0 { Self::Red } else { Self::Green }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic holder for the current phase.
///
/// Stores use `Release` and loads use `Acquire`: a reader that observes a
/// phase also observes everything the writer did before storing it. Readers
/// may still see a value that is one toggle behind a concurrent writer.
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    /// Creates a cell holding `phase`.
    #[must_use]
    pub const fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase.to_bits()))
    }

    /// Returns the last stored phase.
    #[must_use]
    pub fn load(&self) -> Phase {
        Phase::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Replaces the stored phase.
    pub fn store(&self, phase: Phase) {
        self.0.store(phase.to_bits(), Ordering::Release);
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new(Phase::Red)
    }
}

impl std::fmt::Debug for PhaseCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PhaseCell").field(&self.load()).finish()
    }
}
