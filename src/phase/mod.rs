//! Phase controller
//!
//! A two-phase signal that toggles on a randomized schedule and publishes
//! every change through a shared [`BlockingQueue`](crate::queue::BlockingQueue).
//!
//! # Architecture
//!
//! - [`Phase`]: `Red` or `Green`
//! - [`PhaseCell`]: Lock-free current phase (release store, acquire load)
//! - [`CycleSource`]: Cycle lengths; [`RandomCycle`] seeds its generator once
//! - [`PhaseController`]: Background toggling loop plus draining waits

pub mod controller;
pub mod cycle;
pub mod state;

pub use controller::{ControllerOptions, PhaseController};
pub use cycle::{CycleSource, FixedCycles, RandomCycle};
pub use state::{Phase, PhaseCell};
