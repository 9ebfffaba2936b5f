//! `trafficsignal` - Blocking hand-off queue and randomized phase controller
//!
//! This library provides an unbounded FIFO queue whose receivers block until
//! an item arrives, a two-phase signal controller that publishes every phase
//! change through that queue, and an intersection driver that puts the two
//! together.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod queue;
pub mod simulation;
