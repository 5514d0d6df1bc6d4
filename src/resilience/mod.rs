//! Retry pacing for remote collaborators.
//!
//! # Design Decisions
//! - Exponential growth capped at a maximum, with jitter so many readers
//!   do not reconnect in lockstep
//! - A successful connection resets the sequence

pub mod backoff;

pub use backoff::Backoff;
