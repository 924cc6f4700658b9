//! Pure planner logic: activity ranking and vote aggregation.
//!
//! # Responsibility
//! - Provide the only ranking and tally rules used by every caller.
//! - Stay storage-agnostic: inputs are plain `Activity` values.
//!
//! # Invariants
//! - Functions here are pure and total; they never fail and never mutate input.
//! - Vote values are already validated; malformed data is rejected upstream.

pub mod ranking;
pub mod tally;
