//! Domain model for family trip planning.
//!
//! # Responsibility
//! - Define canonical value records used by planner logic.
//! - Keep records plain and immutable from the ranking/tally point of view.
//!
//! # Invariants
//! - Every activity is identified by a stable `ActivityId`.
//! - Mutation of stored data goes through repositories, never through views.

pub mod activity;
