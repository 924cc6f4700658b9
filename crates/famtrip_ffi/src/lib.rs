//! Flutter bridge for the family trip planner core.

pub mod api;
