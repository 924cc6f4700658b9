//! Data-ingestion boundary between the document store and core logic.
//!
//! # Responsibility
//! - Reject unknown vote/status strings and malformed ids at the edge.
//! - Keep planner functions free of validation concerns.

pub mod document;
