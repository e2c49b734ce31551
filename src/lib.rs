//! shiftwise - workforce schedule optimization core
//!
//! A multi-stage optimization pipeline for mobile field operations and
//! contact-center schedules: gap analysis, evolutionary variant generation,
//! constraint validation, cost calculation, multi-criteria scoring, and an
//! orchestrator that sequences the stages under hard latency budgets.

pub mod cost;
pub mod gap;
pub mod generator;
pub mod model;
pub mod orchestrator;
pub mod score;
pub mod store;
pub mod validator;

// Re-export the pipeline entry points for ergonomic use
pub use orchestrator::{OptimizationRequest, Orchestrator, RunResult};

/// Identifier type used for employees, variants, sites, and rules.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
///
/// Used for run and request identifiers only; variant ids are deterministic
/// sequence numbers so ranked output is reproducible under a fixed seed.
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
