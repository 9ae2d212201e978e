//! Orchestrator - the scheduling cycle
//!
//! See `engine.rs` for the tick loop; `worker.rs` runs the solver off the
//! authoritative thread and `ledger.rs` tracks in-flight instructions.

pub mod config;
pub mod engine;
pub mod ledger;
pub mod worker;

// Re-export main types for convenience
pub use config::{CourierConfig, DemandRetention, LogisticsConfig, SolverMode};
pub use engine::{LogisticsError, LogisticsStats, Orchestrator, TickResult};
pub use ledger::InstructionLedger;
pub use worker::{SolveFailure, SolveFn, SolveJob, SolveOutcome, SolverWorker};
