//! Courier Logistics Core - scheduling engine
//!
//! Matches item demand against cached warehouse supply and executes the
//! resulting transport instructions with mobile couriers.
//!
//! # Architecture
//!
//! - **models**: Domain types (locations, items, requests, instructions, couriers, events)
//! - **cache**: Concurrent inventory cache, supply snapshots, update sources
//! - **demand**: Concurrent request queue and sorted demand snapshots
//! - **solver**: Pure greedy matcher
//! - **orchestrator**: Snapshot → background solve → validate & commit cycle
//! - **courier**: Per-courier delivery state machine
//! - **world**: Traits for containers, agents and locomotion, plus an in-memory world
//! - **arrivals**: Seeded demand generation
//! - **core** / **rng**: Tick clock and deterministic randomness
//!
//! # Critical Invariants
//!
//! 1. At most one active instruction per courier; assignment requires idleness
//! 2. Stored quantities are strictly positive
//! 3. At most one solve in flight; its output is committed on a later tick
//! 4. The solver is pure and deterministic

// Module declarations
pub mod arrivals;
pub mod cache;
pub mod core;
pub mod courier;
pub mod demand;
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod solver;
pub mod world;

// Re-exports for convenience
pub use cache::{InventoryCache, SupplySnapshot, WarehouseSupply};
pub use crate::core::TimeManager;
pub use courier::{CourierStateMachine, CourierStep, InstructionBoard};
pub use demand::{DemandQueue, DemandSnapshot};
pub use models::{
    courier::{Courier, CourierError, CourierInfo, CourierState},
    event::{DropReason, Event, EventLog, FailureReason},
    instruction::{InstructionId, TransportInstruction},
    item::{CachedInventory, ItemEntry, ItemId},
    location::{AgentId, BlockPos, WarehouseLocation, WorldId, ZoneId},
    request::{ItemRequest, Priority, RequestError, RequestId, RequestType},
};
pub use orchestrator::{
    CourierConfig, DemandRetention, LogisticsConfig, LogisticsError, LogisticsStats, Orchestrator,
    SolverMode, TickResult,
};
pub use rng::RngManager;
pub use solver::{plan, solve, SolvePlan};
pub use world::{ContainerAccess, ContainerError, CourierRegistry, Locomotion, MoveStatus, World};
