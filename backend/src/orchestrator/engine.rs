//! Orchestrator Engine
//!
//! Drives the scheduling cycle and owns in-flight instruction bookkeeping.
//!
//! # Architecture
//!
//! ```text
//! For each tick t (called from the authoritative thread):
//! 0. Refresh cache from inventory update sources (events, polling)
//! 1. Commit: drain solver outcomes of tick t-1, revalidate each instruction
//!    against the live cache and live courier state, assign or drop
//! 2. Execute: step the courier state machine for every busy courier
//! 3. Snapshot + solve: if no solve is outstanding, snapshot supply, drain
//!    demand, list idle couriers and hand the job to the solver worker
//! 4. Advance time
//! ```
//!
//! Instructions solved at tick t are committed at tick t+1 at the earliest,
//! never within the same tick.
//!
//! # Example
//!
//! ```rust
//! use courier_logistics_core::world::sim::SimWorld;
//! use courier_logistics_core::{
//!     BlockPos, Courier, ItemRequest, LogisticsConfig, Orchestrator, SolverMode, WarehouseLocation,
//! };
//!
//! let config = LogisticsConfig {
//!     solver_mode: SolverMode::Inline,
//!     ..LogisticsConfig::default()
//! };
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! let mut world = SimWorld::new();
//!
//! let a = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
//! let b = WarehouseLocation::new(1, "overworld", BlockPos::new(6, 64, 0));
//! for location in [&a, &b] {
//!     world.add_container(location.clone(), None);
//!     orchestrator.register_warehouse(location);
//! }
//! world.set_stock(&a, "wood", 20);
//! world.add_courier(Courier::new(1, 1, BlockPos::new(1, 64, 0), 16));
//!
//! orchestrator.submit_request(ItemRequest::new(1, "wood", 5, b, 0).unwrap());
//!
//! orchestrator.tick(&mut world).unwrap(); // refresh + snapshot + solve
//! let result = orchestrator.tick(&mut world).unwrap(); // commit
//! assert_eq!(result.committed, 1);
//! assert_eq!(orchestrator.active_instructions().count(), 1);
//! ```

use crate::cache::inventory::InventoryCache;
use crate::cache::sources::{
    apply_updates, ContainerEventSender, ContainerEventSource, InventoryUpdateSource, PollingSource,
};
use crate::core::time::TimeManager;
use crate::courier::{CourierStateMachine, CourierStep, InstructionBoard};
use crate::demand::DemandQueue;
use crate::models::courier::{CourierError, CourierInfo, CourierState};
use crate::models::event::{DropReason, Event, EventLog, FailureReason};
use crate::models::instruction::{InstructionId, TransportInstruction};
use crate::models::item::ItemId;
use crate::models::location::{AgentId, WarehouseLocation, ZoneId};
use crate::models::request::{ItemRequest, Priority, RequestError, RequestId};
use crate::orchestrator::config::{DemandRetention, LogisticsConfig};
use crate::orchestrator::ledger::InstructionLedger;
use crate::orchestrator::worker::{SolveFn, SolveJob, SolveOutcome, SolverWorker};
use crate::solver;
use crate::world::World;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ============================================================================
// Error & Result Types
// ============================================================================

/// Errors surfaced by the orchestrator API
#[derive(Debug, Error)]
pub enum LogisticsError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Instruction not found: {0}")]
    InstructionNotFound(InstructionId),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("Courier error: {0}")]
    Courier(#[from] CourierError),

    #[error("Failed to start solver worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickResult {
    pub tick: usize,
    /// Warehouses refreshed from update sources
    pub refreshed: usize,
    /// Instructions that passed revalidation
    pub committed: usize,
    /// Instructions rejected at commit
    pub dropped: usize,
    /// Requests put back into the demand queue
    pub requeued: usize,
    pub completed: usize,
    pub failed: usize,
    /// A new solve was handed to the worker this tick
    pub solve_started: bool,
}

/// Observability counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogisticsStats {
    pub requests_submitted: u64,
    pub requests_processed: u64,
    pub requests_requeued: u64,
    pub solves_started: u64,
    pub solves_failed: u64,
    pub instructions_generated: u64,
    pub instructions_committed: u64,
    pub instructions_dropped: u64,
    pub instructions_completed: u64,
    pub instructions_failed: u64,
    pub last_solve_duration_micros: Option<u64>,
    pub active_instructions: usize,
    pub pending_requests: usize,
    pub solve_in_progress: bool,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    config: LogisticsConfig,
    time_manager: TimeManager,
    cache: Arc<InventoryCache>,
    demand: Arc<DemandQueue>,
    worker: SolverWorker,
    ledger: InstructionLedger,
    couriers: CourierStateMachine,
    sources: Vec<Box<dyn InventoryUpdateSource>>,
    event_log: EventLog,
    stats: LogisticsStats,
    /// Per-tick tallies, reset at the start of every tick
    tally: TickResult,
}

impl Orchestrator {
    /// Create an orchestrator running the greedy matcher
    ///
    /// # Errors
    ///
    /// * `LogisticsError::InvalidConfig` - configuration failed validation
    /// * `LogisticsError::WorkerSpawn` - background solver thread could not start
    pub fn new(config: LogisticsConfig) -> Result<Self, LogisticsError> {
        Self::with_solver(config, solver::plan)
    }

    /// Create an orchestrator running a custom matching function
    pub fn with_solver(config: LogisticsConfig, solve: SolveFn) -> Result<Self, LogisticsError> {
        config.validate().map_err(LogisticsError::InvalidConfig)?;

        let worker =
            SolverWorker::start(config.solver_mode, solve).map_err(LogisticsError::WorkerSpawn)?;

        let mut sources: Vec<Box<dyn InventoryUpdateSource>> = Vec::new();
        if let Some(interval) = config.poll_interval_ticks {
            sources.push(Box::new(PollingSource::new(interval)));
        }

        info!(
            solver_mode = ?config.solver_mode,
            demand_retention = ?config.demand_retention,
            poll_interval_ticks = ?config.poll_interval_ticks,
            "logistics orchestrator started"
        );

        Ok(Self {
            couriers: CourierStateMachine::new(config.courier.clone()),
            event_log: EventLog::with_capacity(config.event_log_capacity),
            config,
            time_manager: TimeManager::new(),
            cache: Arc::new(InventoryCache::new()),
            demand: Arc::new(DemandQueue::new()),
            worker,
            ledger: InstructionLedger::new(),
            sources,
            stats: LogisticsStats::default(),
            tally: TickResult::default(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_tick(&self) -> usize {
        self.time_manager.current_tick()
    }

    pub fn config(&self) -> &LogisticsConfig {
        &self.config
    }

    pub fn cache(&self) -> &InventoryCache {
        &self.cache
    }

    pub fn demand(&self) -> &DemandQueue {
        &self.demand
    }

    /// Shared queue handle for submitters on other threads
    pub fn demand_handle(&self) -> Arc<DemandQueue> {
        Arc::clone(&self.demand)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn is_solving(&self) -> bool {
        self.worker.is_busy()
    }

    /// Observability counters at this instant
    pub fn stats(&self) -> LogisticsStats {
        LogisticsStats {
            requests_submitted: self.demand.requests_submitted(),
            requests_processed: self.demand.requests_processed(),
            active_instructions: self.ledger.len(),
            pending_requests: self.demand.pending(),
            solve_in_progress: self.worker.is_busy(),
            ..self.stats.clone()
        }
    }

    // ========================================================================
    // Warehouses & update sources
    // ========================================================================

    pub fn register_warehouse(&self, location: &WarehouseLocation) {
        self.cache.register_warehouse(location, self.current_tick());
    }

    pub fn unregister_warehouse(&self, location: &WarehouseLocation) -> bool {
        self.cache.unregister_warehouse(location.zone, &location.pos)
    }

    pub fn add_update_source(&mut self, source: Box<dyn InventoryUpdateSource>) {
        debug!(source = source.name(), "inventory update source added");
        self.sources.push(source);
    }

    /// Add an event-driven update source and return the sender the host
    /// should notify on container changes
    pub fn enable_container_events(&mut self) -> ContainerEventSender {
        let source = ContainerEventSource::new();
        let sender = source.sender();
        self.add_update_source(Box::new(source));
        sender
    }

    // ========================================================================
    // Demand
    // ========================================================================

    /// Enqueue a request for the next snapshot
    pub fn submit_request(&mut self, request: ItemRequest) -> RequestId {
        let id = request.id();
        self.log_event(Event::RequestSubmitted {
            tick: self.current_tick(),
            request_id: id,
            item_id: request.item_id().to_string(),
            quantity: request.quantity(),
        });
        self.demand.submit(request);
        id
    }

    /// Build and enqueue a request created at the current tick
    pub fn request_items(
        &mut self,
        zone: ZoneId,
        item_id: impl Into<ItemId>,
        quantity: u32,
        destination: WarehouseLocation,
        priority: Priority,
    ) -> Result<RequestId, LogisticsError> {
        let request = ItemRequest::new(zone, item_id, quantity, destination, self.current_tick())?
            .with_priority(priority);
        Ok(self.submit_request(request))
    }

    fn requeue(&mut self, request: ItemRequest) {
        self.log_event(Event::RequestRequeued {
            tick: self.current_tick(),
            request_id: request.id(),
            quantity: request.quantity(),
        });
        self.stats.requests_requeued += 1;
        self.tally.requeued += 1;
        self.demand.requeue(request);
    }

    // ========================================================================
    // Active instructions
    // ========================================================================

    pub fn get_active_instruction(&self, id: InstructionId) -> Option<&TransportInstruction> {
        self.ledger.get(id)
    }

    pub fn active_instruction_for(&self, agent_id: AgentId) -> Option<&TransportInstruction> {
        self.ledger.for_agent(agent_id)
    }

    pub fn active_instructions(&self) -> impl Iterator<Item = &TransportInstruction> {
        self.ledger.iter()
    }

    /// Remove a finished instruction from the active table
    ///
    /// The assigned courier notices the removal on its next step.
    pub fn complete_instruction(
        &mut self,
        id: InstructionId,
    ) -> Result<TransportInstruction, LogisticsError> {
        let instruction = self
            .ledger
            .remove(id)
            .ok_or(LogisticsError::InstructionNotFound(id))?;

        info!(
            instruction_id = %id,
            agent_id = instruction.agent_id(),
            item_id = instruction.item_id(),
            quantity = instruction.quantity(),
            "instruction completed"
        );
        self.log_event(Event::InstructionCompleted {
            tick: self.current_tick(),
            instruction_id: id,
            agent_id: instruction.agent_id(),
        });
        self.stats.instructions_completed += 1;
        self.tally.completed += 1;
        Ok(instruction)
    }

    /// Remove a failed instruction from the active table; never retried
    pub fn fail_instruction(
        &mut self,
        id: InstructionId,
        reason: FailureReason,
    ) -> Result<TransportInstruction, LogisticsError> {
        let instruction = self
            .ledger
            .remove(id)
            .ok_or(LogisticsError::InstructionNotFound(id))?;

        warn!(
            instruction_id = %id,
            agent_id = instruction.agent_id(),
            %reason,
            "instruction failed"
        );
        self.log_event(Event::InstructionFailed {
            tick: self.current_tick(),
            instruction_id: id,
            agent_id: instruction.agent_id(),
            reason,
        });
        self.stats.instructions_failed += 1;
        self.tally.failed += 1;
        Ok(instruction)
    }

    /// Block until the outstanding solve (if any) finishes, up to `timeout`
    ///
    /// Returns true if no solve is outstanding.
    pub fn wait_for_solver(&self, timeout: Duration) -> bool {
        self.worker.wait_idle(timeout)
    }

    // ========================================================================
    // Event Logging
    // ========================================================================

    fn log_event(&mut self, event: Event) {
        self.event_log.log(event);
    }

    // ========================================================================
    // Tick Loop Implementation
    // ========================================================================

    /// Execute one scheduling tick
    ///
    /// # Errors
    ///
    /// Currently none of the phases fail the tick; stale instructions, execution
    /// failures and solver failures are recorded as events and counters. The
    /// `Result` keeps room for host-facing failures.
    pub fn tick<W: World>(&mut self, world: &mut W) -> Result<TickResult, LogisticsError> {
        let current_tick = self.current_tick();
        self.tally = TickResult {
            tick: current_tick,
            ..TickResult::default()
        };

        // STEP 0: REFRESH
        // Pull fresh container contents from every update source
        for source in &mut self.sources {
            let updates = source.collect(current_tick, &*world, &self.cache);
            self.tally.refreshed += apply_updates(&self.cache, updates, current_tick);
        }

        // STEP 1: COMMIT
        // Outcomes of the previous solve, revalidated against live state
        for outcome in self.worker.drain_outcomes() {
            self.commit_outcome(outcome, world);
        }

        // STEP 2: EXECUTE
        // Active instructions whose courier vanished or let go fail first,
        // then every courier that is not idle is stepped
        self.reconcile_couriers(&*world);
        let busy: Vec<AgentId> = world
            .courier_ids()
            .into_iter()
            .filter(|id| {
                world
                    .courier(*id)
                    .is_some_and(|courier| courier.state() != CourierState::Idle)
            })
            .collect();
        let cache = Arc::clone(&self.cache);
        let machine = self.couriers.clone();
        for agent_id in busy {
            let step = machine.step(agent_id, world, &cache, self, current_tick);
            if let CourierStep::Failed(reason) = &step {
                debug!(agent_id, %reason, "courier step failed");
            }
        }

        // STEP 3: SNAPSHOT + SOLVE
        // Single-slot guard: skipped while a solve is outstanding
        if !self.worker.is_busy() {
            self.start_solve(world);
        }

        // STEP 4: ADVANCE TIME
        self.time_manager.advance_tick();

        Ok(self.tally.clone())
    }

    fn reconcile_couriers<W: World>(&mut self, world: &W) {
        let lost: Vec<InstructionId> = self
            .ledger
            .iter()
            .filter(|instruction| {
                world.courier(instruction.agent_id()).map_or(true, |courier| {
                    courier.active_instruction() != Some(instruction.id())
                        || !courier.state().is_executing()
                })
            })
            .map(TransportInstruction::id)
            .collect();
        for id in lost {
            let _ = self.fail_instruction(id, FailureReason::CourierLost);
        }
    }

    fn start_solve<W: World>(&mut self, world: &W) {
        let current_tick = self.current_tick();
        let demand = self.demand.drain_snapshot();
        if demand.is_empty() {
            return;
        }

        let couriers: Vec<CourierInfo> = world
            .courier_ids()
            .into_iter()
            .filter_map(|id| world.courier(id))
            .filter(|courier| courier.is_idle() && !self.ledger.has_agent(courier.id()))
            .map(|courier| courier.info())
            .collect();
        let job = SolveJob {
            tick: current_tick,
            supply: self.cache.snapshot(),
            demand,
            couriers,
        };

        let requests = job.demand.len();
        let courier_count = job.couriers.len();
        match self.worker.try_submit(job) {
            Ok(()) => {
                debug!(tick = current_tick, requests, couriers = courier_count, "solve started");
                self.log_event(Event::SolveStarted {
                    tick: current_tick,
                    requests,
                    couriers: courier_count,
                });
                self.stats.solves_started += 1;
                self.tally.solve_started = true;
            }
            Err(job) => {
                // Guard raced or worker gone; keep the demand for the next tick
                warn!(tick = current_tick, requests, "solver unavailable, demand returned to queue");
                for request in job.demand.requests() {
                    self.demand.requeue(request.clone());
                }
            }
        }
    }

    fn commit_outcome<W: World>(&mut self, outcome: SolveOutcome, world: &mut W) {
        let current_tick = self.current_tick();
        let duration_micros = u64::try_from(outcome.duration.as_micros()).unwrap_or(u64::MAX);
        self.stats.last_solve_duration_micros = Some(duration_micros);

        let plan = match outcome.result {
            Ok(plan) => plan,
            Err(failure) => {
                error!(
                    solve_tick = outcome.tick,
                    reason = %failure.reason,
                    "solver failed; no instructions this cycle"
                );
                self.log_event(Event::SolveFailed {
                    tick: current_tick,
                    reason: failure.reason,
                });
                self.stats.solves_failed += 1;
                if self.config.demand_retention == DemandRetention::Requeue {
                    for request in failure.unsolved {
                        self.requeue(request);
                    }
                }
                return;
            }
        };

        info!(
            solve_tick = outcome.tick,
            instructions = plan.instructions.len(),
            unserved = plan.residual.len(),
            duration_micros,
            "solve completed"
        );
        self.log_event(Event::SolveCompleted {
            tick: current_tick,
            instructions: plan.instructions.len(),
            duration_micros,
        });
        self.stats.instructions_generated += plan.instructions.len() as u64;

        for instruction in plan.instructions {
            self.commit_instruction(instruction, world);
        }

        if self.config.demand_retention == DemandRetention::Requeue {
            for request in plan.residual {
                self.requeue(request);
            }
        }
    }

    fn validate<W: World>(&self, instruction: &TransportInstruction, world: &W) -> Result<(), DropReason> {
        let source = instruction.source();
        let available = self
            .cache
            .quantity_at(source.zone, &source.pos, instruction.item_id());
        if available < instruction.quantity() {
            return Err(DropReason::SourceDepleted {
                available,
                required: instruction.quantity(),
            });
        }

        let courier = world
            .courier(instruction.agent_id())
            .ok_or(DropReason::CourierMissing)?;
        if !courier.is_idle() || self.ledger.has_agent(instruction.agent_id()) {
            return Err(DropReason::CourierBusy);
        }
        Ok(())
    }

    fn commit_instruction<W: World>(&mut self, instruction: TransportInstruction, world: &mut W) {
        let current_tick = self.current_tick();
        let id = instruction.id();
        let agent_id = instruction.agent_id();

        let assigned = self.validate(&instruction, world).and_then(|()| {
            world
                .courier_mut(agent_id)
                .ok_or(DropReason::CourierMissing)?
                .assign(id, current_tick)
                .map_err(|_| DropReason::CourierBusy)
        });

        if let Err(reason) = assigned {
            self.drop_instruction(instruction, reason);
            return;
        }

        let quantity = instruction.quantity();
        if let Err(rejected) = self.ledger.insert(instruction) {
            // Courier was idle but the table disagrees; undo the assignment
            if let Some(courier) = world.courier_mut(agent_id) {
                courier.release(current_tick);
            }
            self.drop_instruction(rejected, DropReason::CourierBusy);
            return;
        }

        debug!(instruction_id = %id, agent_id, quantity, "instruction committed");
        self.log_event(Event::InstructionCommitted {
            tick: current_tick,
            instruction_id: id,
            agent_id,
            quantity,
        });
        self.log_event(Event::CourierTransition {
            tick: current_tick,
            agent_id,
            from: CourierState::Idle,
            to: CourierState::MovingToSource,
        });
        self.stats.instructions_committed += 1;
        self.tally.committed += 1;
    }

    fn drop_instruction(&mut self, instruction: TransportInstruction, reason: DropReason) {
        debug!(
            instruction_id = %instruction.id(),
            agent_id = instruction.agent_id(),
            %reason,
            "stale instruction dropped"
        );
        self.log_event(Event::InstructionDropped {
            tick: self.current_tick(),
            instruction_id: instruction.id(),
            agent_id: instruction.agent_id(),
            reason,
        });
        self.stats.instructions_dropped += 1;
        self.tally.dropped += 1;

        if self.config.demand_retention == DemandRetention::Requeue {
            self.requeue(instruction.to_request());
        }
    }
}

impl InstructionBoard for Orchestrator {
    fn active_instruction(&self, id: InstructionId) -> Option<TransportInstruction> {
        self.ledger.get(id).cloned()
    }

    fn complete(&mut self, id: InstructionId) {
        // Absent means someone already resolved it; nothing left to record
        let _ = self.complete_instruction(id);
    }

    fn fail(&mut self, id: InstructionId, reason: FailureReason) {
        let _ = self.fail_instruction(id, reason);
    }

    fn record(&mut self, event: Event) {
        self.log_event(event);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tick", &self.current_tick())
            .field("active_instructions", &self.ledger.len())
            .field("pending_requests", &self.demand.pending())
            .field("worker", &self.worker)
            .finish()
    }
}
