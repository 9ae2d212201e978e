//! Courier State Machine
//!
//! Walks one courier through its assigned instruction, one step per tick:
//!
//! ```text
//! IDLE ─assign─> MOVING_TO_SOURCE ─arrive─> PICKING_UP ─wait+remove─> MOVING_TO_DEST
//!                                                                        │ arrive
//! IDLE <─────────── RETURNING <──────wait+insert, complete────── DEPOSITING
//! ```
//!
//! Any state other than IDLE times out after `state_timeout_ticks`; the
//! instruction (if any) fails with "state timeout" and the courier is forced
//! back to IDLE. A missing instruction is an implicit cancellation.
//!
//! # Critical Invariants
//!
//! 1. **Cache follows the world**: after every physical pickup or deposit the
//!    cache entry of exactly that warehouse is refreshed before returning
//! 2. **Nothing silently vanishes**: a failed deposit keeps the carried items
//! 3. **Live lookups**: the instruction is re-read from the board every step

use crate::cache::inventory::InventoryCache;
use crate::models::courier::CourierState;
use crate::models::event::{Event, FailureReason};
use crate::models::instruction::{InstructionId, TransportInstruction};
use crate::models::location::{AgentId, BlockPos, WarehouseLocation};
use crate::orchestrator::config::CourierConfig;
use crate::world::{ContainerError, World};
use tracing::{debug, warn};

/// The state machine's view of the orchestrator's active instructions
pub trait InstructionBoard {
    /// Live lookup; `None` means the instruction was invalidated
    fn active_instruction(&self, id: InstructionId) -> Option<TransportInstruction>;

    /// Delivery finished
    fn complete(&mut self, id: InstructionId);

    /// Execution failed; no retry
    fn fail(&mut self, id: InstructionId, reason: FailureReason);

    /// Record a domain event
    fn record(&mut self, event: Event);
}

/// What one step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourierStep {
    /// Courier idle or unknown; nothing to do
    Idle,
    /// Moving, waiting, or changed phase
    Working,
    /// Items deposited and instruction completed
    Delivered,
    /// Instruction failed and courier forced back to IDLE
    Failed(FailureReason),
    /// Instruction gone; courier released
    Cancelled,
    /// Courier finished returning and is available again
    Released,
}

#[derive(Debug, Clone)]
pub struct CourierStateMachine {
    config: CourierConfig,
}

impl CourierStateMachine {
    pub fn new(config: CourierConfig) -> Self {
        Self { config }
    }

    fn arrived(&self, position: BlockPos, target: BlockPos) -> bool {
        let reach = i64::from(self.config.arrival_distance);
        position.distance_sq(&target) <= reach * reach
    }

    /// Advance one courier by one tick
    pub fn step<W, B>(
        &self,
        agent_id: AgentId,
        world: &mut W,
        cache: &InventoryCache,
        board: &mut B,
        tick: usize,
    ) -> CourierStep
    where
        W: World,
        B: InstructionBoard,
    {
        let Some(courier) = world.courier(agent_id) else {
            return CourierStep::Idle;
        };
        let state = courier.state();
        if state == CourierState::Idle {
            return CourierStep::Idle;
        }

        if courier.ticks_in_state(tick) > self.config.state_timeout_ticks {
            let instruction = courier.active_instruction();
            warn!(agent_id, %state, "courier timed out");
            if let Some(id) = instruction {
                board.fail(id, FailureReason::StateTimeout);
            }
            release(world, board, agent_id, tick);
            return CourierStep::Failed(FailureReason::StateTimeout);
        }

        if state == CourierState::Returning {
            return self.step_returning(agent_id, world, board, tick);
        }

        let Some(instruction) = courier
            .active_instruction()
            .and_then(|id| board.active_instruction(id))
        else {
            debug!(agent_id, %state, "instruction no longer active, releasing courier");
            release(world, board, agent_id, tick);
            return CourierStep::Cancelled;
        };

        match state {
            CourierState::MovingToSource => self.step_moving(
                agent_id,
                world,
                board,
                instruction.source(),
                CourierState::PickingUp,
                tick,
            ),
            CourierState::PickingUp => self.step_pickup(agent_id, world, cache, board, &instruction, tick),
            CourierState::MovingToDest => self.step_moving(
                agent_id,
                world,
                board,
                instruction.destination(),
                CourierState::Depositing,
                tick,
            ),
            CourierState::Depositing => {
                self.step_deposit(agent_id, world, cache, board, &instruction, tick)
            }
            CourierState::Idle | CourierState::Returning => CourierStep::Idle,
        }
    }

    fn step_moving<W: World, B: InstructionBoard>(
        &self,
        agent_id: AgentId,
        world: &mut W,
        board: &mut B,
        target: &WarehouseLocation,
        on_arrival: CourierState,
        tick: usize,
    ) -> CourierStep {
        let goal = target.pos.offset(&self.config.approach_offset);
        let at_goal = world
            .courier(agent_id)
            .is_some_and(|courier| self.arrived(courier.position(), goal));

        if at_goal {
            transition(world, board, agent_id, on_arrival, tick);
        } else {
            world.move_towards(agent_id, goal);
        }
        CourierStep::Working
    }

    fn action_pending<W: World>(&self, world: &W, agent_id: AgentId, tick: usize) -> bool {
        world
            .courier(agent_id)
            .is_some_and(|courier| courier.ticks_in_state(tick) < self.config.action_duration_ticks)
    }

    fn step_pickup<W: World, B: InstructionBoard>(
        &self,
        agent_id: AgentId,
        world: &mut W,
        cache: &InventoryCache,
        board: &mut B,
        instruction: &TransportInstruction,
        tick: usize,
    ) -> CourierStep {
        if self.action_pending(world, agent_id, tick) {
            return CourierStep::Working;
        }

        let source = instruction.source();
        let removed = match world.remove_items(source, instruction.item_id(), instruction.quantity()) {
            Ok(0) => {
                refresh(world, cache, source, tick);
                return fail(world, board, agent_id, instruction, FailureReason::InsufficientStock, tick);
            }
            Ok(removed) => removed,
            Err(_) => {
                return fail(world, board, agent_id, instruction, FailureReason::SourceInaccessible, tick);
            }
        };

        if let Some(courier) = world.courier_mut(agent_id) {
            courier.add_carried(instruction.item_id(), removed);
        }
        refresh(world, cache, source, tick);

        if removed < instruction.quantity() {
            debug!(
                agent_id,
                requested = instruction.quantity(),
                removed,
                "partial pickup accepted"
            );
        }
        board.record(Event::PickedUp {
            tick,
            agent_id,
            source: source.clone(),
            item_id: instruction.item_id().to_string(),
            quantity: removed,
        });
        transition(world, board, agent_id, CourierState::MovingToDest, tick);
        CourierStep::Working
    }

    fn step_deposit<W: World, B: InstructionBoard>(
        &self,
        agent_id: AgentId,
        world: &mut W,
        cache: &InventoryCache,
        board: &mut B,
        instruction: &TransportInstruction,
        tick: usize,
    ) -> CourierStep {
        if self.action_pending(world, agent_id, tick) {
            return CourierStep::Working;
        }

        let destination = instruction.destination();
        let carried = world
            .courier(agent_id)
            .map(|courier| courier.carried_quantity(instruction.item_id()))
            .unwrap_or(0);
        if carried == 0 {
            return fail(world, board, agent_id, instruction, FailureReason::InsufficientStock, tick);
        }

        match world.insert_items(destination, instruction.item_id(), carried) {
            Ok(()) => {}
            Err(ContainerError::Full { .. }) => {
                return fail(world, board, agent_id, instruction, FailureReason::DestinationFull, tick);
            }
            Err(ContainerError::NotAccessible { .. }) => {
                return fail(
                    world,
                    board,
                    agent_id,
                    instruction,
                    FailureReason::DestinationInaccessible,
                    tick,
                );
            }
        }

        if let Some(courier) = world.courier_mut(agent_id) {
            // Cannot fail: `carried` was read from this courier above
            let _ = courier.remove_carried(instruction.item_id(), carried);
        }
        refresh(world, cache, destination, tick);
        board.record(Event::Deposited {
            tick,
            agent_id,
            destination: destination.clone(),
            item_id: instruction.item_id().to_string(),
            quantity: carried,
        });
        board.complete(instruction.id());

        if let Some(courier) = world.courier_mut(agent_id) {
            let residual = courier.clear_carried();
            if !residual.is_empty() {
                warn!(agent_id, stacks = residual.len(), "discarding residual carried items");
            }
            courier.clear_instruction();
        }
        transition(world, board, agent_id, CourierState::Returning, tick);
        if self.walking_home(world, agent_id).is_none() {
            release(world, board, agent_id, tick);
        }
        CourierStep::Delivered
    }

    /// Home position still to be reached, if any
    fn walking_home<W: World>(&self, world: &W, agent_id: AgentId) -> Option<BlockPos> {
        world.courier(agent_id).and_then(|courier| {
            courier
                .home()
                .filter(|home| !self.arrived(courier.position(), *home))
        })
    }

    fn step_returning<W: World, B: InstructionBoard>(
        &self,
        agent_id: AgentId,
        world: &mut W,
        board: &mut B,
        tick: usize,
    ) -> CourierStep {
        match self.walking_home(world, agent_id) {
            Some(home) => {
                world.move_towards(agent_id, home);
                CourierStep::Working
            }
            None => {
                release(world, board, agent_id, tick);
                CourierStep::Released
            }
        }
    }
}

/// Re-read one container into the cache
fn refresh<W: World>(world: &W, cache: &InventoryCache, location: &WarehouseLocation, tick: usize) {
    match world.contents(location) {
        Ok(items) => {
            cache.update(location, items, tick);
        }
        Err(err) => debug!(%err, "cache refresh skipped"),
    }
}

fn transition<W: World, B: InstructionBoard>(
    world: &mut W,
    board: &mut B,
    agent_id: AgentId,
    to: CourierState,
    tick: usize,
) {
    let Some(courier) = world.courier_mut(agent_id) else {
        return;
    };
    let from = courier.state();
    if to == CourierState::Idle {
        courier.release(tick);
    } else {
        courier.enter(to, tick);
    }
    debug!(agent_id, %from, %to, "courier transition");
    board.record(Event::CourierTransition {
        tick,
        agent_id,
        from,
        to,
    });
}

fn release<W: World, B: InstructionBoard>(world: &mut W, board: &mut B, agent_id: AgentId, tick: usize) {
    transition(world, board, agent_id, CourierState::Idle, tick);
}

fn fail<W: World, B: InstructionBoard>(
    world: &mut W,
    board: &mut B,
    agent_id: AgentId,
    instruction: &TransportInstruction,
    reason: FailureReason,
    tick: usize,
) -> CourierStep {
    board.fail(instruction.id(), reason.clone());
    release(world, board, agent_id, tick);
    CourierStep::Failed(reason)
}
