//! Courier (transport agent) model
//!
//! Represents a mobile agent that carries items between warehouses.
//! Role and availability are explicit fields on the record:
//! - `idle` - available for assignment (no active instruction)
//! - `active_instruction` - the one instruction this courier is executing
//! - `state` - delivery phase, driven by the courier state machine
//!
//! # Critical Invariants
//!
//! 1. **Single assignment**: at most one active instruction per courier
//! 2. **Assignment requires idleness**: `assign` fails unless the courier is idle
//! 3. **Carried quantities > 0**: emptied stacks are removed from `carried`

use crate::models::instruction::InstructionId;
use crate::models::item::{ItemEntry, ItemId};
use crate::models::location::{AgentId, BlockPos, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Delivery phase of a courier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourierState {
    #[default]
    Idle,
    MovingToSource,
    PickingUp,
    MovingToDest,
    Depositing,
    Returning,
}

impl CourierState {
    /// States in which the courier works on an active instruction
    pub fn is_executing(&self) -> bool {
        matches!(
            self,
            CourierState::MovingToSource
                | CourierState::PickingUp
                | CourierState::MovingToDest
                | CourierState::Depositing
        )
    }
}

impl fmt::Display for CourierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CourierState::Idle => "IDLE",
            CourierState::MovingToSource => "MOVING_TO_SOURCE",
            CourierState::PickingUp => "PICKING_UP",
            CourierState::MovingToDest => "MOVING_TO_DEST",
            CourierState::Depositing => "DEPOSITING",
            CourierState::Returning => "RETURNING",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during courier operations
#[derive(Debug, Error, PartialEq)]
pub enum CourierError {
    #[error("Courier {agent_id} is not idle (state {state})")]
    NotIdle { agent_id: AgentId, state: CourierState },

    #[error("Courier {agent_id} carries {carried} of {item_id}, cannot drop {requested}")]
    InsufficientCarried {
        agent_id: AgentId,
        item_id: ItemId,
        carried: u32,
        requested: u32,
    },
}

/// Point-in-time read of an idle courier, handed to the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierInfo {
    pub agent_id: AgentId,
    pub zone: ZoneId,
    pub position: BlockPos,
    pub carry_capacity: u32,
}

/// Authoritative courier record
///
/// # Example
/// ```
/// use courier_logistics_core::{BlockPos, Courier, CourierState};
///
/// let courier = Courier::new(1, 10, BlockPos::new(0, 64, 0), 16);
/// assert!(courier.is_idle());
/// assert_eq!(courier.state(), CourierState::Idle);
/// assert_eq!(courier.carry_capacity(), 16);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    id: AgentId,
    zone: ZoneId,
    position: BlockPos,
    carry_capacity: u32,

    /// Available for a new assignment
    idle: bool,

    /// Instruction currently executed (None while idle or returning)
    active_instruction: Option<InstructionId>,

    state: CourierState,

    /// Tick at which `state` was entered (drives action waits and timeouts)
    state_entered_at: usize,

    /// Items in hand, keyed by item id, all quantities > 0
    carried: BTreeMap<ItemId, u32>,

    /// Optional point to walk back to after a delivery
    home: Option<BlockPos>,
}

impl Courier {
    pub fn new(id: AgentId, zone: ZoneId, position: BlockPos, carry_capacity: u32) -> Self {
        Self {
            id,
            zone,
            position,
            carry_capacity,
            idle: true,
            active_instruction: None,
            state: CourierState::Idle,
            state_entered_at: 0,
            carried: BTreeMap::new(),
            home: None,
        }
    }

    pub fn with_home(mut self, home: BlockPos) -> Self {
        self.home = Some(home);
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn position(&self) -> BlockPos {
        self.position
    }

    pub fn set_position(&mut self, position: BlockPos) {
        self.position = position;
    }

    pub fn carry_capacity(&self) -> u32 {
        self.carry_capacity
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn active_instruction(&self) -> Option<InstructionId> {
        self.active_instruction
    }

    pub fn state(&self) -> CourierState {
        self.state
    }

    pub fn state_entered_at(&self) -> usize {
        self.state_entered_at
    }

    pub fn home(&self) -> Option<BlockPos> {
        self.home
    }

    /// Snapshot for the solver
    pub fn info(&self) -> CourierInfo {
        CourierInfo {
            agent_id: self.id,
            zone: self.zone,
            position: self.position,
            carry_capacity: self.carry_capacity,
        }
    }

    /// Take an instruction: idle -> assigned, enters MOVING_TO_SOURCE
    ///
    /// # Errors
    ///
    /// `CourierError::NotIdle` if the courier already works on something.
    pub fn assign(&mut self, instruction_id: InstructionId, tick: usize) -> Result<(), CourierError> {
        if !self.idle || self.active_instruction.is_some() {
            return Err(CourierError::NotIdle {
                agent_id: self.id,
                state: self.state,
            });
        }

        self.idle = false;
        self.active_instruction = Some(instruction_id);
        self.enter(CourierState::MovingToSource, tick);
        Ok(())
    }

    /// Move to another state and restart the state clock
    pub fn enter(&mut self, state: CourierState, tick: usize) {
        self.state = state;
        self.state_entered_at = tick;
    }

    /// Drop the instruction reference but stay busy (delivery done, returning)
    pub fn clear_instruction(&mut self) {
        self.active_instruction = None;
    }

    /// Back to IDLE and available for assignment
    pub fn release(&mut self, tick: usize) {
        self.active_instruction = None;
        self.idle = true;
        self.enter(CourierState::Idle, tick);
    }

    /// Ticks spent in the current state
    pub fn ticks_in_state(&self, now: usize) -> usize {
        now.saturating_sub(self.state_entered_at)
    }

    pub fn carried(&self) -> Vec<ItemEntry> {
        self.carried
            .iter()
            .map(|(item_id, qty)| ItemEntry::new(item_id.clone(), *qty))
            .collect()
    }

    pub fn carried_quantity(&self, item_id: &str) -> u32 {
        self.carried.get(item_id).copied().unwrap_or(0)
    }

    pub fn add_carried(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let slot = self.carried.entry(item_id.to_string()).or_insert(0);
        *slot = slot.saturating_add(quantity);
    }

    pub fn remove_carried(&mut self, item_id: &str, quantity: u32) -> Result<(), CourierError> {
        let carried = self.carried_quantity(item_id);
        if quantity > carried {
            return Err(CourierError::InsufficientCarried {
                agent_id: self.id,
                item_id: item_id.to_string(),
                carried,
                requested: quantity,
            });
        }

        if carried == quantity {
            self.carried.remove(item_id);
        } else if let Some(slot) = self.carried.get_mut(item_id) {
            *slot -= quantity;
        }
        Ok(())
    }

    /// Empty the hands; returns what was discarded
    pub fn clear_carried(&mut self) -> Vec<ItemEntry> {
        let residual = self.carried();
        self.carried.clear();
        residual
    }
}
