//! External collaborator boundary
//!
//! The engine never owns physical containers, agents or movement. It reaches
//! them through three narrow traits, implemented by the host (a game server, a
//! simulator) and by [`sim::SimWorld`] for tests and the CLI harness.
//!
//! All trait methods are called from the authoritative context only.

pub mod sim;

use crate::models::courier::Courier;
use crate::models::item::ItemEntry;
use crate::models::location::{AgentId, BlockPos, WarehouseLocation};
use thiserror::Error;

/// Failure reported by physical container access
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// Container unloaded, destroyed or otherwise unreachable
    #[error("container at {location} is not accessible")]
    NotAccessible { location: WarehouseLocation },

    /// Not enough free space for the whole insert
    #[error("container at {location} is full ({free} free, {requested} requested)")]
    Full {
        location: WarehouseLocation,
        free: u32,
        requested: u32,
    },
}

/// Physical inventory of warehouses
pub trait ContainerAccess {
    /// Current physical contents
    fn contents(&self, location: &WarehouseLocation) -> Result<Vec<ItemEntry>, ContainerError>;

    /// Remove up to `quantity` of an item; returns the amount actually removed
    fn remove_items(
        &mut self,
        location: &WarehouseLocation,
        item_id: &str,
        quantity: u32,
    ) -> Result<u32, ContainerError>;

    /// Insert exactly `quantity` of an item, or nothing (`ContainerError::Full`)
    fn insert_items(
        &mut self,
        location: &WarehouseLocation,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), ContainerError>;
}

/// Authoritative agent store
pub trait CourierRegistry {
    /// Ids of every known courier, in ascending order
    fn courier_ids(&self) -> Vec<AgentId>;

    fn courier(&self, agent_id: AgentId) -> Option<&Courier>;

    fn courier_mut(&mut self, agent_id: AgentId) -> Option<&mut Courier>;
}

/// Result of one locomotion step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    /// Agent advanced (or is already standing on the target)
    Moving,
    /// Agent could not advance this tick
    Blocked,
    /// Agent unknown to the locomotion layer
    UnknownAgent,
}

/// Incremental agent movement
pub trait Locomotion {
    /// Move the agent one step towards `target`
    fn move_towards(&mut self, agent_id: AgentId, target: BlockPos) -> MoveStatus;
}

/// Everything the scheduling tick needs from the host
pub trait World: ContainerAccess + CourierRegistry + Locomotion {}

impl<T: ContainerAccess + CourierRegistry + Locomotion> World for T {}
