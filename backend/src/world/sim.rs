//! In-memory reference world
//!
//! Containers with optional capacity and an accessibility toggle, couriers
//! stored by id, and straight-line step movement. Used by the tests and the
//! CLI harness; real hosts implement the `world` traits themselves.

use crate::cache::sources::ContainerEventSender;
use crate::models::courier::Courier;
use crate::models::item::{ItemEntry, ItemId};
use crate::models::location::{AgentId, BlockPos, WarehouseLocation};
use crate::world::{ContainerAccess, ContainerError, CourierRegistry, Locomotion, MoveStatus};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct SimContainer {
    stock: BTreeMap<ItemId, u32>,
    /// Maximum total item count, None = unbounded
    capacity: Option<u32>,
    accessible: bool,
}

impl SimContainer {
    fn total(&self) -> u32 {
        self.stock.values().fold(0u32, |acc, q| acc.saturating_add(*q))
    }

    fn free(&self) -> u32 {
        self.capacity
            .map(|cap| cap.saturating_sub(self.total()))
            .unwrap_or(u32::MAX)
    }
}

/// Simple world implementing every collaborator trait
///
/// # Example
/// ```
/// use courier_logistics_core::world::sim::SimWorld;
/// use courier_logistics_core::world::ContainerAccess;
/// use courier_logistics_core::{BlockPos, WarehouseLocation};
///
/// let mut world = SimWorld::new();
/// let a = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
/// world.add_container(a.clone(), Some(64));
/// world.set_stock(&a, "wood", 20);
///
/// assert_eq!(world.remove_items(&a, "wood", 5), Ok(5));
/// assert_eq!(world.stock(&a, "wood"), 15);
/// ```
#[derive(Debug, Clone)]
pub struct SimWorld {
    containers: BTreeMap<WarehouseLocation, SimContainer>,
    couriers: BTreeMap<AgentId, Courier>,
    /// Blocks moved per axis per tick
    step: i32,
    blocked: BTreeSet<AgentId>,
    notifier: Option<ContainerEventSender>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            containers: BTreeMap::new(),
            couriers: BTreeMap::new(),
            step: 1,
            blocked: BTreeSet::new(),
            notifier: None,
        }
    }

    /// Movement speed in blocks per axis per tick (min 1)
    pub fn with_step(mut self, step: i32) -> Self {
        self.step = step.max(1);
        self
    }

    /// Forward every container change to an event-driven update source
    pub fn attach_notifier(&mut self, sender: ContainerEventSender) {
        self.notifier = Some(sender);
    }

    fn notify(&self, location: &WarehouseLocation) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(location);
        }
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Add an empty container (replaces an existing one)
    pub fn add_container(&mut self, location: WarehouseLocation, capacity: Option<u32>) {
        self.containers.insert(
            location,
            SimContainer {
                stock: BTreeMap::new(),
                capacity,
                accessible: true,
            },
        );
    }

    pub fn remove_container(&mut self, location: &WarehouseLocation) -> bool {
        self.containers.remove(location).is_some()
    }

    /// Overwrite the stock of one item, bypassing capacity (setup helper)
    pub fn set_stock(&mut self, location: &WarehouseLocation, item_id: &str, quantity: u32) {
        let Some(container) = self.containers.get_mut(location) else {
            return;
        };
        if quantity == 0 {
            container.stock.remove(item_id);
        } else {
            container.stock.insert(item_id.to_string(), quantity);
        }
        self.notify(location);
    }

    pub fn stock(&self, location: &WarehouseLocation, item_id: &str) -> u32 {
        self.containers
            .get(location)
            .and_then(|container| container.stock.get(item_id).copied())
            .unwrap_or(0)
    }

    /// Simulate an unloaded or destroyed container
    pub fn set_accessible(&mut self, location: &WarehouseLocation, accessible: bool) {
        if let Some(container) = self.containers.get_mut(location) {
            container.accessible = accessible;
        }
    }

    pub fn container_locations(&self) -> impl Iterator<Item = &WarehouseLocation> {
        self.containers.keys()
    }

    fn accessible_mut(
        &mut self,
        location: &WarehouseLocation,
    ) -> Result<&mut SimContainer, ContainerError> {
        match self.containers.get_mut(location) {
            Some(container) if container.accessible => Ok(container),
            _ => Err(ContainerError::NotAccessible {
                location: location.clone(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Couriers
    // ------------------------------------------------------------------

    pub fn add_courier(&mut self, courier: Courier) {
        self.couriers.insert(courier.id(), courier);
    }

    pub fn remove_courier(&mut self, agent_id: AgentId) -> Option<Courier> {
        self.blocked.remove(&agent_id);
        self.couriers.remove(&agent_id)
    }

    /// Blocked couriers cannot move (drives state timeouts in tests)
    pub fn set_blocked(&mut self, agent_id: AgentId, blocked: bool) {
        if blocked {
            self.blocked.insert(agent_id);
        } else {
            self.blocked.remove(&agent_id);
        }
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerAccess for SimWorld {
    fn contents(&self, location: &WarehouseLocation) -> Result<Vec<ItemEntry>, ContainerError> {
        match self.containers.get(location) {
            Some(container) if container.accessible => Ok(container
                .stock
                .iter()
                .map(|(item_id, qty)| ItemEntry::new(item_id.clone(), *qty))
                .collect()),
            _ => Err(ContainerError::NotAccessible {
                location: location.clone(),
            }),
        }
    }

    fn remove_items(
        &mut self,
        location: &WarehouseLocation,
        item_id: &str,
        quantity: u32,
    ) -> Result<u32, ContainerError> {
        let container = self.accessible_mut(location)?;
        let held = container.stock.get(item_id).copied().unwrap_or(0);
        let removed = held.min(quantity);
        if removed == 0 {
            return Ok(0);
        }

        if removed == held {
            container.stock.remove(item_id);
        } else {
            container.stock.insert(item_id.to_string(), held - removed);
        }
        self.notify(location);
        Ok(removed)
    }

    fn insert_items(
        &mut self,
        location: &WarehouseLocation,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), ContainerError> {
        let container = self.accessible_mut(location)?;
        let free = container.free();
        if quantity > free {
            return Err(ContainerError::Full {
                location: location.clone(),
                free,
                requested: quantity,
            });
        }
        if quantity == 0 {
            return Ok(());
        }

        let slot = container.stock.entry(item_id.to_string()).or_insert(0);
        *slot = slot.saturating_add(quantity);
        self.notify(location);
        Ok(())
    }
}

impl CourierRegistry for SimWorld {
    fn courier_ids(&self) -> Vec<AgentId> {
        self.couriers.keys().copied().collect()
    }

    fn courier(&self, agent_id: AgentId) -> Option<&Courier> {
        self.couriers.get(&agent_id)
    }

    fn courier_mut(&mut self, agent_id: AgentId) -> Option<&mut Courier> {
        self.couriers.get_mut(&agent_id)
    }
}

fn step_axis(from: i32, to: i32, step: i32) -> i32 {
    from + (to - from).clamp(-step, step)
}

impl Locomotion for SimWorld {
    fn move_towards(&mut self, agent_id: AgentId, target: BlockPos) -> MoveStatus {
        if self.blocked.contains(&agent_id) {
            return if self.couriers.contains_key(&agent_id) {
                MoveStatus::Blocked
            } else {
                MoveStatus::UnknownAgent
            };
        }
        let step = self.step;
        let Some(courier) = self.couriers.get_mut(&agent_id) else {
            return MoveStatus::UnknownAgent;
        };

        let from = courier.position();
        courier.set_position(BlockPos::new(
            step_axis(from.x, target.x, step),
            step_axis(from.y, target.y, step),
            step_axis(from.z, target.z, step),
        ));
        MoveStatus::Moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::sources::ContainerEventSource;

    fn location() -> WarehouseLocation {
        WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0))
    }

    #[test]
    fn test_insert_respects_capacity() {
        let mut world = SimWorld::new();
        let a = location();
        world.add_container(a.clone(), Some(10));
        world.set_stock(&a, "stone", 8);

        let err = world.insert_items(&a, "wood", 5).unwrap_err();
        assert!(matches!(err, ContainerError::Full { free: 2, requested: 5, .. }));
        assert_eq!(world.stock(&a, "wood"), 0);
        assert!(world.insert_items(&a, "wood", 2).is_ok());
    }

    #[test]
    fn test_remove_is_partial_when_short() {
        let mut world = SimWorld::new();
        let a = location();
        world.add_container(a.clone(), None);
        world.set_stock(&a, "wood", 3);

        assert_eq!(world.remove_items(&a, "wood", 5), Ok(3));
        assert!(world.contents(&a).unwrap().is_empty());
    }

    #[test]
    fn test_inaccessible_container_rejects_access() {
        let mut world = SimWorld::new();
        let a = location();
        world.add_container(a.clone(), None);
        world.set_accessible(&a, false);

        assert!(world.contents(&a).is_err());
        assert!(world.remove_items(&a, "wood", 1).is_err());
        assert!(world
            .contents(&WarehouseLocation::new(2, "nether", BlockPos::default()))
            .is_err());
    }

    #[test]
    fn test_mutations_notify_event_source() {
        let mut world = SimWorld::new();
        let source = ContainerEventSource::new();
        world.attach_notifier(source.sender());
        let a = location();
        world.add_container(a.clone(), None);

        world.set_stock(&a, "wood", 3);
        world.remove_items(&a, "wood", 1).unwrap();
        world.remove_items(&a, "iron", 1).unwrap();

        assert_eq!(source.pending(), 2);
    }

    #[test]
    fn test_move_towards_steps_each_axis() {
        let mut world = SimWorld::new().with_step(2);
        world.add_courier(Courier::new(7, 1, BlockPos::new(0, 64, 0), 16));

        assert_eq!(world.move_towards(7, BlockPos::new(5, 64, -1)), MoveStatus::Moving);
        assert_eq!(world.courier(7).map(Courier::position), Some(BlockPos::new(2, 64, -1)));

        world.set_blocked(7, true);
        assert_eq!(world.move_towards(7, BlockPos::new(5, 64, -1)), MoveStatus::Blocked);
        assert_eq!(world.move_towards(99, BlockPos::default()), MoveStatus::UnknownAgent);
    }
}
