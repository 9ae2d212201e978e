//! Supply snapshot
//!
//! An immutable, point-in-time copy of every cached warehouse, grouped
//! zone -> position -> contents. `BTreeMap`s give a stable iteration order,
//! which the solver relies on for deterministic tie-breaking.

use crate::models::item::{CachedInventory, ItemEntry};
use crate::models::location::{BlockPos, WarehouseLocation, WorldId, ZoneId};
use std::collections::BTreeMap;

/// Contents of one warehouse at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseSupply {
    pub world: WorldId,
    /// Sorted by item id, quantities > 0
    pub items: Vec<ItemEntry>,
}

impl WarehouseSupply {
    pub fn quantity_of(&self, item_id: &str) -> u32 {
        self.items
            .iter()
            .find(|entry| entry.item_id() == item_id)
            .map(ItemEntry::quantity)
            .unwrap_or(0)
    }
}

/// Immutable zone -> warehouse position -> items mapping
///
/// # Example
/// ```
/// use courier_logistics_core::{BlockPos, ItemEntry, SupplySnapshot, WarehouseLocation};
///
/// let a = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
/// let supply = SupplySnapshot::from_warehouses(vec![(a, vec![ItemEntry::new("wood", 20)])]);
/// assert_eq!(supply.quantity(1, &BlockPos::new(0, 64, 0), "wood"), 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplySnapshot {
    zones: BTreeMap<ZoneId, BTreeMap<BlockPos, WarehouseSupply>>,
}

impl SupplySnapshot {
    pub(crate) fn new(zones: BTreeMap<ZoneId, BTreeMap<BlockPos, WarehouseSupply>>) -> Self {
        Self { zones }
    }

    /// Build a snapshot directly from warehouse contents (tests, replays)
    ///
    /// Contents are normalized the same way the cache normalizes them.
    /// A location listed twice keeps its last contents.
    pub fn from_warehouses<I>(warehouses: I) -> Self
    where
        I: IntoIterator<Item = (WarehouseLocation, Vec<ItemEntry>)>,
    {
        let mut zones: BTreeMap<ZoneId, BTreeMap<BlockPos, WarehouseSupply>> = BTreeMap::new();
        for (location, items) in warehouses {
            let normalized = CachedInventory::from_items(items, 0);
            zones.entry(location.zone).or_default().insert(
                location.pos,
                WarehouseSupply {
                    world: location.world,
                    items: normalized.items().to_vec(),
                },
            );
        }
        Self { zones }
    }

    /// Warehouses of one zone, in position order
    pub fn zone(&self, zone: ZoneId) -> Option<&BTreeMap<BlockPos, WarehouseSupply>> {
        self.zones.get(&zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = (&ZoneId, &BTreeMap<BlockPos, WarehouseSupply>)> {
        self.zones.iter()
    }

    pub fn warehouse(&self, zone: ZoneId, pos: &BlockPos) -> Option<&WarehouseSupply> {
        self.zones.get(&zone).and_then(|warehouses| warehouses.get(pos))
    }

    pub fn quantity(&self, zone: ZoneId, pos: &BlockPos, item_id: &str) -> u32 {
        self.warehouse(zone, pos)
            .map(|supply| supply.quantity_of(item_id))
            .unwrap_or(0)
    }

    pub fn warehouse_count(&self) -> usize {
        self.zones.values().map(BTreeMap::len).sum()
    }

    /// Total number of (warehouse, item) entries
    pub fn item_type_count(&self) -> usize {
        self.zones
            .values()
            .flat_map(BTreeMap::values)
            .map(|supply| supply.items.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
