//! Inventory Cache
//!
//! Concurrent mirror of warehouse contents. Readers (queries, snapshots) share
//! the lock; writers (register, unregister, update) take it exclusively.
//!
//! # Critical Invariants
//!
//! 1. **One inventory per warehouse**: re-registering empties the entry
//! 2. **Single mutation path**: contents only change through `update`, which
//!    swaps in a fully built `Arc<CachedInventory>`. A snapshot therefore never
//!    observes a half-written warehouse.
//! 3. **No errors**: absent keys yield empty results; a poisoned lock is
//!    recovered because every write leaves the map consistent.

use crate::cache::snapshot::{SupplySnapshot, WarehouseSupply};
use crate::models::item::{CachedInventory, ItemEntry};
use crate::models::location::{BlockPos, WarehouseLocation, WorldId, ZoneId};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheSlot {
    world: WorldId,
    inventory: Arc<CachedInventory>,
}

type ZoneTable = BTreeMap<ZoneId, BTreeMap<BlockPos, CacheSlot>>;

/// Cached contents of every registered warehouse
///
/// # Example
/// ```
/// use courier_logistics_core::{BlockPos, InventoryCache, ItemEntry, WarehouseLocation};
///
/// let cache = InventoryCache::new();
/// let a = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
///
/// cache.register_warehouse(&a, 0);
/// cache.update(&a, vec![ItemEntry::new("wood", 20)], 1);
///
/// assert_eq!(cache.total_quantity(1, "wood"), 20);
/// assert_eq!(cache.snapshot().warehouse_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InventoryCache {
    zones: RwLock<ZoneTable>,
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ZoneTable> {
        self.zones.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ZoneTable> {
        self.zones.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Register a warehouse with empty contents (overwrites existing entry)
    pub fn register_warehouse(&self, location: &WarehouseLocation, tick: usize) {
        let slot = CacheSlot {
            world: location.world.clone(),
            inventory: Arc::new(CachedInventory::empty(tick)),
        };
        self.write()
            .entry(location.zone)
            .or_default()
            .insert(location.pos, slot);
        debug!(zone = location.zone, pos = %location.pos, "warehouse registered");
    }

    /// Remove a warehouse; returns false if it was not registered
    pub fn unregister_warehouse(&self, zone: ZoneId, pos: &BlockPos) -> bool {
        let mut zones = self.write();
        let Some(warehouses) = zones.get_mut(&zone) else {
            return false;
        };
        let removed = warehouses.remove(pos).is_some();
        if warehouses.is_empty() {
            zones.remove(&zone);
        }
        removed
    }

    /// Replace the cached contents of a registered warehouse
    ///
    /// The new inventory is normalized before the write lock is taken; the
    /// swap itself is a single pointer store. Updates for warehouses that are
    /// not registered are ignored (returns false), so a late refresh cannot
    /// resurrect an unregistered warehouse.
    pub fn update<I>(&self, location: &WarehouseLocation, items: I, tick: usize) -> bool
    where
        I: IntoIterator<Item = ItemEntry>,
    {
        let inventory = Arc::new(CachedInventory::from_items(items, tick));

        let mut zones = self.write();
        match zones
            .get_mut(&location.zone)
            .and_then(|warehouses| warehouses.get_mut(&location.pos))
        {
            Some(slot) => {
                slot.inventory = inventory;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Live queries
    // ========================================================================

    pub fn is_registered(&self, zone: ZoneId, pos: &BlockPos) -> bool {
        self.read()
            .get(&zone)
            .is_some_and(|warehouses| warehouses.contains_key(pos))
    }

    /// Shared handle to the current inventory of one warehouse
    pub fn inventory(&self, zone: ZoneId, pos: &BlockPos) -> Option<Arc<CachedInventory>> {
        self.read()
            .get(&zone)
            .and_then(|warehouses| warehouses.get(pos))
            .map(|slot| Arc::clone(&slot.inventory))
    }

    /// Contents of one warehouse (empty if unknown)
    pub fn contents(&self, zone: ZoneId, pos: &BlockPos) -> Vec<ItemEntry> {
        self.inventory(zone, pos)
            .map(|inventory| inventory.items().to_vec())
            .unwrap_or_default()
    }

    /// Cached quantity of one item at one warehouse
    pub fn quantity_at(&self, zone: ZoneId, pos: &BlockPos, item_id: &str) -> u32 {
        self.read()
            .get(&zone)
            .and_then(|warehouses| warehouses.get(pos))
            .map(|slot| slot.inventory.quantity_of(item_id))
            .unwrap_or(0)
    }

    /// Sum of an item over every warehouse of a zone
    pub fn total_quantity(&self, zone: ZoneId, item_id: &str) -> u64 {
        self.read()
            .get(&zone)
            .map(|warehouses| {
                warehouses
                    .values()
                    .map(|slot| u64::from(slot.inventory.quantity_of(item_id)))
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Warehouses of a zone holding the item, with their quantities
    pub fn locations_with_item(&self, zone: ZoneId, item_id: &str) -> Vec<(WarehouseLocation, u32)> {
        let zones = self.read();
        let Some(warehouses) = zones.get(&zone) else {
            return Vec::new();
        };

        warehouses
            .iter()
            .filter_map(|(pos, slot)| {
                let quantity = slot.inventory.quantity_of(item_id);
                (quantity > 0).then(|| {
                    (
                        WarehouseLocation::new(zone, slot.world.clone(), *pos),
                        quantity,
                    )
                })
            })
            .collect()
    }

    /// Every registered warehouse, in zone then position order
    pub fn warehouses(&self) -> Vec<WarehouseLocation> {
        self.read()
            .iter()
            .flat_map(|(zone, warehouses)| {
                warehouses
                    .iter()
                    .map(move |(pos, slot)| WarehouseLocation::new(*zone, slot.world.clone(), *pos))
            })
            .collect()
    }

    pub fn warehouse_count(&self) -> usize {
        self.read().values().map(BTreeMap::len).sum()
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Deep, immutable copy of the whole cache
    ///
    /// O(total cached item types); taken once per scheduling cycle.
    pub fn snapshot(&self) -> SupplySnapshot {
        let zones = self.read();
        let copy = zones
            .iter()
            .map(|(zone, warehouses)| {
                let warehouses = warehouses
                    .iter()
                    .map(|(pos, slot)| {
                        (
                            *pos,
                            WarehouseSupply {
                                world: slot.world.clone(),
                                items: slot.inventory.items().to_vec(),
                            },
                        )
                    })
                    .collect();
                (*zone, warehouses)
            })
            .collect();
        SupplySnapshot::new(copy)
    }
}
