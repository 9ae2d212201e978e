//! Item quantities and cached warehouse contents
//!
//! CRITICAL: a stored quantity is always > 0. Building a `CachedInventory`
//! merges duplicate item ids and drops zero entries, so a reader never sees
//! a zero-quantity record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item identifier (e.g. "wood")
pub type ItemId = String;

/// A quantity of one item type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemEntry {
    item_id: ItemId,
    quantity: u32,
}

impl ItemEntry {
    pub fn new(item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Immutable mirror of one warehouse's contents
///
/// # Example
/// ```
/// use courier_logistics_core::{CachedInventory, ItemEntry};
///
/// let inv = CachedInventory::from_items(
///     vec![
///         ItemEntry::new("wood", 5),
///         ItemEntry::new("stone", 0),
///         ItemEntry::new("wood", 3),
///     ],
///     7,
/// );
/// assert_eq!(inv.quantity_of("wood"), 8);
/// assert_eq!(inv.items().len(), 1); // zero-quantity stone dropped
/// assert_eq!(inv.last_updated(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InventoryRecord")]
pub struct CachedInventory {
    /// Sorted by item id, at most one entry per id, all quantities > 0
    items: Vec<ItemEntry>,

    /// Tick of the refresh that produced this copy
    last_updated: usize,
}

/// Serialized form; normalized through `from_items` when read back
#[derive(Deserialize)]
struct InventoryRecord {
    items: Vec<ItemEntry>,
    last_updated: usize,
}

impl From<InventoryRecord> for CachedInventory {
    fn from(record: InventoryRecord) -> Self {
        Self::from_items(record.items, record.last_updated)
    }
}

impl CachedInventory {
    /// Empty inventory (freshly registered warehouse)
    pub fn empty(tick: usize) -> Self {
        Self {
            items: Vec::new(),
            last_updated: tick,
        }
    }

    /// Build a normalized inventory from raw container contents
    pub fn from_items<I>(items: I, tick: usize) -> Self
    where
        I: IntoIterator<Item = ItemEntry>,
    {
        let mut merged: BTreeMap<ItemId, u32> = BTreeMap::new();
        for entry in items {
            if entry.quantity == 0 {
                continue;
            }
            let slot = merged.entry(entry.item_id).or_insert(0);
            *slot = slot.saturating_add(entry.quantity);
        }

        Self {
            items: merged
                .into_iter()
                .map(|(item_id, quantity)| ItemEntry { item_id, quantity })
                .collect(),
            last_updated: tick,
        }
    }

    pub fn items(&self) -> &[ItemEntry] {
        &self.items
    }

    pub fn last_updated(&self) -> usize {
        self.last_updated
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity held for an item (0 if absent)
    pub fn quantity_of(&self, item_id: &str) -> u32 {
        self.items
            .binary_search_by(|entry| entry.item_id.as_str().cmp(item_id))
            .map(|idx| self.items[idx].quantity)
            .unwrap_or(0)
    }
}
