//! Inventory cache and its update sources

pub mod inventory;
pub mod snapshot;
pub mod sources;

pub use inventory::InventoryCache;
pub use snapshot::{SupplySnapshot, WarehouseSupply};
pub use sources::{
    apply_updates, ContainerEventSender, ContainerEventSource, InventoryUpdate,
    InventoryUpdateSource, PollingSource,
};
