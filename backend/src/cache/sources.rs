//! Inventory update sources
//!
//! Two interchangeable ways of noticing that a physical container changed:
//!
//! - [`ContainerEventSource`]: the host pushes change notifications through a
//!   [`ContainerEventSender`]; only the notified containers are re-read.
//! - [`PollingSource`]: every `interval` ticks, every registered warehouse is
//!   re-read. Fallback for hosts without change callbacks.
//!
//! Both produce [`InventoryUpdate`]s that are applied through
//! [`InventoryCache::update`]; the cache never knows which source fired.

use crate::cache::inventory::InventoryCache;
use crate::models::item::ItemEntry;
use crate::models::location::{BlockPos, WarehouseLocation, ZoneId};
use crate::world::ContainerAccess;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Fresh physical contents of one warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryUpdate {
    pub location: WarehouseLocation,
    pub items: Vec<ItemEntry>,
}

/// Something that knows which warehouses need re-reading
pub trait InventoryUpdateSource: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Collect the updates due at `tick`
    ///
    /// Containers that cannot be read are skipped; a later notification or
    /// poll will pick them up.
    fn collect(
        &mut self,
        tick: usize,
        containers: &dyn ContainerAccess,
        cache: &InventoryCache,
    ) -> Vec<InventoryUpdate>;
}

/// Apply updates to the cache; returns how many hit a registered warehouse
pub fn apply_updates(cache: &InventoryCache, updates: Vec<InventoryUpdate>, tick: usize) -> usize {
    updates
        .into_iter()
        .filter(|update| cache.update(&update.location, update.items.iter().cloned(), tick))
        .count()
}

fn read_container(
    containers: &dyn ContainerAccess,
    location: WarehouseLocation,
    source: &'static str,
) -> Option<InventoryUpdate> {
    match containers.contents(&location) {
        Ok(items) => Some(InventoryUpdate { location, items }),
        Err(err) => {
            debug!(source, %err, "skipping unreadable container");
            None
        }
    }
}

// ============================================================================
// Event-driven source
// ============================================================================

/// Cloneable handle the host uses to report container changes
#[derive(Debug, Clone)]
pub struct ContainerEventSender {
    tx: Sender<WarehouseLocation>,
}

impl ContainerEventSender {
    /// Report that the container at `location` changed
    ///
    /// Never blocks; notifications sent after the source is dropped are lost.
    pub fn notify(&self, location: &WarehouseLocation) {
        if self.tx.send(location.clone()).is_err() {
            trace!(%location, "container event source gone, notification dropped");
        }
    }
}

/// Re-reads containers reported through its [`ContainerEventSender`]s
///
/// # Example
/// ```
/// use courier_logistics_core::cache::sources::ContainerEventSource;
/// use courier_logistics_core::{BlockPos, WarehouseLocation};
///
/// let source = ContainerEventSource::new();
/// let sender = source.sender();
/// sender.notify(&WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0)));
/// assert_eq!(source.pending(), 1);
/// ```
#[derive(Debug)]
pub struct ContainerEventSource {
    tx: Sender<WarehouseLocation>,
    rx: Receiver<WarehouseLocation>,
}

impl ContainerEventSource {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> ContainerEventSender {
        ContainerEventSender {
            tx: self.tx.clone(),
        }
    }

    /// Notifications not yet collected
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for ContainerEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryUpdateSource for ContainerEventSource {
    fn name(&self) -> &'static str {
        "container-events"
    }

    fn collect(
        &mut self,
        _tick: usize,
        containers: &dyn ContainerAccess,
        cache: &InventoryCache,
    ) -> Vec<InventoryUpdate> {
        // Several notifications for one container collapse into one read
        let mut changed: BTreeMap<(ZoneId, BlockPos), WarehouseLocation> = BTreeMap::new();
        for location in self.rx.try_iter() {
            changed.insert((location.zone, location.pos), location);
        }

        changed
            .into_values()
            .filter(|location| cache.is_registered(location.zone, &location.pos))
            .filter_map(|location| read_container(containers, location, self.name()))
            .collect()
    }
}

// ============================================================================
// Polling source
// ============================================================================

/// Re-reads every registered warehouse every `interval` ticks
#[derive(Debug, Clone)]
pub struct PollingSource {
    interval: usize,
    last_poll: Option<usize>,
}

impl PollingSource {
    /// `interval` of 0 is treated as 1 (poll every tick)
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            last_poll: None,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    fn is_due(&self, tick: usize) -> bool {
        match self.last_poll {
            None => true,
            Some(last) => tick.saturating_sub(last) >= self.interval,
        }
    }
}

impl InventoryUpdateSource for PollingSource {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn collect(
        &mut self,
        tick: usize,
        containers: &dyn ContainerAccess,
        cache: &InventoryCache,
    ) -> Vec<InventoryUpdate> {
        if !self.is_due(tick) {
            return Vec::new();
        }
        self.last_poll = Some(tick);

        cache
            .warehouses()
            .into_iter()
            .filter_map(|location| read_container(containers, location, self.name()))
            .collect()
    }
}
