//! Item request model
//!
//! A request is an unfulfilled demand for a quantity of an item, delivered to a
//! destination warehouse. Each request has:
//! - Zone it belongs to (only warehouses in that zone may supply it)
//! - Item id and quantity (quantity > 0)
//! - Destination warehouse
//! - Priority band (LOW < NORMAL < HIGH < URGENT)
//! - Origin (automatic task-driven or manual)
//! - Creation tick (oldest-first fairness within a priority band)
//!
//! Requests are immutable once submitted.

use crate::models::item::ItemId;
use crate::models::location::{WarehouseLocation, ZoneId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque request identifier
pub type RequestId = Uuid;

/// Priority band, ordered `Low < Normal < High < Urgent`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Where a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Raised by a task (e.g. a building needing materials)
    #[default]
    Automatic,
    /// Raised by an operator
    Manual,
}

/// Errors that can occur when building a request
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Requested quantity must be positive")]
    ZeroQuantity,

    #[error("Item id must not be empty")]
    EmptyItemId,

    #[error("Destination {destination} is outside request zone {zone}")]
    DestinationOutsideZone {
        zone: ZoneId,
        destination: WarehouseLocation,
    },
}

/// Demand for `quantity` units of `item_id` at `destination`
///
/// # Example
/// ```
/// use courier_logistics_core::{BlockPos, ItemRequest, Priority, WarehouseLocation};
///
/// let dest = WarehouseLocation::new(1, "overworld", BlockPos::new(10, 64, 0));
/// let request = ItemRequest::new(1, "wood", 5, dest, 0)
///     .unwrap()
///     .with_priority(Priority::High);
/// assert_eq!(request.quantity(), 5);
/// assert_eq!(request.priority(), Priority::High);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequestRecord")]
pub struct ItemRequest {
    id: RequestId,
    zone: ZoneId,
    item_id: ItemId,
    quantity: u32,
    destination: WarehouseLocation,
    priority: Priority,
    request_type: RequestType,
    created_at: usize,
}

/// Serialized form; read back through the same checks as [`ItemRequest::new`]
#[derive(Deserialize)]
struct RequestRecord {
    id: RequestId,
    zone: ZoneId,
    item_id: ItemId,
    quantity: u32,
    destination: WarehouseLocation,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    request_type: RequestType,
    created_at: usize,
}

impl TryFrom<RequestRecord> for ItemRequest {
    type Error = RequestError;

    fn try_from(record: RequestRecord) -> Result<Self, Self::Error> {
        check_request(record.zone, &record.item_id, record.quantity, &record.destination)?;
        Ok(Self {
            id: record.id,
            zone: record.zone,
            item_id: record.item_id,
            quantity: record.quantity,
            destination: record.destination,
            priority: record.priority,
            request_type: record.request_type,
            created_at: record.created_at,
        })
    }
}

fn check_request(
    zone: ZoneId,
    item_id: &str,
    quantity: u32,
    destination: &WarehouseLocation,
) -> Result<(), RequestError> {
    if quantity == 0 {
        return Err(RequestError::ZeroQuantity);
    }
    if item_id.is_empty() {
        return Err(RequestError::EmptyItemId);
    }
    if destination.zone != zone {
        return Err(RequestError::DestinationOutsideZone {
            zone,
            destination: destination.clone(),
        });
    }
    Ok(())
}

impl ItemRequest {
    /// Create a NORMAL priority automatic request with a fresh id
    pub fn new(
        zone: ZoneId,
        item_id: impl Into<ItemId>,
        quantity: u32,
        destination: WarehouseLocation,
        created_at: usize,
    ) -> Result<Self, RequestError> {
        let item_id = item_id.into();
        check_request(zone, &item_id, quantity, &destination)?;

        Ok(Self {
            id: Uuid::new_v4(),
            zone,
            item_id,
            quantity,
            destination,
            priority: Priority::Normal,
            request_type: RequestType::Automatic,
            created_at,
        })
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = request_type;
        self
    }

    /// Replace the generated id (seeded demand generation)
    pub(crate) fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Same request carrying a reduced quantity (used when requeueing a remainder)
    ///
    /// Keeps id, priority and creation tick so the remainder keeps its place
    /// in the fairness order.
    pub(crate) fn with_remaining(&self, quantity: u32) -> Option<Self> {
        if quantity == 0 {
            return None;
        }
        let mut remainder = self.clone();
        remainder.quantity = quantity;
        Some(remainder)
    }

    /// Rebuild a request from its parts (used when a dropped instruction is requeued)
    pub(crate) fn from_parts(
        id: RequestId,
        item_id: ItemId,
        quantity: u32,
        destination: WarehouseLocation,
        priority: Priority,
        request_type: RequestType,
        created_at: usize,
    ) -> Self {
        Self {
            id,
            zone: destination.zone,
            item_id,
            quantity,
            destination,
            priority,
            request_type,
            created_at,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn destination(&self) -> &WarehouseLocation {
        &self.destination
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn created_at(&self) -> usize {
        self.created_at
    }
}
