//! Domain models for the logistics engine

pub mod courier;
pub mod event;
pub mod instruction;
pub mod item;
pub mod location;
pub mod request;

// Re-exports
pub use courier::{Courier, CourierError, CourierInfo, CourierState};
pub use event::{DropReason, Event, EventLog, FailureReason};
pub use instruction::{InstructionId, TransportInstruction};
pub use item::{CachedInventory, ItemEntry, ItemId};
pub use location::{AgentId, BlockPos, WarehouseLocation, WorldId, ZoneId};
pub use request::{ItemRequest, Priority, RequestError, RequestId, RequestType};
