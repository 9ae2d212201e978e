//! Transport instruction model
//!
//! An instruction is a committed, courier-assigned unit of work produced by the
//! solver: move `quantity` of `item_id` from `source` to `destination`.
//! Instructions are never mutated; they only leave the active set on
//! completion, failure or timeout.

use crate::models::item::ItemId;
use crate::models::location::{AgentId, WarehouseLocation};
use crate::models::request::{ItemRequest, Priority, RequestId, RequestType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque instruction identifier
pub type InstructionId = Uuid;

/// Namespace for name-based instruction ids
const INSTRUCTION_NAMESPACE: Uuid = Uuid::from_u128(0x6c6f_6769_7374_6963_732d_696e_7374_7231);

/// Work order for a single courier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportInstruction {
    id: InstructionId,
    agent_id: AgentId,
    source: WarehouseLocation,
    destination: WarehouseLocation,
    item_id: ItemId,
    quantity: u32,
    priority: Priority,
    request_id: RequestId,
    request_type: RequestType,
    /// Creation tick of the originating request
    requested_at: usize,
    created_at: usize,
}

impl TransportInstruction {
    /// Build the instruction serving `request` from `source` with `agent_id`
    ///
    /// The id is derived from the request id, the agent and the solve tick, so
    /// solving the same inputs twice yields identical instructions. An agent is
    /// used at most once per solve and at most one solve runs per tick, which
    /// keeps ids unique even when a requeued remainder is solved again later.
    pub fn for_request(
        request: &ItemRequest,
        agent_id: AgentId,
        source: WarehouseLocation,
        quantity: u32,
        created_at: usize,
    ) -> Self {
        let mut name = [0u8; 28];
        name[..16].copy_from_slice(request.id().as_bytes());
        name[16..20].copy_from_slice(&agent_id.to_be_bytes());
        name[20..].copy_from_slice(&(created_at as u64).to_be_bytes());

        Self {
            id: Uuid::new_v5(&INSTRUCTION_NAMESPACE, &name),
            agent_id,
            source,
            destination: request.destination().clone(),
            item_id: request.item_id().to_string(),
            quantity,
            priority: request.priority(),
            request_id: request.id(),
            request_type: request.request_type(),
            requested_at: request.created_at(),
            created_at,
        }
    }

    /// Reconstruct the demand this instruction was meant to satisfy
    pub fn to_request(&self) -> ItemRequest {
        ItemRequest::from_parts(
            self.request_id,
            self.item_id.clone(),
            self.quantity,
            self.destination.clone(),
            self.priority,
            self.request_type,
            self.requested_at,
        )
    }

    pub fn id(&self) -> InstructionId {
        self.id
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn source(&self) -> &WarehouseLocation {
        &self.source
    }

    pub fn destination(&self) -> &WarehouseLocation {
        &self.destination
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn requested_at(&self) -> usize {
        self.requested_at
    }

    pub fn created_at(&self) -> usize {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::BlockPos;

    #[test]
    fn test_instruction_id_is_derived_from_request() {
        let dest = WarehouseLocation::new(1, "overworld", BlockPos::new(5, 64, 5));
        let source = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
        let request = ItemRequest::new(1, "wood", 5, dest, 0).unwrap();

        let a = TransportInstruction::for_request(&request, 7, source.clone(), 5, 1);
        let b = TransportInstruction::for_request(&request, 7, source, 5, 1);

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), request.id());
        assert_eq!(a.request_id(), request.id());
    }

    #[test]
    fn test_instruction_id_differs_across_solve_ticks() {
        let dest = WarehouseLocation::new(1, "overworld", BlockPos::new(5, 64, 5));
        let source = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
        let request = ItemRequest::new(1, "wood", 5, dest, 0).unwrap();

        let first = TransportInstruction::for_request(&request, 7, source.clone(), 2, 1);
        let second = TransportInstruction::for_request(&request, 7, source, 3, 2);

        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_to_request_round_trips_demand() {
        let dest = WarehouseLocation::new(2, "overworld", BlockPos::new(5, 64, 5));
        let source = WarehouseLocation::new(2, "overworld", BlockPos::new(0, 64, 0));
        let request = ItemRequest::new(2, "iron", 9, dest, 3)
            .unwrap()
            .with_priority(Priority::High);

        let instruction = TransportInstruction::for_request(&request, 1, source, 4, 8);
        let rebuilt = instruction.to_request();

        assert_eq!(rebuilt.id(), request.id());
        assert_eq!(rebuilt.quantity(), 4);
        assert_eq!(rebuilt.created_at(), 3);
        assert_eq!(rebuilt.priority(), Priority::High);
        assert_eq!(rebuilt.zone(), 2);
    }
}
