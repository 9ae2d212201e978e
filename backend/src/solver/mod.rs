//! Matching Solver
//!
//! Pure greedy matcher: (supply snapshot, demand snapshot, idle couriers) →
//! ordered transport instructions. No shared state is touched, so the solver
//! can run on the background worker while the authoritative thread keeps
//! mutating the live cache.
//!
//! # Algorithm
//!
//! 1. Empty demand or no couriers → no instructions
//! 2. Copy supply into a call-local remaining-quantity table
//! 3. Walk demand in its pre-sorted order (priority desc, age asc); stop once
//!    every courier is assigned
//! 4. Source = warehouse of the request's zone with remaining stock closest
//!    (squared distance) to the destination; first in position order wins ties
//! 5. Courier = unassigned courier preferring the source's zone, then
//!    closest to the source; first in input order wins ties
//! 6. Quantity = min(requested, remaining at source, carry capacity)
//! 7. Emit, decrement the remaining table, mark the courier used
//!
//! # Critical Invariants
//!
//! 1. **Deterministic**: identical inputs yield identical output (BTreeMap
//!    iteration order, input-ordered couriers, name-based instruction ids)
//! 2. **No over-allocation**: the sum of quantities emitted for a
//!    (warehouse, item) never exceeds its snapshot quantity
//! 3. **One instruction per courier** per call

use crate::cache::snapshot::SupplySnapshot;
use crate::demand::DemandSnapshot;
use crate::models::courier::CourierInfo;
use crate::models::instruction::TransportInstruction;
use crate::models::location::{BlockPos, WarehouseLocation, ZoneId};
use crate::models::request::ItemRequest;
use std::collections::BTreeMap;

/// Result of one solve: instructions plus the demand left unserved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolvePlan {
    /// Instructions in generation order
    pub instructions: Vec<TransportInstruction>,
    /// Requests not served, or the unserved remainder of partially served ones
    pub residual: Vec<ItemRequest>,
}

/// Greedy match of demand against supply and couriers
///
/// `tick` stamps the instructions' creation time and seeds their ids.
///
/// # Example
/// ```
/// use courier_logistics_core::solver::solve;
/// use courier_logistics_core::{
///     BlockPos, CourierInfo, DemandSnapshot, ItemEntry, ItemRequest, SupplySnapshot,
///     WarehouseLocation,
/// };
///
/// let a = WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0));
/// let b = WarehouseLocation::new(1, "overworld", BlockPos::new(10, 64, 0));
/// let supply = SupplySnapshot::from_warehouses(vec![(a.clone(), vec![ItemEntry::new("wood", 20)])]);
/// let demand = DemandSnapshot::from_requests(vec![ItemRequest::new(1, "wood", 5, b, 0).unwrap()]);
/// let couriers = vec![CourierInfo {
///     agent_id: 1,
///     zone: 1,
///     position: BlockPos::new(1, 64, 0),
///     carry_capacity: 64,
/// }];
///
/// let instructions = solve(&supply, &demand, &couriers, 1);
/// assert_eq!(instructions.len(), 1);
/// assert_eq!(instructions[0].quantity(), 5);
/// assert_eq!(instructions[0].source(), &a);
/// ```
pub fn solve(
    supply: &SupplySnapshot,
    demand: &DemandSnapshot,
    couriers: &[CourierInfo],
    tick: usize,
) -> Vec<TransportInstruction> {
    plan(supply, demand, couriers, tick).instructions
}

/// Same matching as [`solve`], also reporting unserved demand
pub fn plan(
    supply: &SupplySnapshot,
    demand: &DemandSnapshot,
    couriers: &[CourierInfo],
    tick: usize,
) -> SolvePlan {
    if demand.is_empty() || couriers.is_empty() {
        return SolvePlan {
            instructions: Vec::new(),
            residual: demand.requests().to_vec(),
        };
    }

    let mut remaining = RemainingStock::from_supply(supply);
    let mut assigned = vec![false; couriers.len()];
    let mut assigned_count = 0usize;
    let mut plan = SolvePlan::default();

    for request in demand.requests() {
        if assigned_count == couriers.len() {
            plan.residual.push(request.clone());
            continue;
        }

        let Some(source) = nearest_source(supply, &remaining, request) else {
            plan.residual.push(request.clone());
            continue;
        };
        let Some(courier_index) = best_courier(couriers, &assigned, &source) else {
            plan.residual.push(request.clone());
            continue;
        };
        let courier = &couriers[courier_index];

        let available = remaining.get(source.zone, &source.pos, request.item_id());
        let quantity = request
            .quantity()
            .min(available)
            .min(courier.carry_capacity);
        if quantity == 0 {
            plan.residual.push(request.clone());
            continue;
        }

        remaining.take(source.zone, &source.pos, request.item_id(), quantity);
        assigned[courier_index] = true;
        assigned_count += 1;

        if let Some(remainder) = request.with_remaining(request.quantity() - quantity) {
            plan.residual.push(remainder);
        }
        plan.instructions.push(TransportInstruction::for_request(
            request,
            courier.agent_id,
            source,
            quantity,
            tick,
        ));
    }

    plan
}

/// Call-local copy of snapshot quantities
struct RemainingStock<'a> {
    table: BTreeMap<(ZoneId, BlockPos), BTreeMap<&'a str, u32>>,
}

impl<'a> RemainingStock<'a> {
    fn from_supply(supply: &'a SupplySnapshot) -> Self {
        let table = supply
            .zones()
            .flat_map(|(zone, warehouses)| {
                warehouses.iter().map(move |(pos, warehouse)| {
                    let items = warehouse
                        .items
                        .iter()
                        .filter(|entry| entry.quantity() > 0)
                        .map(|entry| (entry.item_id(), entry.quantity()))
                        .collect();
                    ((*zone, *pos), items)
                })
            })
            .collect();
        Self { table }
    }

    fn get(&self, zone: ZoneId, pos: &BlockPos, item_id: &str) -> u32 {
        self.table
            .get(&(zone, *pos))
            .and_then(|items| items.get(item_id).copied())
            .unwrap_or(0)
    }

    fn take(&mut self, zone: ZoneId, pos: &BlockPos, item_id: &str, quantity: u32) {
        let Some(items) = self.table.get_mut(&(zone, *pos)) else {
            return;
        };
        if let Some(held) = items.get_mut(item_id) {
            *held = held.saturating_sub(quantity);
            if *held == 0 {
                items.remove(item_id);
            }
        }
    }
}

fn nearest_source(
    supply: &SupplySnapshot,
    remaining: &RemainingStock<'_>,
    request: &ItemRequest,
) -> Option<WarehouseLocation> {
    let zone = request.zone();
    let target = request.destination().pos;

    let mut best: Option<(i64, &BlockPos, &str)> = None;
    for (pos, warehouse) in supply.zone(zone)? {
        if remaining.get(zone, pos, request.item_id()) == 0 {
            continue;
        }
        let distance = pos.distance_sq(&target);
        if best.map_or(true, |(best_distance, _, _)| distance < best_distance) {
            best = Some((distance, pos, warehouse.world.as_str()));
        }
    }

    best.map(|(_, pos, world)| WarehouseLocation::new(zone, world, *pos))
}

fn best_courier(
    couriers: &[CourierInfo],
    assigned: &[bool],
    source: &WarehouseLocation,
) -> Option<usize> {
    couriers
        .iter()
        .enumerate()
        .filter(|(index, _)| !assigned[*index])
        .map(|(index, courier)| {
            let other_zone = courier.zone != source.zone;
            (
                (other_zone, courier.position.distance_sq(&source.pos)),
                index,
            )
        })
        // min_by_key keeps the first of equal keys
        .min_by_key(|(key, _)| *key)
        .map(|(_, index)| index)
}
