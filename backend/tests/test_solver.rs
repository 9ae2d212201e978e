//! Integration tests for the greedy matcher
//!
//! Scenario tests pin down ordering and clamping rules; proptest checks the
//! structural properties (determinism, capacity clamp, no over-allocation,
//! one instruction per courier, demand conservation) over random inputs.

use courier_logistics_core::{
    plan, solve, BlockPos, CourierInfo, DemandSnapshot, ItemEntry, ItemRequest, Priority,
    SupplySnapshot, WarehouseLocation,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn location(x: i32) -> WarehouseLocation {
    WarehouseLocation::new(1, "overworld", BlockPos::new(x, 64, 0))
}

fn courier(agent_id: u32, x: i32, carry_capacity: u32) -> CourierInfo {
    CourierInfo {
        agent_id,
        zone: 1,
        position: BlockPos::new(x, 64, 0),
        carry_capacity,
    }
}

fn request(item: &str, quantity: u32, dest_x: i32, priority: Priority, created_at: usize) -> ItemRequest {
    ItemRequest::new(1, item, quantity, location(dest_x), created_at)
        .unwrap()
        .with_priority(priority)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_high_priority_beats_older_low_priority() {
    let supply = SupplySnapshot::from_warehouses(vec![(location(0), vec![ItemEntry::new("wood", 50)])]);
    let low = request("wood", 5, 10, Priority::Low, 0);
    let high = request("wood", 5, 10, Priority::High, 1);
    let demand = DemandSnapshot::from_requests(vec![low.clone(), high.clone()]);

    let instructions = solve(&supply, &demand, &[courier(1, 1, 64)], 2);

    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].request_id(), high.id());
}

#[test]
fn test_older_request_wins_within_priority_band() {
    // Stock covers only one of the two requests
    let supply = SupplySnapshot::from_warehouses(vec![(location(0), vec![ItemEntry::new("wood", 5)])]);
    let newer = request("wood", 5, 10, Priority::Normal, 4);
    let older = request("wood", 5, 10, Priority::Normal, 2);
    let demand = DemandSnapshot::from_requests(vec![newer.clone(), older.clone()]);

    let result = plan(&supply, &demand, &[courier(1, 1, 64), courier(2, 2, 64)], 5);

    assert_eq!(result.instructions.len(), 1);
    assert_eq!(result.instructions[0].request_id(), older.id());
    assert_eq!(result.residual.len(), 1);
    assert_eq!(result.residual[0].id(), newer.id());
}

#[test]
fn test_capacity_clamps_quantity() {
    let supply = SupplySnapshot::from_warehouses(vec![(location(0), vec![ItemEntry::new("wood", 40)])]);
    let demand = DemandSnapshot::from_requests(vec![request("wood", 100, 10, Priority::Normal, 0)]);

    let result = plan(&supply, &demand, &[courier(1, 0, 10)], 1);

    assert_eq!(result.instructions.len(), 1);
    assert_eq!(result.instructions[0].quantity(), 10);
    assert_eq!(result.residual.len(), 1);
    assert_eq!(result.residual[0].quantity(), 90);
}

#[test]
fn test_competing_requests_share_remaining_stock() {
    let supply = SupplySnapshot::from_warehouses(vec![(location(0), vec![ItemEntry::new("wood", 12)])]);
    let first = request("wood", 8, 10, Priority::High, 0);
    let second = request("wood", 8, 10, Priority::Normal, 0);
    let demand = DemandSnapshot::from_requests(vec![first, second]);

    let instructions = solve(&supply, &demand, &[courier(1, 0, 64), courier(2, 0, 64)], 1);

    let quantities: Vec<u32> = instructions.iter().map(|i| i.quantity()).collect();
    assert_eq!(quantities, vec![8, 4]);
}

#[test]
fn test_requests_without_stock_in_zone_are_unserved() {
    let foreign = WarehouseLocation::new(2, "overworld", BlockPos::new(0, 64, 0));
    let supply = SupplySnapshot::from_warehouses(vec![(foreign, vec![ItemEntry::new("wood", 64)])]);
    let demand = DemandSnapshot::from_requests(vec![request("wood", 5, 10, Priority::Urgent, 0)]);

    let result = plan(&supply, &demand, &[courier(1, 0, 64)], 1);

    assert!(result.instructions.is_empty());
    assert_eq!(result.residual.len(), 1);
}

#[test]
fn test_instructions_carry_request_metadata() {
    let supply = SupplySnapshot::from_warehouses(vec![(location(0), vec![ItemEntry::new("wood", 20)])]);
    let req = request("wood", 5, 10, Priority::High, 3);
    let demand = DemandSnapshot::from_requests(vec![req.clone()]);

    let instructions = solve(&supply, &demand, &[courier(7, 1, 64)], 9);
    let instruction = &instructions[0];

    assert_eq!(instruction.agent_id(), 7);
    assert_eq!(instruction.source(), &location(0));
    assert_eq!(instruction.destination(), &location(10));
    assert_eq!(instruction.item_id(), "wood");
    assert_eq!(instruction.priority(), Priority::High);
    assert_eq!(instruction.requested_at(), 3);
    assert_eq!(instruction.created_at(), 9);
}

// ============================================================================
// Properties
// ============================================================================

const ITEMS: [&str; 3] = ["wood", "stone", "iron"];

fn arb_supply() -> impl Strategy<Value = SupplySnapshot> {
    prop::collection::vec((-20i32..20, prop::collection::vec((0usize..3, 0u32..40), 0..4)), 0..5)
        .prop_map(|warehouses| {
            SupplySnapshot::from_warehouses(warehouses.into_iter().map(|(x, stock)| {
                let items = stock
                    .into_iter()
                    .map(|(item, quantity)| ItemEntry::new(ITEMS[item], quantity))
                    .collect();
                (location(x), items)
            }))
        })
}

fn arb_demand() -> impl Strategy<Value = DemandSnapshot> {
    prop::collection::vec((0usize..3, 1u32..60, -20i32..20, 0u8..4, 0usize..10), 0..10).prop_map(
        |requests| {
            let priorities = [Priority::Low, Priority::Normal, Priority::High, Priority::Urgent];
            DemandSnapshot::from_requests(
                requests
                    .into_iter()
                    .map(|(item, quantity, x, priority, created_at)| {
                        request(ITEMS[item], quantity, x, priorities[usize::from(priority)], created_at)
                    })
                    .collect(),
            )
        },
    )
}

fn arb_couriers() -> impl Strategy<Value = Vec<CourierInfo>> {
    prop::collection::vec((-20i32..20, 0u32..32), 0..5).prop_map(|couriers| {
        couriers
            .into_iter()
            .enumerate()
            .map(|(index, (x, capacity))| courier(index as u32 + 1, x, capacity))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_solve_is_deterministic(
        supply in arb_supply(),
        demand in arb_demand(),
        couriers in arb_couriers(),
    ) {
        let first = plan(&supply, &demand, &couriers, 5);
        let second = plan(&supply, &demand, &couriers, 5);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_quantities_respect_capacity_and_request(
        supply in arb_supply(),
        demand in arb_demand(),
        couriers in arb_couriers(),
    ) {
        let capacities: BTreeMap<u32, u32> =
            couriers.iter().map(|c| (c.agent_id, c.carry_capacity)).collect();
        let requested: BTreeMap<_, u32> =
            demand.requests().iter().map(|r| (r.id(), r.quantity())).collect();

        for instruction in solve(&supply, &demand, &couriers, 1) {
            prop_assert!(instruction.quantity() > 0);
            prop_assert!(instruction.quantity() <= capacities[&instruction.agent_id()]);
            prop_assert!(instruction.quantity() <= requested[&instruction.request_id()]);
        }
    }

    #[test]
    fn prop_never_allocates_more_than_snapshot(
        supply in arb_supply(),
        demand in arb_demand(),
        couriers in arb_couriers(),
    ) {
        let mut allocated: BTreeMap<(BlockPos, String), u32> = BTreeMap::new();
        for instruction in solve(&supply, &demand, &couriers, 1) {
            *allocated
                .entry((instruction.source().pos, instruction.item_id().to_string()))
                .or_insert(0) += instruction.quantity();
        }

        for ((pos, item), quantity) in allocated {
            prop_assert!(quantity <= supply.quantity(1, &pos, &item));
        }
    }

    #[test]
    fn prop_one_instruction_per_courier(
        supply in arb_supply(),
        demand in arb_demand(),
        couriers in arb_couriers(),
    ) {
        let instructions = solve(&supply, &demand, &couriers, 1);
        let agents: BTreeSet<u32> = instructions.iter().map(|i| i.agent_id()).collect();
        let ids: BTreeSet<_> = instructions.iter().map(|i| i.id()).collect();

        prop_assert_eq!(agents.len(), instructions.len());
        prop_assert_eq!(ids.len(), instructions.len());
        prop_assert!(instructions.len() <= couriers.len());
    }

    #[test]
    fn prop_demand_is_conserved(
        supply in arb_supply(),
        demand in arb_demand(),
        couriers in arb_couriers(),
    ) {
        let result = plan(&supply, &demand, &couriers, 1);

        let mut accounted: BTreeMap<_, u32> = BTreeMap::new();
        for instruction in &result.instructions {
            *accounted.entry(instruction.request_id()).or_insert(0) += instruction.quantity();
        }
        for request in &result.residual {
            *accounted.entry(request.id()).or_insert(0) += request.quantity();
        }

        for request in demand.requests() {
            prop_assert_eq!(accounted.get(&request.id()).copied(), Some(request.quantity()));
        }
    }
}
