//! Integration tests for courier execution
//!
//! Couriers are driven through the orchestrator tick loop so every failure
//! path is observed the way a host sees it: instruction removed from the
//! active table, courier back to IDLE, failure recorded in the event log.

use courier_logistics_core::world::sim::SimWorld;
use courier_logistics_core::{
    BlockPos, Courier, CourierConfig, CourierRegistry, CourierState, Event, FailureReason,
    InstructionId, LogisticsConfig, Orchestrator, Priority, SolverMode, WarehouseLocation,
};

const COURIER: u32 = 1;

fn warehouse_a() -> WarehouseLocation {
    WarehouseLocation::new(1, "overworld", BlockPos::new(0, 64, 0))
}

fn warehouse_b() -> WarehouseLocation {
    WarehouseLocation::new(1, "overworld", BlockPos::new(8, 64, 0))
}

fn config() -> LogisticsConfig {
    LogisticsConfig {
        solver_mode: SolverMode::Inline,
        poll_interval_ticks: Some(1),
        courier: CourierConfig {
            action_duration_ticks: 3,
            arrival_distance: 1,
            state_timeout_ticks: 30,
            approach_offset: BlockPos::new(0, 1, 0),
        },
        ..LogisticsConfig::default()
    }
}

/// A holds 20 wood, B has the given capacity; one courier at `start`
fn setup(courier: Courier, b_capacity: Option<u32>) -> (Orchestrator, SimWorld) {
    let orchestrator = Orchestrator::new(config()).unwrap();
    let mut world = SimWorld::new();
    world.add_container(warehouse_a(), None);
    world.add_container(warehouse_b(), b_capacity);
    orchestrator.register_warehouse(&warehouse_a());
    orchestrator.register_warehouse(&warehouse_b());
    world.set_stock(&warehouse_a(), "wood", 20);
    world.add_courier(courier);
    (orchestrator, world)
}

/// Submit a request and tick until it is committed; returns the instruction id
fn commit_delivery(orchestrator: &mut Orchestrator, world: &mut SimWorld, quantity: u32) -> InstructionId {
    orchestrator
        .request_items(1, "wood", quantity, warehouse_b(), Priority::Normal)
        .unwrap();
    orchestrator.tick(world).unwrap();
    let result = orchestrator.tick(world).unwrap();
    assert_eq!(result.committed, 1);
    orchestrator.active_instruction_for(COURIER).unwrap().id()
}

fn run_until<F>(orchestrator: &mut Orchestrator, world: &mut SimWorld, max_ticks: usize, done: F) -> bool
where
    F: Fn(&Orchestrator, &SimWorld) -> bool,
{
    for _ in 0..max_ticks {
        orchestrator.tick(world).unwrap();
        if done(orchestrator, world) {
            return true;
        }
    }
    false
}

fn failure_reasons(orchestrator: &Orchestrator, id: InstructionId) -> Vec<FailureReason> {
    orchestrator
        .event_log()
        .events_for_instruction(id)
        .into_iter()
        .filter_map(|event| match event {
            Event::InstructionFailed { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect()
}

fn courier_state(world: &SimWorld) -> CourierState {
    world.courier(COURIER).unwrap().state()
}

#[test]
fn test_transitions_follow_delivery_cycle() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);

    assert!(run_until(&mut orchestrator, &mut world, 100, |o, w| {
        o.get_active_instruction(id).is_none() && w.courier(COURIER).unwrap().is_idle()
    }));

    let transitions: Vec<(CourierState, CourierState)> = orchestrator
        .event_log()
        .events_for_agent(COURIER)
        .into_iter()
        .filter_map(|event| match event {
            Event::CourierTransition { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (CourierState::Idle, CourierState::MovingToSource),
            (CourierState::MovingToSource, CourierState::PickingUp),
            (CourierState::PickingUp, CourierState::MovingToDest),
            (CourierState::MovingToDest, CourierState::Depositing),
            (CourierState::Depositing, CourierState::Returning),
            (CourierState::Returning, CourierState::Idle),
        ]
    );
    assert_eq!(orchestrator.stats().instructions_completed, 1);
}

#[test]
fn test_action_waits_for_configured_duration() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(0, 65, 0), 16), None);
    commit_delivery(&mut orchestrator, &mut world, 5);

    // Already standing at A's approach spot: first step switches to PICKING_UP
    assert_eq!(courier_state(&world), CourierState::PickingUp);
    let entered = world.courier(COURIER).unwrap().state_entered_at();

    while courier_state(&world) == CourierState::PickingUp {
        orchestrator.tick(&mut world).unwrap();
    }
    let waited = orchestrator.current_tick() - 1 - entered;
    assert_eq!(waited, 3);
    assert_eq!(world.stock(&warehouse_a(), "wood"), 15);
    assert_eq!(world.courier(COURIER).unwrap().carried_quantity("wood"), 5);
}

#[test]
fn test_inaccessible_source_fails_instruction() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);
    world.set_accessible(&warehouse_a(), false);

    assert!(run_until(&mut orchestrator, &mut world, 20, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert_eq!(failure_reasons(&orchestrator, id), vec![FailureReason::SourceInaccessible]);
    assert_eq!(courier_state(&world), CourierState::Idle);
    assert_eq!(world.stock(&warehouse_a(), "wood"), 20);
}

#[test]
fn test_demolished_source_fails_instruction() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);
    assert!(world.remove_container(&warehouse_a()));

    assert!(run_until(&mut orchestrator, &mut world, 20, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert_eq!(failure_reasons(&orchestrator, id), vec![FailureReason::SourceInaccessible]);
    assert!(world.courier(COURIER).unwrap().is_idle());
}

#[test]
fn test_emptied_source_fails_with_insufficient_stock() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);
    world.set_stock(&warehouse_a(), "wood", 0);

    assert!(run_until(&mut orchestrator, &mut world, 20, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert_eq!(failure_reasons(&orchestrator, id), vec![FailureReason::InsufficientStock]);
    assert!(world.courier(COURIER).unwrap().is_idle());
}

#[test]
fn test_shrunken_source_gives_partial_delivery() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);
    world.set_stock(&warehouse_a(), "wood", 3);

    assert!(run_until(&mut orchestrator, &mut world, 60, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert!(failure_reasons(&orchestrator, id).is_empty());
    assert_eq!(world.stock(&warehouse_b(), "wood"), 3);
    assert_eq!(orchestrator.cache().quantity_at(1, &warehouse_b().pos, "wood"), 3);
    assert_eq!(orchestrator.cache().quantity_at(1, &warehouse_a().pos, "wood"), 0);
}

#[test]
fn test_full_destination_keeps_carried_items() {
    let (mut orchestrator, mut world) =
        setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), Some(3));
    let id = commit_delivery(&mut orchestrator, &mut world, 5);

    assert!(run_until(&mut orchestrator, &mut world, 60, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert_eq!(failure_reasons(&orchestrator, id), vec![FailureReason::DestinationFull]);
    let courier = world.courier(COURIER).unwrap();
    assert!(courier.is_idle());
    assert_eq!(courier.carried_quantity("wood"), 5);
    assert_eq!(world.stock(&warehouse_a(), "wood"), 15);
    assert_eq!(world.stock(&warehouse_b(), "wood"), 0);
}

#[test]
fn test_inaccessible_destination_fails_instruction() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);
    world.set_accessible(&warehouse_b(), false);

    assert!(run_until(&mut orchestrator, &mut world, 60, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert_eq!(
        failure_reasons(&orchestrator, id),
        vec![FailureReason::DestinationInaccessible]
    );
    assert_eq!(world.courier(COURIER).unwrap().carried_quantity("wood"), 5);
}

#[test]
fn test_blocked_courier_times_out() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(-20, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);
    world.set_blocked(COURIER, true);
    let entered = world.courier(COURIER).unwrap().state_entered_at();
    let stuck_at = world.courier(COURIER).unwrap().position();

    assert!(run_until(&mut orchestrator, &mut world, 60, |o, _| o
        .get_active_instruction(id)
        .is_none()));

    assert_eq!(failure_reasons(&orchestrator, id), vec![FailureReason::StateTimeout]);
    // Timeout fires on the first tick strictly past the limit
    assert_eq!(orchestrator.current_tick() - 1, entered + 31);
    assert!(world.courier(COURIER).unwrap().is_idle());
    assert_eq!(world.courier(COURIER).unwrap().position(), stuck_at);
}

#[test]
fn test_external_completion_cancels_courier() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(-20, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);

    let removed = orchestrator.complete_instruction(id).unwrap();
    assert_eq!(removed.id(), id);
    assert_eq!(courier_state(&world), CourierState::MovingToSource);

    orchestrator.tick(&mut world).unwrap();
    let courier = world.courier(COURIER).unwrap();
    assert!(courier.is_idle());
    assert_eq!(courier.active_instruction(), None);
    assert_eq!(world.stock(&warehouse_a(), "wood"), 20);
}

#[test]
fn test_external_failure_is_recorded() {
    let (mut orchestrator, mut world) = setup(Courier::new(COURIER, 1, BlockPos::new(-20, 64, 0), 16), None);
    let id = commit_delivery(&mut orchestrator, &mut world, 5);

    orchestrator
        .fail_instruction(id, FailureReason::External("courier recalled".to_string()))
        .unwrap();
    orchestrator.tick(&mut world).unwrap();

    assert_eq!(
        failure_reasons(&orchestrator, id),
        vec![FailureReason::External("courier recalled".to_string())]
    );
    assert!(world.courier(COURIER).unwrap().is_idle());
    assert_eq!(orchestrator.stats().instructions_failed, 1);
}

#[test]
fn test_courier_with_home_walks_back_before_idle() {
    let home = BlockPos::new(-6, 64, 0);
    let (mut orchestrator, mut world) = setup(
        Courier::new(COURIER, 1, BlockPos::new(1, 64, 0), 16).with_home(home),
        None,
    );
    let id = commit_delivery(&mut orchestrator, &mut world, 5);

    assert!(run_until(&mut orchestrator, &mut world, 100, |o, _| o
        .get_active_instruction(id)
        .is_none()));
    assert_eq!(courier_state(&world), CourierState::Returning);

    assert!(run_until(&mut orchestrator, &mut world, 100, |_, w| w
        .courier(COURIER)
        .unwrap()
        .is_idle()));
    let position = world.courier(COURIER).unwrap().position();
    assert!(position.distance_sq(&home) <= 1);
}
