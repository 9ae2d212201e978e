//! Courier Logistics Headless Scenario Runner
//!
//! Loads a JSON scenario (warehouses, couriers, stock, demand), runs the
//! scheduling engine against the in-memory world and prints a JSON summary.
//!
//! Usage:
//!   courier-sim <scenario.json> [--ticks N] [--seed N] [--config config.json]
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` (default `info`).

use courier_logistics_core::arrivals::{DemandGenerator, DemandProfile};
use courier_logistics_core::world::sim::SimWorld;
use courier_logistics_core::world::ContainerAccess;
use courier_logistics_core::{
    BlockPos, Courier, ItemEntry, ItemRequest, LogisticsConfig, LogisticsStats, Orchestrator,
    Priority, RequestType, RngManager, SolverMode, WarehouseLocation, ZoneId,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str =
    "Usage: courier-sim <scenario.json> [--ticks N] [--seed N] [--config config.json]";

const SOLVER_WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Scenario file
// ============================================================================

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: LogisticsConfig,
    #[serde(default = "default_ticks")]
    ticks: usize,
    #[serde(default)]
    seed: u64,
    warehouses: Vec<WarehouseSpec>,
    couriers: Vec<CourierSpec>,
    #[serde(default)]
    demand_profiles: Vec<DemandProfile>,
    #[serde(default)]
    requests: Vec<RequestSpec>,
}

fn default_ticks() -> usize {
    1_000
}

#[derive(Debug, Deserialize)]
struct WarehouseSpec {
    location: WarehouseLocation,
    /// Total item capacity, unbounded when absent
    capacity: Option<u32>,
    #[serde(default)]
    stock: Vec<ItemEntry>,
}

#[derive(Debug, Deserialize)]
struct CourierSpec {
    id: u32,
    zone: ZoneId,
    position: BlockPos,
    carry_capacity: u32,
    home: Option<BlockPos>,
}

/// Manual request submitted at a fixed tick
#[derive(Debug, Deserialize)]
struct RequestSpec {
    #[serde(default)]
    at_tick: usize,
    item_id: String,
    quantity: u32,
    destination: WarehouseLocation,
    #[serde(default)]
    priority: Priority,
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Serialize)]
struct WarehouseReport {
    location: WarehouseLocation,
    items: Vec<ItemEntry>,
}

#[derive(Debug, Serialize)]
struct Summary {
    ticks: usize,
    seed: u64,
    stats: LogisticsStats,
    warehouses: Vec<WarehouseReport>,
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Default)]
struct Args {
    scenario: String,
    ticks: Option<usize>,
    seed: Option<u64>,
    config: Option<String>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--ticks" => {
                let value = raw.next().ok_or("--ticks needs a value")?;
                args.ticks = Some(value.parse().map_err(|_| format!("invalid --ticks: {value}"))?);
            }
            "--seed" => {
                let value = raw.next().ok_or("--seed needs a value")?;
                args.seed = Some(value.parse().map_err(|_| format!("invalid --seed: {value}"))?);
            }
            "--config" => {
                args.config = Some(raw.next().ok_or("--config needs a path")?);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
            path if args.scenario.is_empty() => args.scenario = path.to_string(),
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }
    if args.scenario.is_empty() {
        return Err("missing scenario path".to_string());
    }
    Ok(args)
}

// ============================================================================
// Run
// ============================================================================

fn build_world(scenario: &Scenario, orchestrator: &Orchestrator) -> SimWorld {
    let mut world = SimWorld::new();
    for spec in &scenario.warehouses {
        world.add_container(spec.location.clone(), spec.capacity);
        for entry in &spec.stock {
            world.set_stock(&spec.location, entry.item_id(), entry.quantity());
        }
        orchestrator.register_warehouse(&spec.location);
    }
    for spec in &scenario.couriers {
        let mut courier = Courier::new(spec.id, spec.zone, spec.position, spec.carry_capacity);
        if let Some(home) = spec.home {
            courier = courier.with_home(home);
        }
        world.add_courier(courier);
    }
    world
}

fn run(args: Args) -> Result<Summary, Box<dyn Error>> {
    let mut scenario: Scenario = serde_json::from_str(&std::fs::read_to_string(&args.scenario)?)?;
    if let Some(path) = &args.config {
        scenario.config = LogisticsConfig::from_json(&std::fs::read_to_string(path)?)?;
    }
    let ticks = args.ticks.unwrap_or(scenario.ticks);
    let seed = args.seed.unwrap_or(scenario.seed);

    let background = scenario.config.solver_mode == SolverMode::Background;
    let mut orchestrator = Orchestrator::new(scenario.config.clone())?;
    let mut world = build_world(&scenario, &orchestrator);
    let generator = DemandGenerator::new(std::mem::take(&mut scenario.demand_profiles))?;
    let mut rng = RngManager::new(seed);

    info!(
        scenario = %args.scenario,
        ticks,
        seed,
        warehouses = scenario.warehouses.len(),
        couriers = scenario.couriers.len(),
        demand_profiles = generator.profiles().len(),
        "scenario loaded"
    );

    for _ in 0..ticks {
        let tick = orchestrator.current_tick();
        for spec in scenario.requests.iter().filter(|r| r.at_tick == tick) {
            let request = ItemRequest::new(
                spec.destination.zone,
                spec.item_id.clone(),
                spec.quantity,
                spec.destination.clone(),
                tick,
            )?
            .with_priority(spec.priority)
            .with_request_type(RequestType::Manual);
            orchestrator.submit_request(request);
        }
        for request in generator.generate(tick, &mut rng) {
            orchestrator.submit_request(request);
        }

        orchestrator.tick(&mut world)?;

        // Keeps commit timing independent of thread scheduling
        if background && !orchestrator.wait_for_solver(SOLVER_WAIT) {
            warn!(tick, "solver still busy after {:?}", SOLVER_WAIT);
        }
    }

    let warehouses = world
        .container_locations()
        .map(|location| WarehouseReport {
            location: location.clone(),
            items: world.contents(location).unwrap_or_default(),
        })
        .collect();

    Ok(Summary {
        ticks,
        seed,
        stats: orchestrator.stats(),
        warehouses,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to encode summary: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
