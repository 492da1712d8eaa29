use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::generation::SandboxParams;
use crate::config::simulation::CycleConfig;
use crate::persistence::{self, HumidityDefaults, HumidityStore, StoreSnapshot};
use crate::simulation::statistics::compute_statistics;
use crate::simulation::WorldSimulation;
use crate::world::sandbox::{generate_sandbox, print_sandbox_summary, SandboxWorld};
use crate::world::{Cell, HostWorld, RegionPos};

/// Seed of the sandbox when none is configured. Snapshots are matched to worlds by name,
/// and a random seed would orphan them on the next run.
const DEFAULT_SANDBOX_SEED: u64 = 1;

/// Which region a humidity command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTarget {
    /// The region the sandbox observer stands in.
    Observer,
    Region(RegionPos),
    /// The region containing a cell.
    Cell(Cell),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityAction {
    Get,
    Set(i32),
    Reset,
}

/// Build the sandbox world and open its humidity store.
pub fn open_world(
    config: &CycleConfig,
    sandbox_path: Option<&str>,
) -> Result<(SandboxWorld, HumidityStore, u64), String> {
    let mut params = match sandbox_path {
        Some(path) => SandboxParams::from_file(Path::new(path))?,
        None => SandboxParams::default(),
    };
    if params.seed == 0 {
        params.seed = DEFAULT_SANDBOX_SEED;
    }
    let world = generate_sandbox(&params);

    let snapshot_dir = Path::new(&config.snapshot_directory);
    let (store, tick) = persistence::load_store(&world, snapshot_dir, HumidityDefaults::from_config(config))
        .map_err(|e| format!("Failed to load humidity store: {}", e))?;
    Ok((world, store, tick))
}

fn save_store(world: &SandboxWorld, store: &mut HumidityStore, tick: u64, config: &CycleConfig) -> Result<(), String> {
    let snapshot = StoreSnapshot {
        world: world.name().to_string(),
        tick_count: tick,
        record: store.to_record(),
    };
    let snapshot_dir = Path::new(&config.snapshot_directory);
    let path = persistence::save_snapshot(&snapshot, snapshot_dir)
        .map_err(|e| format!("Cannot save snapshot: {}", e))?;
    store.mark_clean();
    info!(path = %path.display(), tick, "Snapshot saved");

    if let Err(e) = persistence::prune_snapshots(snapshot_dir, world.name(), config.max_snapshots as usize) {
        warn!(error = %e, "Snapshot pruning failed");
    }
    Ok(())
}

/// Run the sandbox for `ticks` steps, saving the store every `snapshot_interval` steps and
/// once more at the end.
pub fn run_simulation(config: &CycleConfig, sandbox_path: Option<&str>, ticks: u64) -> Result<(), String> {
    let (mut world, mut store, start_tick) = open_world(config, sandbox_path)?;
    print_sandbox_summary(&world);

    let mut sim = WorldSimulation::new(&world, config.clone())
        .map_err(|e| e.to_string())?
        .with_tick_count(start_tick);

    info!(
        world = %world.name(),
        start_tick,
        ticks,
        snapshot_interval = config.snapshot_interval,
        "Simulation running"
    );

    let mut accumulated = 0u64;
    let mut evaporated = 0u64;
    let mut filled = 0u64;
    let mut weather_changes = 0u64;
    let mut engine_errors = 0u64;
    let mut ticks_since_snapshot: u32 = 0;

    for _ in 0..ticks {
        world.advance();
        let result = sim.execute_tick(&mut world, &mut store);
        let stats = &result.statistics;
        accumulated += stats.accumulated as u64;
        evaporated += stats.evaporated as u64;
        filled += stats.filled as u64;
        engine_errors += stats.engine_errors as u64;
        if let Some(change) = stats.weather_change {
            weather_changes += 1;
            info!(tick = stats.tick, change = ?change, "Weather changed");
        }

        ticks_since_snapshot += 1;
        if ticks_since_snapshot >= config.snapshot_interval {
            match save_store(&world, &mut store, sim.tick_count(), config) {
                Ok(()) => ticks_since_snapshot = 0,
                Err(e) => warn!(error = %e, "Snapshot save failed"),
            }
        }

        if sim.tick_count() % 1000 == 0 {
            let summary = compute_statistics(&store);
            info!(
                tick = sim.tick_count(),
                raining = world.is_raining(),
                regions = summary.regions,
                mean_humidity = summary.mean_humidity,
                "Tick milestone"
            );
        }
    }

    save_store(&world, &mut store, sim.tick_count(), config)?;

    println!("\n=== Run Summary ===");
    println!("Ticks: {} -> {}", start_tick, sim.tick_count());
    println!("Accumulated: {}", accumulated);
    println!("Evaporated: {}", evaporated);
    println!("Containers filled: {}", filled);
    println!("Weather changes: {}", weather_changes);
    println!("Engine errors: {}", engine_errors);
    println!("Raining: {}", world.is_raining());
    Ok(())
}

fn resolve_region(world: &SandboxWorld, target: RegionTarget) -> RegionPos {
    match target {
        RegionTarget::Observer => RegionPos::new(world.params.observer_region.0, world.params.observer_region.1),
        RegionTarget::Region(region) => region,
        RegionTarget::Cell(cell) => RegionPos::containing(cell),
    }
}

/// Apply one humidity command to the store and report the result. Mutations are saved
/// right away; reads never write.
pub fn humidity(
    config: &CycleConfig,
    sandbox_path: Option<&str>,
    target: RegionTarget,
    action: HumidityAction,
) -> Result<String, String> {
    let (world, mut store, tick) = open_world(config, sandbox_path)?;
    let region = resolve_region(&world, target);

    let message = match action {
        HumidityAction::Get => {
            let reading = store.read_humidity(region, &world);
            let note = if reading.initialized { " (default)" } else { "" };
            format!("Humidity in {}: {}{}", region, reading.value, note)
        }
        HumidityAction::Set(amount) => {
            store.set_humidity(region, amount);
            format!("Set humidity in {} to {}", region, amount)
        }
        HumidityAction::Reset => {
            store.reset_humidity(region);
            format!("Reset humidity in {}", region)
        }
    };

    if store.is_dirty() {
        save_store(&world, &mut store, tick, config)?;
    }
    Ok(message)
}

/// Clear every region's humidity. Refuses unless `confirm` is set.
pub fn humidity_reset_all(config: &CycleConfig, sandbox_path: Option<&str>, confirm: bool) -> Result<String, String> {
    let (world, mut store, tick) = open_world(config, sandbox_path)?;
    if !store.reset_all_humidity(confirm) {
        return Err("Refusing to reset all humidity without --confirm".to_string());
    }
    save_store(&world, &mut store, tick, config)?;
    Ok("Reset humidity in every region".to_string())
}

#[derive(Debug, Serialize)]
struct InspectReport {
    world: String,
    tick: u64,
    regions: usize,
    total_humidity: i64,
    mean_humidity: f64,
    min_humidity: Option<i32>,
    max_humidity: Option<i32>,
    statue_regions: usize,
    statues: i64,
    relative_humidity: f64,
}

/// Print aggregate humidity for the sandbox's store, as text or JSON.
pub fn inspect(config: &CycleConfig, sandbox_path: Option<&str>, json: bool) -> Result<(), String> {
    let (world, store, tick) = open_world(config, sandbox_path)?;
    let stats = compute_statistics(&store);
    let report = InspectReport {
        world: world.name().to_string(),
        tick,
        regions: stats.regions,
        total_humidity: stats.total_humidity,
        mean_humidity: stats.mean_humidity,
        min_humidity: stats.min_humidity,
        max_humidity: stats.max_humidity,
        statue_regions: stats.statue_regions,
        statues: stats.statues,
        relative_humidity: stats.mean_humidity / config.rain.humidity_threshold as f64,
    };

    if json {
        let body = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", body);
        return Ok(());
    }

    println!("=== Humidity: {} ===", report.world);
    println!("Tick: {}", report.tick);
    println!("Regions tracked: {}", report.regions);
    println!("Total humidity: {}", report.total_humidity);
    println!(
        "Mean humidity: {:.1} ({:.1}% of threshold)",
        report.mean_humidity,
        report.relative_humidity * 100.0
    );
    match (report.min_humidity, report.max_humidity) {
        (Some(min), Some(max)) => println!("Range: {} .. {}", min, max),
        _ => println!("Range: (no regions)"),
    }
    println!("Statues: {} in {} region(s)", report.statues, report.statue_regions);
    Ok(())
}
