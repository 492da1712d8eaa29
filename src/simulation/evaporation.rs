use std::f64::consts::PI;

use glam::{IVec3, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::chance::{decimal, percent, scale_with_smoothness};
use super::FLUID_VOLUME;
use crate::config::simulation::EvaporationConfig;
use crate::persistence::humidity::HumidityStore;
use crate::world::topology::region_area_cells;
use crate::world::{Cell, FluidField, FluidState, HostError, HostWorld, RegionPos};

/// Length of a full day in world time units.
const DAY_LENGTH: i64 = 24_000;
/// Time units between sunrise and sunset.
const DAYLIGHT_SPAN: i64 = 14_000;
/// World time is 0 an hour after the sun appears.
const SUNRISE_OFFSET: i64 = 1_000;

/// Neighbors tried, in order, when a search reaches a cell with no flow to follow.
const FALLBACK_DIRECTIONS: [IVec3; 5] = [IVec3::Y, IVec3::X, IVec3::NEG_X, IVec3::Z, IVec3::NEG_Z];

/// Outcome of [`find_nearest_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSearch {
    Found { cell: Cell, steps: u32 },
    /// Ran out of steps before reaching a source.
    Exhausted { steps: u32 },
    /// Reached a cell with no flow and no untried fluid neighbor.
    DeadEnd { steps: u32 },
    /// The starting cell holds no fluid.
    NotFluid,
}

/// Evaporation scalar for a world time: peaks at noon, pinned to `1 - sun_coefficient` at
/// night.
pub fn time_of_day_scale(day_time: i64, sun_coefficient: f64) -> f64 {
    let min = 1.0 - sun_coefficient;
    let tod = (day_time + SUNRISE_OFFSET).rem_euclid(DAY_LENGTH);
    if min < 1.0 && tod <= DAYLIGHT_SPAN {
        min + (1.0 - min) * (tod as f64 * PI / DAYLIGHT_SPAN as f64).sin()
    } else {
        min
    }
}

/// One cell against the flow on each axis.
fn upstream(flow: Vec3) -> IVec3 {
    let against = |v: f32| {
        if v == 0.0 {
            0
        } else if v < 0.0 {
            1
        } else {
            -1
        }
    };
    IVec3::new(against(flow.x), against(flow.y), against(flow.z))
}

/// Follow flowing fluid upstream from `start` until a source is reached, taking at most
/// `tenacity` steps.
///
/// Where the flow cancels out, the search moves to the first not-yet-tried neighbor in
/// [`FALLBACK_DIRECTIONS`] that holds fluid. This can miss a source hidden behind a dead
/// zone between two sources, but never reports a cell that is not a source.
pub fn find_nearest_source<F: FluidField + ?Sized>(fluids: &F, start: Cell, tenacity: u32) -> SourceSearch {
    let mut cell = start;
    let mut steps = 0;
    let mut fallback = FALLBACK_DIRECTIONS.iter();

    loop {
        let state = fluids.fluid_at(cell);
        match state {
            FluidState::Source => return SourceSearch::Found { cell, steps },
            FluidState::Empty if steps == 0 => return SourceSearch::NotFluid,
            _ => {}
        }
        if steps >= tenacity {
            return SourceSearch::Exhausted { steps };
        }

        cell = match state {
            FluidState::Flowing { flow } if flow != Vec3::ZERO => cell + upstream(flow),
            _ => {
                let from = cell;
                match fallback.find(|dir| fluids.fluid_at(from + **dir).is_fluid()) {
                    Some(dir) => from + *dir,
                    None => return SourceSearch::DeadEnd { steps },
                }
            }
        };
        steps += 1;
    }
}

/// Look for a fluid source on the surface of a region. Columns are visited in random order
/// so large bodies of fluid are not drained from one spot.
pub fn find_source_in_region<W, R>(world: &W, region: RegionPos, tenacity: u32, rng: &mut R) -> Option<Cell>
where
    W: HostWorld + ?Sized,
    R: Rng + ?Sized,
{
    let mut columns: Vec<Cell> = region_area_cells(region).collect();
    columns.shuffle(rng);

    for column in columns {
        let candidate = world.surface_at(column.x, column.z) - IVec3::Y;
        match world.fluid_at(candidate) {
            FluidState::Source => return Some(candidate),
            FluidState::Flowing { .. } => match find_nearest_source(world, candidate, tenacity) {
                SourceSearch::Found { cell, .. } => return Some(cell),
                other => debug!(cell = ?candidate, result = ?other, "No source behind flowing fluid"),
            },
            FluidState::Empty => {}
        }
    }
    None
}

/// Run one evaporation pass over the ticking regions. Returns the number of sources removed.
pub fn evaporate<W, R>(
    world: &mut W,
    store: &mut HumidityStore,
    config: &EvaporationConfig,
    rng: &mut R,
) -> Result<u32, HostError>
where
    W: HostWorld + ?Sized,
    R: Rng + ?Sized,
{
    let chance = scale_with_smoothness(config.intensity_percent, config.smoothness_percent);
    let sun = time_of_day_scale(world.day_time(), config.sun_coefficient);
    let mut removed = 0;

    for region in world.ticking_regions() {
        if !percent(rng, chance) {
            continue;
        }
        if !decimal(rng, sun) {
            continue;
        }

        let Some(source) = find_source_in_region(&*world, region, config.tenacity, rng) else {
            continue;
        };
        if let Some(natural) = world.natural_surface(source.x, source.z) {
            if source.y < natural.saturating_sub(config.max_height) {
                debug!(cell = ?source, natural, "Evaporation below max height");
                continue;
            }
        }
        // Drier biomes evaporate more.
        if !decimal(rng, 1.0 - world.biome_at(source).downfall) {
            continue;
        }

        world.clear_cell(source)?;
        debug!(cell = ?source, "Evaporating at");
        store.change_humidity_at(source, FLUID_VOLUME, &*world);
        removed += 1;
    }

    Ok(removed)
}
