pub mod block;
pub mod sandbox;
pub mod topology;

use std::fmt;

use glam::IVec3;
use serde::{Deserialize, Serialize};

pub use block::{BiomeClimate, Collector, FluidState, Hand, Precipitation, WeatherUpdate};

/// A single grid cell. `y` is vertical.
pub type Cell = IVec3;

/// Side length of a region, in cells.
pub const REGION_SIZE: i32 = 16;

/// Coordinate of a 16x16 column of cells. The unit of persistence and sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The region a cell falls in. Negative coordinates round toward negative infinity.
    pub fn containing(cell: Cell) -> Self {
        Self {
            x: cell.x.div_euclid(REGION_SIZE),
            z: cell.z.div_euclid(REGION_SIZE),
        }
    }

    pub fn min_x(&self) -> i32 {
        self.x * REGION_SIZE
    }

    pub fn min_z(&self) -> i32 {
        self.z * REGION_SIZE
    }

    pub fn max_x(&self) -> i32 {
        self.min_x() + REGION_SIZE - 1
    }

    pub fn max_z(&self) -> i32 {
        self.min_z() + REGION_SIZE - 1
    }

    /// Middle column of the region at height 0.
    pub fn center(&self) -> Cell {
        IVec3::new(self.min_x() + REGION_SIZE / 2, 0, self.min_z() + REGION_SIZE / 2)
    }

    /// Chebyshev distance in regions.
    pub fn distance(&self, other: RegionPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// A host world refused or failed a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    Unloaded(Cell),
    Rejected(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Unloaded(cell) => {
                write!(f, "cell ({}, {}, {}) is not loaded", cell.x, cell.y, cell.z)
            }
            HostError::Rejected(reason) => write!(f, "mutation rejected: {}", reason),
        }
    }
}

impl std::error::Error for HostError {}

/// Biome lookups. Enough to derive a region's initial humidity.
pub trait BiomeSource {
    fn biome_at(&self, cell: Cell) -> BiomeClimate;
}

/// Fluid lookups. Enough to walk flow vectors back to a source.
pub trait FluidField {
    fn fluid_at(&self, cell: Cell) -> FluidState;
}

/// Everything the water cycle reads from and writes to the world that hosts it.
///
/// Implemented by whatever adapter talks to the actual world; the simulation never
/// reaches past this seam.
pub trait HostWorld: BiomeSource + FluidField {
    /// Log-friendly world identity.
    fn name(&self) -> &str;

    /// Whether this context owns the world state. Persisted counters may only be touched
    /// from an authoritative context.
    fn is_authoritative(&self) -> bool;

    fn has_sky_light(&self) -> bool;

    fn is_raining(&self) -> bool;

    /// Raw time of day. 0 is one hour after sunrise; a full day is 24000.
    fn day_time(&self) -> i64;

    /// Block identifier at a cell, e.g. "grass_block".
    fn block_at(&self, cell: Cell) -> String;

    /// First open cell above the topmost solid or fluid cell of the column.
    fn surface_at(&self, x: i32, z: i32) -> Cell;

    /// Height of the column's untouched terrain surface, if the host tracks it.
    fn natural_surface(&self, _x: i32, _z: i32) -> Option<i32> {
        None
    }

    /// Every region currently held in memory.
    fn loaded_regions(&self) -> Vec<RegionPos>;

    /// Loaded regions close enough to an observer to receive simulation steps.
    fn ticking_regions(&self) -> Vec<RegionPos>;

    /// Actors that may catch rain in a container.
    fn collectors(&self) -> Vec<Collector> {
        Vec::new()
    }

    fn set_fluid_source(&mut self, cell: Cell) -> Result<(), HostError>;

    fn clear_cell(&mut self, cell: Cell) -> Result<(), HostError>;

    fn set_weather(&mut self, weather: WeatherUpdate) -> Result<(), HostError>;

    fn fill_container(&mut self, _collector: u64, _hand: Hand) -> Result<(), HostError> {
        Err(HostError::Rejected("collectors are not supported".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_region_floors_negative_cells() {
        assert_eq!(RegionPos::containing(IVec3::new(0, 64, 0)), RegionPos::new(0, 0));
        assert_eq!(RegionPos::containing(IVec3::new(15, 0, 15)), RegionPos::new(0, 0));
        assert_eq!(RegionPos::containing(IVec3::new(16, 0, -1)), RegionPos::new(1, -1));
        assert_eq!(RegionPos::containing(IVec3::new(-16, 0, -17)), RegionPos::new(-1, -2));
    }

    #[test]
    fn region_bounds_span_sixteen_cells() {
        let region = RegionPos::new(-2, 3);
        assert_eq!(region.min_x(), -32);
        assert_eq!(region.max_x(), -17);
        assert_eq!(region.min_z(), 48);
        assert_eq!(region.max_z(), 63);
        assert_eq!(RegionPos::containing(region.center()), region);
    }

    #[test]
    fn distance_is_chebyshev() {
        let origin = RegionPos::new(0, 0);
        assert_eq!(origin.distance(RegionPos::new(2, -1)), 2);
        assert_eq!(origin.distance(RegionPos::new(-3, 3)), 3);
        assert_eq!(origin.distance(origin), 0);
    }

    #[test]
    fn region_display() {
        assert_eq!(RegionPos::new(4, -7).to_string(), "[4, -7]");
    }
}
