use glam::Vec3;
use serde::{Deserialize, Serialize};

// === Enums ===

/// What falls from the sky in a biome while the world is raining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precipitation {
    None,
    Rain,
    Snow,
}

/// Fluid content of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FluidState {
    Empty,
    Source,
    /// Flowing fluid. `flow` points downstream; zero means the flows around this cell cancel out.
    Flowing { flow: Vec3 },
}

impl FluidState {
    pub fn is_source(&self) -> bool {
        matches!(self, FluidState::Source)
    }

    pub fn is_fluid(&self) -> bool {
        !matches!(self, FluidState::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    Main,
    Off,
}

// === Climate ===

/// Climate properties of the biome at a cell, as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeClimate {
    pub name: String,
    pub precipitation: Precipitation,
    /// Relative precipitation intensity in [0, 1].
    pub downfall: f64,
}

impl BiomeClimate {
    pub fn new(name: &str, precipitation: Precipitation, downfall: f64) -> Self {
        Self {
            name: name.to_string(),
            precipitation,
            downfall,
        }
    }

    pub fn plains() -> Self {
        Self::new("plains", Precipitation::Rain, 0.4)
    }

    pub fn desert() -> Self {
        Self::new("desert", Precipitation::None, 0.0)
    }

    pub fn swamp() -> Self {
        Self::new("swamp", Precipitation::Rain, 0.9)
    }

    pub fn forest() -> Self {
        Self::new("forest", Precipitation::Rain, 0.8)
    }

    pub fn snowy_plains() -> Self {
        Self::new("snowy_plains", Precipitation::Snow, 0.5)
    }
}

// === Weather ===

/// World weather parameters written back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherUpdate {
    pub clear_time: i32,
    pub rain_time: i32,
    pub raining: bool,
    pub thundering: bool,
}

impl WeatherUpdate {
    /// Rain with no scheduled end.
    pub fn endless_rain() -> Self {
        Self {
            clear_time: 0,
            rain_time: i32::MAX,
            raining: true,
            thundering: false,
        }
    }

    pub fn clear() -> Self {
        Self {
            clear_time: 0,
            rain_time: 0,
            raining: false,
            thundering: false,
        }
    }
}

// === Collectors ===

/// An actor that can catch rain in a held container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collector {
    pub id: u64,
    pub position: glam::IVec3,
    pub in_rain: bool,
    /// Hands currently holding a single empty container.
    pub empty_containers: Vec<Hand>,
}
