pub mod accumulation;
pub mod bucket;
pub mod chance;
pub mod evaporation;
pub mod rain;
pub mod statistics;
pub mod tick_guard;

use std::fmt;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::config::simulation::CycleConfig;
use crate::persistence::humidity::{HumidityDefaults, HumidityStore};
use crate::simulation::accumulation::BlacklistCache;
use crate::simulation::statistics::TickStatistics;
use crate::simulation::tick_guard::TickGuard;
use crate::world::{Cell, HostError, HostWorld, RegionPos};

/// Fluid volume of one cell, in milli-units.
pub const FLUID_VOLUME: i32 = 1000;

/// Added to rain chances in regions with at least one statue.
pub const STATUE_BONUS: f64 = 0.1;

pub(crate) fn statue_bonus(store: &HumidityStore, region: RegionPos) -> f64 {
    if store.get_statue_count(region) > 0 {
        STATUE_BONUS
    } else {
        0.0
    }
}

/// Record a statue placed at `cell`.
pub fn on_statue_placed(store: &mut HumidityStore, cell: Cell) {
    store.change_statue_count_at(cell, 1);
}

/// Record a statue leaving `cell`, whether broken or pushed away.
pub fn on_statue_removed(store: &mut HumidityStore, cell: Cell) {
    store.change_statue_count_at(cell, -1);
}

#[derive(Debug)]
pub enum SimulationError {
    /// Simulation state lives with the authoritative copy of a world only.
    NotAuthoritative(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::NotAuthoritative(world) => {
                write!(f, "World '{}' is not authoritative; cannot simulate it", world)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Accumulation,
    Evaporation,
    Bucket,
    Rain,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Engine::Accumulation => "accumulation",
            Engine::Evaporation => "evaporation",
            Engine::Bucket => "bucket",
            Engine::Rain => "rain",
        };
        f.write_str(name)
    }
}

/// A host refusal that ended one engine's pass for a step.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineError {
    pub engine: Engine,
    pub error: HostError,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.engine, self.error)
    }
}

/// Result of executing a single tick.
#[derive(Debug)]
pub struct TickResult {
    pub statistics: TickStatistics,
    pub engine_errors: Vec<EngineError>,
}

/// Per-world simulation state: one guard per engine, the blacklist cache and the random
/// source. Owned by whoever drives the world's steps.
#[derive(Debug)]
pub struct WorldSimulation {
    world: String,
    config: CycleConfig,
    accumulation_guard: TickGuard,
    evaporation_guard: TickGuard,
    rain_guard: TickGuard,
    bucket_guard: TickGuard,
    blacklist: BlacklistCache,
    rng: ChaCha8Rng,
    tick_count: u64,
}

impl WorldSimulation {
    /// Create the simulation context for a world. If `config.seed` is 0, a random seed is
    /// chosen.
    pub fn new<W: HostWorld + ?Sized>(world: &W, config: CycleConfig) -> Result<Self, SimulationError> {
        if !world.is_authoritative() {
            return Err(SimulationError::NotAuthoritative(world.name().to_string()));
        }

        let seed = if config.seed == 0 {
            rand::thread_rng().r#gen()
        } else {
            config.seed
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        debug!(world = %world.name(), seed, "Creating simulation");

        Ok(Self {
            world: world.name().to_string(),
            accumulation_guard: TickGuard::from_smoothness(config.accumulation.smoothness_percent),
            evaporation_guard: TickGuard::from_smoothness(config.evaporation.smoothness_percent),
            rain_guard: TickGuard::random(rain::RAIN_DELAY_MIN, rain::RAIN_DELAY_MAX, &mut rng),
            bucket_guard: TickGuard::constant(bucket::BUCKET_CHECK_DELAY),
            blacklist: BlacklistCache::new(),
            rng,
            tick_count: 0,
            config,
        })
    }

    /// Continue counting from a saved step.
    pub fn with_tick_count(mut self, tick_count: u64) -> Self {
        self.tick_count = tick_count;
        self
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn humidity_defaults(&self) -> HumidityDefaults {
        HumidityDefaults::from_config(&self.config)
    }

    /// Swap in a new configuration. Guards pick up new smoothness values the next time they
    /// fire; the store's defaults apply to regions materialized from now on.
    pub fn reload_config(&mut self, config: CycleConfig, store: &mut HumidityStore) {
        self.accumulation_guard.retune(config.accumulation.smoothness_percent);
        self.evaporation_guard.retune(config.evaporation.smoothness_percent);
        store.set_defaults(HumidityDefaults::from_config(&config));
        self.config = config;
    }

    /// Execute a single simulation step on the world.
    ///
    /// Each engine checks its own guard and runs at most once. A host refusal ends only the
    /// engine that hit it; the others still run.
    pub fn execute_tick<W: HostWorld + ?Sized>(&mut self, world: &mut W, store: &mut HumidityStore) -> TickResult {
        let tick_start = Instant::now();
        let mut errors: Vec<EngineError> = Vec::new();
        let mut stats = TickStatistics::default();

        if self.config.accumulation.enabled
            && world.is_raining()
            && self.accumulation_guard.ready(&mut self.rng)
        {
            match accumulation::accumulate(
                world,
                store,
                &self.config.accumulation,
                &mut self.blacklist,
                &mut self.rng,
            ) {
                Ok(placed) => stats.accumulated = placed,
                Err(error) => errors.push(EngineError {
                    engine: Engine::Accumulation,
                    error,
                }),
            }
        }

        if self.config.evaporation.enabled
            && !world.is_raining()
            && self.evaporation_guard.ready(&mut self.rng)
        {
            match evaporation::evaporate(world, store, &self.config.evaporation, &mut self.rng) {
                Ok(removed) => stats.evaporated = removed,
                Err(error) => errors.push(EngineError {
                    engine: Engine::Evaporation,
                    error,
                }),
            }
        }

        if self.config.evaporation.enabled
            && world.is_raining()
            && self.bucket_guard.ready(&mut self.rng)
        {
            match bucket::fill_containers(world, store, &mut self.rng) {
                Ok(filled) => stats.filled = filled,
                Err(error) => errors.push(EngineError {
                    engine: Engine::Bucket,
                    error,
                }),
            }
        }

        if self.config.rain_control_active()
            && world.has_sky_light()
            && self.rain_guard.ready(&mut self.rng)
        {
            match rain::control_rain(world, store, self.config.rain.humidity_threshold, &mut self.rng) {
                Ok(change) => stats.weather_change = change,
                Err(error) => errors.push(EngineError {
                    engine: Engine::Rain,
                    error,
                }),
            }
        }

        self.tick_count += 1;

        for error in &errors {
            warn!(
                world = %self.world,
                tick = self.tick_count,
                engine = %error.engine,
                error = %error.error,
                "Engine step failed"
            );
        }

        stats.tick = self.tick_count;
        stats.engine_errors = errors.len() as u32;
        stats.tick_duration_ms = tick_start.elapsed().as_secs_f32() * 1000.0;

        TickResult {
            statistics: stats,
            engine_errors: errors,
        }
    }
}
