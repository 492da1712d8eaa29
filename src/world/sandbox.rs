use std::collections::HashMap;

use glam::IVec3;
use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::generation::SandboxParams;
use crate::world::topology::random_cell_in_region;
use crate::world::*;

const MAX_BUILD_HEIGHT: i32 = 320;

#[derive(Debug, Clone)]
struct Column {
    /// Topmost solid terrain cell.
    height: i32,
    /// First open cell of the column as generated.
    natural_surface: i32,
    top_block: String,
    biome: usize,
}

/// In-memory host world over a rectangle of regions anchored at region (0, 0).
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    pub name: String,
    pub params: SandboxParams,
    authoritative: bool,
    sky_light: bool,
    weather: WeatherUpdate,
    day_time: i64,
    width_cells: i32,
    depth_cells: i32,
    columns: Vec<Column>,
    biomes: Vec<BiomeClimate>,
    blocks: HashMap<Cell, String>,
    fluids: HashMap<Cell, FluidState>,
    collectors: Vec<Collector>,
    filled_containers: u32,
}

/// Generate a sandbox world from the given parameters.
///
/// If `params.seed` is 0, a random seed is chosen. The actual seed used
/// is stored in the returned world's `params` for reproducibility.
pub fn generate_sandbox(params: &SandboxParams) -> SandboxWorld {
    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };
    let resolved_params = SandboxParams {
        seed,
        ..params.clone()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut world = SandboxWorld::empty(&resolved_params, format!("sandbox-{}", seed));
    generate_terrain(&mut world, seed as u32);
    fill_lakes(&mut world);
    scatter_collectors(&mut world, &mut rng);
    world
}

/// Print a summary of the generated world.
pub fn print_sandbox_summary(world: &SandboxWorld) {
    println!("=== Sandbox Summary ===");
    println!("Name: {}", world.name);
    println!(
        "Regions: {}x{}",
        world.params.width_regions, world.params.depth_regions
    );
    println!("Seed: {}", world.params.seed);

    let mut biome_counts: HashMap<&str, u32> = HashMap::new();
    for column in &world.columns {
        *biome_counts
            .entry(world.biomes[column.biome].name.as_str())
            .or_insert(0) += 1;
    }
    let mut biome_sorted: Vec<_> = biome_counts.into_iter().collect();
    biome_sorted.sort_by_key(|&(name, _)| name);
    println!("\nBiomes:");
    for (name, count) in &biome_sorted {
        let pct = *count as f32 / world.columns.len() as f32 * 100.0;
        println!("  {:<14} {:>6} ({:.1}%)", name, count, pct);
    }

    let sources = world.fluids.values().filter(|f| f.is_source()).count();
    println!("\nFluid sources: {}", sources);
    println!("Collectors: {}", world.collectors.len());
}

impl SandboxWorld {
    fn empty(params: &SandboxParams, name: String) -> Self {
        let width_cells = params.width_regions as i32 * REGION_SIZE;
        let depth_cells = params.depth_regions as i32 * REGION_SIZE;
        let columns = vec![
            Column {
                height: params.base_height,
                natural_surface: params.base_height + 1,
                top_block: "grass_block".to_string(),
                biome: 0,
            };
            (width_cells * depth_cells) as usize
        ];
        Self {
            name,
            params: params.clone(),
            authoritative: true,
            sky_light: true,
            weather: WeatherUpdate::clear(),
            day_time: 0,
            width_cells,
            depth_cells,
            columns,
            biomes: vec![BiomeClimate::plains()],
            blocks: HashMap::new(),
            fluids: HashMap::new(),
            collectors: Vec::new(),
            filled_containers: 0,
        }
    }

    /// A level world where every column has the same height and biome.
    pub fn flat(width_regions: u32, depth_regions: u32, height: i32, biome: BiomeClimate) -> Self {
        let params = SandboxParams {
            seed: 1,
            width_regions,
            depth_regions,
            base_height: height,
            sea_level: 0,
            simulation_distance: width_regions.max(depth_regions),
            collectors: 0,
            ..SandboxParams::default()
        };
        let mut world = Self::empty(&params, "flat".to_string());
        world.biomes = vec![biome];
        world
    }

    fn column_index(&self, x: i32, z: i32) -> Option<usize> {
        if x < 0 || z < 0 || x >= self.width_cells || z >= self.depth_cells {
            return None;
        }
        Some((z * self.width_cells + x) as usize)
    }

    fn column(&self, x: i32, z: i32) -> Option<&Column> {
        self.column_index(x, z).map(|i| &self.columns[i])
    }

    fn is_loaded(&self, cell: Cell) -> bool {
        self.column_index(cell.x, cell.z).is_some()
    }

    fn observer(&self) -> RegionPos {
        RegionPos::new(self.params.observer_region.0, self.params.observer_region.1)
    }

    // --- Test and runner controls ---

    pub fn set_authoritative(&mut self, authoritative: bool) {
        self.authoritative = authoritative;
    }

    pub fn set_sky_light(&mut self, sky_light: bool) {
        self.sky_light = sky_light;
    }

    pub fn set_raining(&mut self, raining: bool) {
        self.weather = if raining {
            WeatherUpdate::endless_rain()
        } else {
            WeatherUpdate::clear()
        };
    }

    pub fn weather(&self) -> WeatherUpdate {
        self.weather
    }

    pub fn set_day_time(&mut self, day_time: i64) {
        self.day_time = day_time;
    }

    /// Advance the world clock by one step.
    pub fn advance(&mut self) {
        self.day_time += 1;
    }

    pub fn set_block(&mut self, cell: Cell, block: &str) {
        self.blocks.insert(cell, block.to_string());
    }

    pub fn set_fluid(&mut self, cell: Cell, fluid: FluidState) {
        if fluid.is_fluid() {
            self.fluids.insert(cell, fluid);
        } else {
            self.fluids.remove(&cell);
        }
    }

    pub fn set_region_biome(&mut self, region: RegionPos, biome: BiomeClimate) {
        let index = self.biomes.len();
        self.biomes.push(biome);
        for x in region.min_x()..=region.max_x() {
            for z in region.min_z()..=region.max_z() {
                if let Some(i) = self.column_index(x, z) {
                    self.columns[i].biome = index;
                }
            }
        }
    }

    pub fn set_observer(&mut self, region: RegionPos, simulation_distance: u32) {
        self.params.observer_region = (region.x, region.z);
        self.params.simulation_distance = simulation_distance;
    }

    pub fn add_collector(&mut self, collector: Collector) {
        self.collectors.push(collector);
    }

    pub fn filled_containers(&self) -> u32 {
        self.filled_containers
    }

    pub fn fluid_sources(&self) -> usize {
        self.fluids.values().filter(|f| f.is_source()).count()
    }
}

impl BiomeSource for SandboxWorld {
    fn biome_at(&self, cell: Cell) -> BiomeClimate {
        match self.column(cell.x, cell.z) {
            Some(column) => self.biomes[column.biome].clone(),
            None => BiomeClimate::new("void", Precipitation::None, 0.0),
        }
    }
}

impl FluidField for SandboxWorld {
    fn fluid_at(&self, cell: Cell) -> FluidState {
        self.fluids.get(&cell).copied().unwrap_or(FluidState::Empty)
    }
}

impl HostWorld for SandboxWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn has_sky_light(&self) -> bool {
        self.sky_light
    }

    fn is_raining(&self) -> bool {
        self.weather.raining
    }

    fn day_time(&self) -> i64 {
        self.day_time
    }

    fn block_at(&self, cell: Cell) -> String {
        if let Some(block) = self.blocks.get(&cell) {
            return block.clone();
        }
        if self.fluids.contains_key(&cell) {
            return "water".to_string();
        }
        match self.column(cell.x, cell.z) {
            Some(column) if cell.y == column.height => column.top_block.clone(),
            Some(column) if cell.y < column.height => "stone".to_string(),
            _ => "air".to_string(),
        }
    }

    fn surface_at(&self, x: i32, z: i32) -> Cell {
        let height = self.column(x, z).map(|c| c.height).unwrap_or(0);
        let mut cell = IVec3::new(x, height + 1, z);
        while cell.y < MAX_BUILD_HEIGHT
            && (self.fluids.contains_key(&cell)
                || self.blocks.get(&cell).is_some_and(|b| b != "air"))
        {
            cell.y += 1;
        }
        cell
    }

    fn natural_surface(&self, x: i32, z: i32) -> Option<i32> {
        self.column(x, z).map(|c| c.natural_surface)
    }

    fn loaded_regions(&self) -> Vec<RegionPos> {
        let mut regions = Vec::with_capacity(
            (self.params.width_regions * self.params.depth_regions) as usize,
        );
        for x in 0..self.params.width_regions as i32 {
            for z in 0..self.params.depth_regions as i32 {
                regions.push(RegionPos::new(x, z));
            }
        }
        regions
    }

    fn ticking_regions(&self) -> Vec<RegionPos> {
        let observer = self.observer();
        let distance = self.params.simulation_distance as i32;
        self.loaded_regions()
            .into_iter()
            .filter(|r| r.distance(observer) <= distance)
            .collect()
    }

    fn collectors(&self) -> Vec<Collector> {
        self.collectors.clone()
    }

    fn set_fluid_source(&mut self, cell: Cell) -> Result<(), HostError> {
        if !self.is_loaded(cell) {
            return Err(HostError::Unloaded(cell));
        }
        self.blocks.remove(&cell);
        self.fluids.insert(cell, FluidState::Source);
        Ok(())
    }

    fn clear_cell(&mut self, cell: Cell) -> Result<(), HostError> {
        if !self.is_loaded(cell) {
            return Err(HostError::Unloaded(cell));
        }
        self.fluids.remove(&cell);
        self.blocks.insert(cell, "air".to_string());
        Ok(())
    }

    fn set_weather(&mut self, weather: WeatherUpdate) -> Result<(), HostError> {
        self.weather = weather;
        Ok(())
    }

    fn fill_container(&mut self, collector: u64, hand: Hand) -> Result<(), HostError> {
        let holder = self
            .collectors
            .iter_mut()
            .find(|c| c.id == collector)
            .ok_or_else(|| HostError::Rejected(format!("no collector {}", collector)))?;
        let slot = holder
            .empty_containers
            .iter()
            .position(|h| *h == hand)
            .ok_or_else(|| {
                HostError::Rejected(format!("collector {} holds no empty container", collector))
            })?;
        holder.empty_containers.remove(slot);
        self.filled_containers += 1;
        Ok(())
    }
}

// --- Internal generation functions ---

fn generate_terrain(world: &mut SandboxWorld, seed: u32) {
    let elevation = Perlin::new(seed);
    let moisture = Perlin::new(seed.wrapping_add(1));
    let temperature = Perlin::new(seed.wrapping_add(2));
    let amplitude = 24.0 * world.params.roughness;
    let elevation_scale = 0.015;
    let climate_scale = 0.004;

    world.biomes = vec![
        BiomeClimate::desert(),
        BiomeClimate::plains(),
        BiomeClimate::forest(),
        BiomeClimate::swamp(),
        BiomeClimate::snowy_plains(),
    ];

    for z in 0..world.depth_cells {
        for x in 0..world.width_cells {
            let (fx, fz) = (x as f64, z as f64);
            let e = elevation.get([fx * elevation_scale, fz * elevation_scale]);
            let height = world.params.base_height + (e * amplitude).round() as i32;

            let m = moisture.get([fx * climate_scale, fz * climate_scale]);
            let t = temperature.get([fx * climate_scale, fz * climate_scale]);
            let biome = if t < -0.45 {
                4
            } else if m < -0.3 {
                0
            } else if m < 0.05 {
                1
            } else if m < 0.35 {
                2
            } else {
                3
            };

            let top_block = if height < world.params.sea_level || biome == 0 {
                "sand"
            } else if biome == 4 {
                "snow_block"
            } else {
                "grass_block"
            };

            let i = (z * world.width_cells + x) as usize;
            world.columns[i] = Column {
                height,
                natural_surface: height.max(world.params.sea_level) + 1,
                top_block: top_block.to_string(),
                biome,
            };
        }
    }
}

fn fill_lakes(world: &mut SandboxWorld) {
    let sea_level = world.params.sea_level;
    for z in 0..world.depth_cells {
        for x in 0..world.width_cells {
            let height = world.columns[(z * world.width_cells + x) as usize].height;
            for y in (height + 1)..=sea_level {
                world.fluids.insert(IVec3::new(x, y, z), FluidState::Source);
            }
        }
    }
}

fn scatter_collectors(world: &mut SandboxWorld, rng: &mut ChaCha8Rng) {
    let regions = world.loaded_regions();
    for id in 0..world.params.collectors as u64 {
        let Some(region) = regions.choose(rng) else {
            return;
        };
        let column = random_cell_in_region(rng, *region);
        let position = world.surface_at(column.x, column.z);
        world.collectors.push(Collector {
            id,
            position,
            in_rain: true,
            empty_containers: vec![Hand::Main],
        });
    }
}
