use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use glam::IVec3;
use rand::Rng;
use tracing::debug;

use super::chance::{decimal, percent, scale_with_smoothness};
use super::{statue_bonus, FLUID_VOLUME};
use crate::config::simulation::AccumulationConfig;
use crate::persistence::humidity::HumidityStore;
use crate::world::topology::random_cell_in_region;
use crate::world::{HostError, HostWorld, Precipitation};

/// The configured blacklist as a set. Rebuilt only when the list's hash changes.
#[derive(Debug, Default)]
pub struct BlacklistCache {
    hash: Option<u64>,
    blocks: HashSet<String>,
    rebuilds: u32,
}

impl BlacklistCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, blacklist: &[String]) {
        let mut hasher = DefaultHasher::new();
        blacklist.hash(&mut hasher);
        let hash = hasher.finish();
        if self.hash == Some(hash) {
            return;
        }
        self.blocks = blacklist.iter().cloned().collect();
        self.hash = Some(hash);
        self.rebuilds += 1;
        debug!(blocks = self.blocks.len(), "Rebuilt accumulation blacklist");
    }

    pub fn contains(&self, block: &str) -> bool {
        self.blocks.contains(block)
    }

    /// How many times the set has been built.
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }
}

/// Run one accumulation pass over the ticking regions. Returns the number of cells filled.
///
/// Each region independently rolls the intensity gate, picks a random column, and needs a
/// rainy biome and a downfall roll before fluid is placed on its surface. A host refusal
/// ends the pass; regions already handled keep their changes.
pub fn accumulate<W, R>(
    world: &mut W,
    store: &mut HumidityStore,
    config: &AccumulationConfig,
    blacklist: &mut BlacklistCache,
    rng: &mut R,
) -> Result<u32, HostError>
where
    W: HostWorld + ?Sized,
    R: Rng + ?Sized,
{
    blacklist.refresh(&config.blacklist);
    let chance = scale_with_smoothness(config.intensity_percent, config.smoothness_percent);
    let mut placed = 0;

    for region in world.ticking_regions() {
        if !percent(rng, chance) {
            continue;
        }

        let column = random_cell_in_region(rng, region);
        let biome = world.biome_at(column);
        if biome.precipitation != Precipitation::Rain {
            continue;
        }
        if !decimal(rng, biome.downfall + statue_bonus(store, region)) {
            continue;
        }

        let target = world.surface_at(column.x, column.z);
        let below = target - IVec3::Y;
        let block = world.block_at(below);
        if blacklist.contains(&block) {
            debug!(cell = ?below, block = %block, "Block on blacklist");
            continue;
        }
        if let Some(natural) = world.natural_surface(target.x, target.z) {
            if target.y > natural.saturating_add(config.max_height) {
                debug!(cell = ?target, natural, "Accumulation above max height");
                continue;
            }
        }

        world.set_fluid_source(target)?;
        debug!(cell = ?target, "Accumulating at");
        store.change_humidity_at(target, -FLUID_VOLUME, &*world);
        placed += 1;
    }

    Ok(placed)
}
