use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::simulation::CycleConfig;
use crate::world::topology::surrounding_regions;
use crate::world::{BiomeSource, Cell, RegionPos};

/// Parameters of the default humidity given to a region on first access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityDefaults {
    pub base_percent: f64,
    pub threshold: i32,
    /// Scale by the biome's downfall coefficient instead of 1.
    pub use_downfall: bool,
}

impl HumidityDefaults {
    pub fn from_config(config: &CycleConfig) -> Self {
        Self {
            base_percent: config.chunk.initial_humidity_percent,
            threshold: config.rain.humidity_threshold,
            use_downfall: config.chunk.initial_humidity_vanilla,
        }
    }

    pub fn initial_humidity(&self, downfall: f64) -> i32 {
        let scale = if self.use_downfall { downfall } else { 1.0 };
        (self.base_percent / 100.0 * self.threshold as f64 * scale).floor() as i32
    }
}

/// Result of reading a region's humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumidityReading {
    pub value: i32,
    /// The region had no entry and was given its default by this read.
    pub initialized: bool,
}

/// One persisted entry: a region and its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionAmount {
    pub x: i32,
    pub z: i32,
    pub amount: i32,
}

/// The on-disk form of a [`HumidityStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub humidity: Vec<RegionAmount>,
    pub statue: Vec<RegionAmount>,
}

/// Per-region humidity and statue counters.
///
/// Humidity is the fluid volume, in milli-units, held as vapor over a region. A region with
/// no entry has never been read or written; its first read derives a default.
#[derive(Debug, Clone, PartialEq)]
pub struct HumidityStore {
    humidity: HashMap<RegionPos, i32>,
    statues: HashMap<RegionPos, i32>,
    defaults: HumidityDefaults,
    dirty: bool,
}

impl HumidityStore {
    pub fn new(defaults: HumidityDefaults) -> Self {
        Self {
            humidity: HashMap::new(),
            statues: HashMap::new(),
            defaults,
            dirty: false,
        }
    }

    /// Rebuild a store from its persisted form. Rejects duplicate regions and zero statue
    /// counts, neither of which a saved store can contain.
    pub fn from_record(record: &StoreRecord, defaults: HumidityDefaults) -> Result<Self, String> {
        let humidity = entries_to_map("humidity", &record.humidity)?;
        let statues = entries_to_map("statue", &record.statue)?;
        if let Some((region, _)) = statues.iter().find(|(_, count)| **count == 0) {
            return Err(format!("statue entry for {} has a zero count", region));
        }

        debug!(regions = humidity.len(), "Loaded humidity data");
        debug!(regions = statues.len(), "Loaded statue data");
        Ok(Self {
            humidity,
            statues,
            defaults,
            dirty: false,
        })
    }

    /// Persisted form, sorted by region so identical stores serialize identically.
    pub fn to_record(&self) -> StoreRecord {
        let record = StoreRecord {
            humidity: map_to_entries(&self.humidity),
            statue: map_to_entries(&self.statues),
        };
        debug!(regions = record.humidity.len(), "Saving humidity data");
        debug!(regions = record.statue.len(), "Saving statue data");
        record
    }

    pub fn defaults(&self) -> HumidityDefaults {
        self.defaults
    }

    /// Applies only to regions materialized from now on.
    pub fn set_defaults(&mut self, defaults: HumidityDefaults) {
        self.defaults = defaults;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Materialized humidity entries.
    pub fn humidity_entries(&self) -> impl Iterator<Item = (RegionPos, i32)> + '_ {
        self.humidity.iter().map(|(r, v)| (*r, *v))
    }

    pub fn statue_entries(&self) -> impl Iterator<Item = (RegionPos, i32)> + '_ {
        self.statues.iter().map(|(r, v)| (*r, *v))
    }

    // === Humidity ===

    /// Humidity of a region, without materializing it.
    pub fn peek_humidity(&self, region: RegionPos) -> Option<i32> {
        self.humidity.get(&region).copied()
    }

    /// The value an unset region would be given, derived from the biome at its middle.
    pub fn default_humidity<B: BiomeSource + ?Sized>(&self, region: RegionPos, biomes: &B) -> i32 {
        let downfall = if self.defaults.use_downfall {
            biomes.biome_at(region.center()).downfall
        } else {
            1.0
        };
        self.defaults.initial_humidity(downfall)
    }

    /// Like [`lookup_humidity`](Self::lookup_humidity) but leaves the store untouched.
    /// `initialized` reports that the value is the region's default.
    pub fn read_humidity<B: BiomeSource + ?Sized>(&self, region: RegionPos, biomes: &B) -> HumidityReading {
        match self.peek_humidity(region) {
            Some(value) => HumidityReading {
                value,
                initialized: false,
            },
            None => HumidityReading {
                value: self.default_humidity(region, biomes),
                initialized: true,
            },
        }
    }

    /// Humidity of a region, giving it its default first if it has none. The default is
    /// derived from the biome at the middle of the region.
    pub fn lookup_humidity<B: BiomeSource + ?Sized>(
        &mut self,
        region: RegionPos,
        biomes: &B,
    ) -> HumidityReading {
        if let Some(value) = self.humidity.get(&region) {
            return HumidityReading {
                value: *value,
                initialized: false,
            };
        }

        let value = self.default_humidity(region, biomes);
        debug!(region = %region, value, "Initializing humidity");
        self.humidity.insert(region, value);
        self.dirty = true;
        HumidityReading {
            value,
            initialized: true,
        }
    }

    pub fn get_humidity<B: BiomeSource + ?Sized>(&mut self, region: RegionPos, biomes: &B) -> i32 {
        self.lookup_humidity(region, biomes).value
    }

    pub fn get_humidity_at<B: BiomeSource + ?Sized>(&mut self, cell: Cell, biomes: &B) -> i32 {
        self.get_humidity(RegionPos::containing(cell), biomes)
    }

    /// Add `delta` milli-units to a region's humidity.
    pub fn change_humidity<B: BiomeSource + ?Sized>(
        &mut self,
        region: RegionPos,
        delta: i32,
        biomes: &B,
    ) {
        debug!(region = %region, delta, "Humidity change");
        let current = self.get_humidity(region, biomes);
        self.humidity.insert(region, current.saturating_add(delta));
        self.dirty = true;
    }

    pub fn change_humidity_at<B: BiomeSource + ?Sized>(&mut self, cell: Cell, delta: i32, biomes: &B) {
        self.change_humidity(RegionPos::containing(cell), delta, biomes);
    }

    pub fn set_humidity(&mut self, region: RegionPos, value: i32) {
        debug!(region = %region, value, "Humidity set");
        self.humidity.insert(region, value);
        self.dirty = true;
    }

    pub fn set_humidity_at(&mut self, cell: Cell, value: i32) {
        self.set_humidity(RegionPos::containing(cell), value);
    }

    /// Forget a region's humidity; its next read derives the default again.
    pub fn reset_humidity(&mut self, region: RegionPos) {
        debug!(region = %region, "Humidity unset");
        self.humidity.remove(&region);
        self.dirty = true;
    }

    pub fn reset_humidity_at(&mut self, cell: Cell) {
        self.reset_humidity(RegionPos::containing(cell));
    }

    /// Forget every region's humidity. Does nothing unless `confirm` is set.
    /// Returns whether the store was cleared.
    pub fn reset_all_humidity(&mut self, confirm: bool) -> bool {
        if !confirm {
            return false;
        }
        debug!(regions = self.humidity.len(), "Clearing humidity map");
        self.humidity.clear();
        self.dirty = true;
        true
    }

    /// Weighted mean humidity of the square of regions around `region`. Each region counts
    /// `1 / (distance + 1)` times, so far regions contribute less.
    pub fn average_humidity<B: BiomeSource + ?Sized>(
        &mut self,
        region: RegionPos,
        range: u32,
        biomes: &B,
    ) -> i32 {
        let mut weighted = 0.0_f64;
        let mut total_weight = 0.0_f64;
        for neighbor in surrounding_regions(region, range) {
            let weight = 1.0 / (region.distance(neighbor) + 1) as f64;
            weighted += self.get_humidity(neighbor, biomes) as f64 * weight;
            total_weight += weight;
        }
        if total_weight == 0.0 {
            return 0;
        }
        (weighted / total_weight).round() as i32
    }

    // === Statues ===

    pub fn get_statue_count(&self, region: RegionPos) -> i32 {
        self.statues.get(&region).copied().unwrap_or(0)
    }

    pub fn get_statue_count_at(&self, cell: Cell) -> i32 {
        self.get_statue_count(RegionPos::containing(cell))
    }

    /// Add `delta` to a region's statue count. A count that lands on zero is removed.
    pub fn change_statue_count(&mut self, region: RegionPos, delta: i32) {
        debug!(region = %region, delta, "Statue count change");
        let count = self.get_statue_count(region).saturating_add(delta);
        if count == 0 {
            self.statues.remove(&region);
        } else {
            self.statues.insert(region, count);
        }
        self.dirty = true;
    }

    pub fn change_statue_count_at(&mut self, cell: Cell, delta: i32) {
        self.change_statue_count(RegionPos::containing(cell), delta);
    }
}

fn entries_to_map(kind: &str, entries: &[RegionAmount]) -> Result<HashMap<RegionPos, i32>, String> {
    let mut map = HashMap::with_capacity(entries.len());
    for entry in entries {
        let region = RegionPos::new(entry.x, entry.z);
        if map.insert(region, entry.amount).is_some() {
            return Err(format!("duplicate {} entry for {}", kind, region));
        }
    }
    Ok(map)
}

fn map_to_entries(map: &HashMap<RegionPos, i32>) -> Vec<RegionAmount> {
    let mut entries: Vec<RegionAmount> = map
        .iter()
        .map(|(region, amount)| RegionAmount {
            x: region.x,
            z: region.z,
            amount: *amount,
        })
        .collect();
    entries.sort_by_key(|e| (e.x, e.z));
    entries
}
