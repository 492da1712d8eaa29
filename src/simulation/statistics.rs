use crate::persistence::humidity::HumidityStore;
use crate::simulation::rain::WeatherChange;

/// Per-step event counts.
#[derive(Debug, Clone, Default)]
pub struct TickStatistics {
    pub tick: u64,
    pub accumulated: u32,
    pub evaporated: u32,
    pub filled: u32,
    pub weather_change: Option<WeatherChange>,
    pub engine_errors: u32,
    pub tick_duration_ms: f32,
}

/// Aggregate view of a humidity store, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatistics {
    pub regions: usize,
    pub total_humidity: i64,
    pub mean_humidity: f64,
    pub min_humidity: Option<i32>,
    pub max_humidity: Option<i32>,
    pub statue_regions: usize,
    pub statues: i64,
}

/// Compute statistics over the materialized regions of a store.
pub fn compute_statistics(store: &HumidityStore) -> StoreStatistics {
    let mut regions = 0usize;
    let mut total = 0i64;
    let mut min: Option<i32> = None;
    let mut max: Option<i32> = None;

    for (_, humidity) in store.humidity_entries() {
        regions += 1;
        total += humidity as i64;
        min = Some(min.map_or(humidity, |m| m.min(humidity)));
        max = Some(max.map_or(humidity, |m| m.max(humidity)));
    }

    let mut statue_regions = 0usize;
    let mut statues = 0i64;
    for (_, count) in store.statue_entries() {
        statue_regions += 1;
        statues += count as i64;
    }

    StoreStatistics {
        regions,
        total_humidity: total,
        mean_humidity: if regions == 0 {
            0.0
        } else {
            total as f64 / regions as f64
        },
        min_humidity: min,
        max_humidity: max,
        statue_regions,
        statues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::humidity::HumidityDefaults;
    use crate::world::RegionPos;

    fn store() -> HumidityStore {
        HumidityStore::new(HumidityDefaults {
            base_percent: 50.0,
            threshold: 5000,
            use_downfall: false,
        })
    }

    #[test]
    fn empty_store_statistics() {
        let stats = compute_statistics(&store());
        assert_eq!(stats.regions, 0);
        assert_eq!(stats.total_humidity, 0);
        assert_eq!(stats.mean_humidity, 0.0);
        assert_eq!(stats.min_humidity, None);
        assert_eq!(stats.max_humidity, None);
        assert_eq!(stats.statue_regions, 0);
    }

    #[test]
    fn aggregates_humidity_and_statues() {
        let mut store = store();
        store.set_humidity(RegionPos::new(0, 0), -1000);
        store.set_humidity(RegionPos::new(1, 0), 3000);
        store.set_humidity(RegionPos::new(2, 0), 4000);
        store.change_statue_count(RegionPos::new(1, 0), 2);
        store.change_statue_count(RegionPos::new(5, 5), 1);

        let stats = compute_statistics(&store);
        assert_eq!(stats.regions, 3);
        assert_eq!(stats.total_humidity, 6000);
        assert_eq!(stats.mean_humidity, 2000.0);
        assert_eq!(stats.min_humidity, Some(-1000));
        assert_eq!(stats.max_humidity, Some(4000));
        assert_eq!(stats.statue_regions, 2);
        assert_eq!(stats.statues, 3);
    }

    #[test]
    fn totals_do_not_overflow() {
        let mut store = store();
        store.set_humidity(RegionPos::new(0, 0), i32::MAX);
        store.set_humidity(RegionPos::new(1, 0), i32::MAX);
        assert_eq!(compute_statistics(&store).total_humidity, 2 * i32::MAX as i64);
    }
}
