use rand::Rng;
use tracing::debug;

use super::chance::decimal;
use super::statue_bonus;
use crate::persistence::humidity::HumidityStore;
use crate::world::{BiomeSource, HostError, HostWorld, RegionPos, WeatherUpdate};

/// Shortest wait between rain checks, in steps.
pub const RAIN_DELAY_MIN: u32 = 10 * 20;
/// Longest wait between rain checks, in steps.
pub const RAIN_DELAY_MAX: u32 = 30 * 20;

/// Best fit of `y = x ^ k` through (0, 0), (0.5, 0.1), (0.75, 0.275) and (1, 1).
pub const RAIN_CHANCE_EXPONENT: f64 = 4.23966;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherChange {
    Started,
    Stopped,
}

/// Chance of a weather change for a relative humidity. Humidity near 0.5 rarely flips the
/// weather; only clearly wet or dry worlds do.
pub fn rain_chance_from_humidity(humidity: f64) -> f64 {
    humidity.max(0.0).powf(RAIN_CHANCE_EXPONENT)
}

/// A region's humidity as a fraction of `threshold`. Can exceed 1.
pub fn relative_humidity<B: BiomeSource + ?Sized>(
    store: &mut HumidityStore,
    region: RegionPos,
    threshold: i32,
    biomes: &B,
) -> f64 {
    let stored = store.get_humidity(region, biomes) as f64;
    (stored + statue_bonus(store, region)) / threshold as f64
}

/// Mean relative humidity over the loaded regions; 0 when none are loaded.
pub fn average_relative_humidity<W: HostWorld + ?Sized>(
    world: &W,
    store: &mut HumidityStore,
    threshold: i32,
) -> f64 {
    let regions = world.loaded_regions();
    if regions.is_empty() {
        return 0.0;
    }
    let total: f64 = regions
        .iter()
        .map(|region| relative_humidity(store, *region, threshold, world))
        .sum();
    total / regions.len() as f64
}

/// Roll for a weather change. A raining world clears more readily the drier it is; a clear
/// world starts raining more readily the wetter it is.
pub fn control_rain<W, R>(
    world: &mut W,
    store: &mut HumidityStore,
    threshold: i32,
    rng: &mut R,
) -> Result<Option<WeatherChange>, HostError>
where
    W: HostWorld + ?Sized,
    R: Rng + ?Sized,
{
    let humidity = average_relative_humidity(&*world, store, threshold);
    debug!(world = %world.name(), humidity, "Rain check");

    if world.is_raining() {
        if decimal(rng, rain_chance_from_humidity(1.0 - humidity)) {
            world.set_weather(WeatherUpdate::clear())?;
            debug!(world = %world.name(), "Rain stop");
            return Ok(Some(WeatherChange::Stopped));
        }
    } else if decimal(rng, rain_chance_from_humidity(humidity)) {
        world.set_weather(WeatherUpdate::endless_rain())?;
        debug!(world = %world.name(), "Rain start");
        return Ok(Some(WeatherChange::Started));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::humidity::HumidityDefaults;
    use crate::world::sandbox::SandboxWorld;
    use crate::world::BiomeClimate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn store() -> HumidityStore {
        HumidityStore::new(HumidityDefaults {
            base_percent: 50.0,
            threshold: 5000,
            use_downfall: false,
        })
    }

    fn fill(world: &SandboxWorld, store: &mut HumidityStore, amount: i32) {
        for region in world.loaded_regions() {
            store.set_humidity(region, amount);
        }
    }

    #[test]
    fn rain_chance_curve() {
        assert_eq!(rain_chance_from_humidity(0.0), 0.0);
        assert_eq!(rain_chance_from_humidity(1.0), 1.0);
        let mid = rain_chance_from_humidity(0.5);
        assert!(mid < 0.1, "chance at 0.5 was {}", mid);
        assert!((rain_chance_from_humidity(0.75) - 0.275).abs() < 0.03);
        assert_eq!(rain_chance_from_humidity(-0.5), 0.0);
        assert!(rain_chance_from_humidity(1.5) > 1.0);
    }

    #[test]
    fn curve_is_monotonic() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let chance = rain_chance_from_humidity(i as f64 / 100.0);
            assert!(chance >= prev);
            prev = chance;
        }
    }

    #[test]
    fn relative_humidity_includes_statue_bonus() {
        let mut store = store();
        let world = SandboxWorld::flat(1, 1, 64, BiomeClimate::plains());
        let region = RegionPos::new(0, 0);
        store.set_humidity(region, 2500);
        assert_eq!(relative_humidity(&mut store, region, 5000, &world), 0.5);
        store.change_statue_count(region, 1);
        assert_eq!(relative_humidity(&mut store, region, 5000, &world), 2500.1 / 5000.0);
    }

    #[test]
    fn average_materializes_defaults() {
        let mut store = store();
        let world = SandboxWorld::flat(2, 2, 64, BiomeClimate::plains());
        store.set_humidity(RegionPos::new(0, 0), 5000);
        let avg = average_relative_humidity(&world, &mut store, 5000);
        assert_eq!(avg, (1.0 + 0.5 * 3.0) / 4.0);
        assert_eq!(store.humidity_entries().count(), 4);
    }

    #[test]
    fn saturated_world_starts_raining() {
        let mut world = SandboxWorld::flat(2, 2, 64, BiomeClimate::plains());
        let mut store = store();
        fill(&world, &mut store, 5000);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let change = control_rain(&mut world, &mut store, 5000, &mut rng).unwrap();
        assert_eq!(change, Some(WeatherChange::Started));
        assert!(world.is_raining());
        assert_eq!(world.weather(), WeatherUpdate::endless_rain());
    }

    #[test]
    fn dry_world_stops_raining() {
        let mut world = SandboxWorld::flat(2, 2, 64, BiomeClimate::plains());
        world.set_raining(true);
        let mut store = store();
        fill(&world, &mut store, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let change = control_rain(&mut world, &mut store, 5000, &mut rng).unwrap();
        assert_eq!(change, Some(WeatherChange::Stopped));
        assert!(!world.is_raining());
        assert_eq!(world.weather(), WeatherUpdate::clear());
    }

    #[test]
    fn dry_world_stays_clear_and_wet_world_stays_rainy() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut world = SandboxWorld::flat(2, 2, 64, BiomeClimate::plains());
        let mut store = store();
        fill(&world, &mut store, 0);
        for _ in 0..100 {
            assert_eq!(control_rain(&mut world, &mut store, 5000, &mut rng).unwrap(), None);
        }

        world.set_raining(true);
        fill(&world, &mut store, 5000);
        for _ in 0..100 {
            assert_eq!(control_rain(&mut world, &mut store, 5000, &mut rng).unwrap(), None);
        }
        assert!(world.is_raining());
    }

    #[test]
    fn half_humid_world_rarely_flips() {
        let mut world = SandboxWorld::flat(2, 2, 64, BiomeClimate::plains());
        let mut store = store();
        fill(&world, &mut store, 2500);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let mut starts = 0;
        for _ in 0..2000 {
            if control_rain(&mut world, &mut store, 5000, &mut rng).unwrap().is_some() {
                starts += 1;
                world.set_raining(false);
            }
        }
        // Expected rate is about 5%.
        assert!(starts > 40 && starts < 200, "starts: {}", starts);
    }
}
