use rand::Rng;
use tracing::debug;

use super::chance::decimal;
use super::{statue_bonus, FLUID_VOLUME};
use crate::persistence::humidity::HumidityStore;
use crate::world::{Hand, HostError, HostWorld, RegionPos};

/// Steps between container checks.
pub const BUCKET_CHECK_DELAY: u32 = 30 * 20;

/// Give every collector standing in the rain a chance to catch one container of fluid.
/// Returns the number of containers filled.
///
/// Only one hand is filled per check, the main hand first.
pub fn fill_containers<W, R>(world: &mut W, store: &mut HumidityStore, rng: &mut R) -> Result<u32, HostError>
where
    W: HostWorld + ?Sized,
    R: Rng + ?Sized,
{
    let mut filled = 0;
    for collector in world.collectors() {
        if !collector.in_rain {
            continue;
        }
        let hand = if collector.empty_containers.contains(&Hand::Main) {
            Hand::Main
        } else if collector.empty_containers.contains(&Hand::Off) {
            Hand::Off
        } else {
            continue;
        };

        let region = RegionPos::containing(collector.position);
        let chance = world.biome_at(collector.position).downfall + statue_bonus(store, region);
        if !decimal(rng, chance) {
            continue;
        }

        world.fill_container(collector.id, hand)?;
        debug!(collector = collector.id, hand = ?hand, "Filling container");
        store.change_humidity(region, -FLUID_VOLUME, &*world);
        filled += 1;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::humidity::HumidityDefaults;
    use crate::world::sandbox::SandboxWorld;
    use crate::world::{BiomeClimate, Collector, Precipitation};
    use glam::IVec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn store() -> HumidityStore {
        HumidityStore::new(HumidityDefaults {
            base_percent: 50.0,
            threshold: 5000,
            use_downfall: false,
        })
    }

    fn collector(id: u64, in_rain: bool, hands: Vec<Hand>) -> Collector {
        Collector {
            id,
            position: IVec3::new(4, 65, 4),
            in_rain,
            empty_containers: hands,
        }
    }

    fn soaked() -> SandboxWorld {
        SandboxWorld::flat(1, 1, 64, BiomeClimate::new("soaked", Precipitation::Rain, 1.0))
    }

    #[test]
    fn fills_main_hand_first() {
        let mut world = soaked();
        world.add_collector(collector(1, true, vec![Hand::Off, Hand::Main]));
        let mut store = store();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(fill_containers(&mut world, &mut store, &mut rng).unwrap(), 1);
        assert_eq!(world.collectors()[0].empty_containers, vec![Hand::Off]);
        assert_eq!(store.peek_humidity(RegionPos::new(0, 0)), Some(1500));

        assert_eq!(fill_containers(&mut world, &mut store, &mut rng).unwrap(), 1);
        assert!(world.collectors()[0].empty_containers.is_empty());
        assert_eq!(fill_containers(&mut world, &mut store, &mut rng).unwrap(), 0);
        assert_eq!(world.filled_containers(), 2);
    }

    #[test]
    fn sheltered_collectors_stay_empty() {
        let mut world = soaked();
        world.add_collector(collector(1, false, vec![Hand::Main]));
        let mut store = store();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        assert_eq!(fill_containers(&mut world, &mut store, &mut rng).unwrap(), 0);
        assert_eq!(store.humidity_entries().count(), 0);
    }

    #[test]
    fn dry_biome_needs_statue() {
        let mut world = SandboxWorld::flat(1, 1, 64, BiomeClimate::desert());
        world.add_collector(collector(1, true, vec![Hand::Main]));
        let mut store = store();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(fill_containers(&mut world, &mut store, &mut rng).unwrap(), 0);
        }

        store.change_statue_count(RegionPos::new(0, 0), 1);
        let mut filled = 0;
        for _ in 0..200 {
            filled += fill_containers(&mut world, &mut store, &mut rng).unwrap();
        }
        assert_eq!(filled, 1);
    }
}
