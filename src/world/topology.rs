use glam::IVec3;
use rand::Rng;

use crate::world::{Cell, REGION_SIZE, RegionPos};

/// A random column inside the region. `y` is left at 0 for the caller to resolve.
///
/// Regions on a biome border are re-sampled every call, so over many steps each biome
/// is hit in proportion to the area it covers.
pub fn random_cell_in_region<R: Rng + ?Sized>(rng: &mut R, region: RegionPos) -> Cell {
    IVec3::new(
        region.min_x() + rng.gen_range(0..REGION_SIZE),
        0,
        region.min_z() + rng.gen_range(0..REGION_SIZE),
    )
}

/// Every column of the region (256 cells at `y = 0`), x-major.
pub fn region_area_cells(region: RegionPos) -> impl Iterator<Item = Cell> + Clone {
    let min_x = region.min_x();
    let min_z = region.min_z();
    (0..REGION_SIZE).flat_map(move |dx| {
        (0..REGION_SIZE).map(move |dz| IVec3::new(min_x + dx, 0, min_z + dz))
    })
}

/// The `(2 * range + 1)^2` square of regions centered on `region`, itself included.
pub fn surrounding_regions(region: RegionPos, range: u32) -> Vec<RegionPos> {
    let range = range as i32;
    let side = (2 * range + 1) as usize;
    let mut regions = Vec::with_capacity(side * side);
    for x in (region.x - range)..=(region.x + range) {
        for z in (region.z - range)..=(region.z + range) {
            regions.push(RegionPos::new(x, z));
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn random_cell_stays_inside_region() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let region = RegionPos::new(-3, 5);
        for _ in 0..2000 {
            let cell = random_cell_in_region(&mut rng, region);
            assert_eq!(RegionPos::containing(cell), region);
            assert_eq!(cell.y, 0);
        }
    }

    #[test]
    fn random_cell_covers_whole_footprint() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let region = RegionPos::new(0, 0);
        let seen: HashSet<(i32, i32)> = (0..20_000)
            .map(|_| random_cell_in_region(&mut rng, region))
            .map(|c| (c.x, c.z))
            .collect();
        assert_eq!(seen.len(), 256);
    }

    #[test]
    fn area_cells_are_the_full_cartesian_product() {
        let region = RegionPos::new(2, -1);
        let cells: Vec<Cell> = region_area_cells(region).collect();
        assert_eq!(cells.len(), 256);
        let unique: HashSet<(i32, i32)> = cells.iter().map(|c| (c.x, c.z)).collect();
        assert_eq!(unique.len(), 256);
        assert!(cells.iter().all(|c| RegionPos::containing(*c) == region));
    }

    #[test]
    fn area_cells_are_restartable() {
        let cells = region_area_cells(RegionPos::new(0, 0));
        let first: Vec<Cell> = cells.clone().collect();
        let second: Vec<Cell> = cells.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn surrounding_regions_form_a_square() {
        let center = RegionPos::new(5, 5);
        assert_eq!(surrounding_regions(center, 0), vec![center]);

        let ring = surrounding_regions(center, 1);
        assert_eq!(ring.len(), 9);
        assert!(ring.contains(&RegionPos::new(4, 4)));
        assert!(ring.contains(&RegionPos::new(6, 6)));

        let wide = surrounding_regions(center, 2);
        assert_eq!(wide.len(), 25);
        assert!(wide.iter().all(|r| r.distance(center) <= 2));
    }
}
