use rand::Rng;

/// True `chance` percent of the time. Draws uniformly from `[0, 100)`, so anything at or
/// below 0 never passes and anything at or above 100 always does.
pub fn percent<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    rng.gen_range(0.0..100.0) < chance
}

/// True `chance` of the time, for `chance` in `[0, 1]`. Same boundary behavior as [`percent`].
pub fn decimal<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    rng.r#gen::<f64>() < chance
}

/// Scale a per-roll chance down by how often the roll happens.
///
/// Intensity is the chance of a single event; smoothness is how often the event is rolled.
/// Dividing one by the other keeps the long-run event rate a function of intensity alone.
pub fn scale_with_smoothness(intensity: f64, smoothness: f64) -> f64 {
    if smoothness < 1.0 {
        return intensity;
    }
    intensity / smoothness
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn percent_boundaries() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(!percent(&mut rng, 0.0));
            assert!(!percent(&mut rng, -5.0));
            assert!(percent(&mut rng, 100.0));
            assert!(percent(&mut rng, 250.0));
        }
    }

    #[test]
    fn decimal_boundaries() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..1000 {
            assert!(!decimal(&mut rng, 0.0));
            assert!(decimal(&mut rng, 1.0));
        }
    }

    #[test]
    fn percent_matches_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let hits = (0..20_000).filter(|_| percent(&mut rng, 25.0)).count();
        let rate = hits as f64 / 20_000.0;
        assert!((0.23..0.27).contains(&rate), "rate was {}", rate);
    }

    #[test]
    fn decimal_matches_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let hits = (0..20_000).filter(|_| decimal(&mut rng, 0.4)).count();
        let rate = hits as f64 / 20_000.0;
        assert!((0.38..0.42).contains(&rate), "rate was {}", rate);
    }

    #[test]
    fn low_smoothness_leaves_intensity_unchanged() {
        assert_eq!(scale_with_smoothness(10.0, 0.0), 10.0);
        assert_eq!(scale_with_smoothness(10.0, 0.99), 10.0);
    }

    #[test]
    fn scaling_divides_by_smoothness() {
        assert_eq!(scale_with_smoothness(10.0, 1.0), 10.0);
        assert_eq!(scale_with_smoothness(10.0, 20.0), 0.5);
        assert_eq!(scale_with_smoothness(50.0, 100.0), 0.5);
    }

    #[test]
    fn scaling_is_non_increasing_in_smoothness() {
        let intensity = 37.5;
        let mut previous = f64::INFINITY;
        for step in 0..=1000 {
            let smoothness = 1.0 + step as f64 * 0.099;
            let scaled = scale_with_smoothness(intensity, smoothness);
            assert!(scaled <= previous, "increase at smoothness {}", smoothness);
            previous = scaled;
        }
    }
}
