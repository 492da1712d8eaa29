use rand::Rng;

/// Slowest cadence of a smoothness-driven guard, in steps (about 5 seconds at 20 steps/s).
pub const MAX_TICK_DELAY: u32 = 5 * 20;

/// How a guard picks its next threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayRule {
    /// `(100 - smoothness)% of MAX_TICK_DELAY`. Higher smoothness fires more often.
    Smoothness(f64),
    Constant(u32),
    /// Uniform over `[lower, upper]`, inclusive.
    Random { lower: u32, upper: u32 },
}

/// Lets its owner act at most once every `threshold` steps. The threshold is recomputed only
/// when the guard fires.
#[derive(Debug, Clone)]
pub struct TickGuard {
    elapsed: u32,
    threshold: u32,
    rule: DelayRule,
}

impl TickGuard {
    pub fn from_smoothness(smoothness: f64) -> Self {
        Self {
            elapsed: 0,
            threshold: smoothness_delay(smoothness),
            rule: DelayRule::Smoothness(smoothness),
        }
    }

    pub fn constant(delay: u32) -> Self {
        Self {
            elapsed: 0,
            threshold: delay,
            rule: DelayRule::Constant(delay),
        }
    }

    pub fn random<R: Rng + ?Sized>(lower: u32, upper: u32, rng: &mut R) -> Self {
        let (lower, upper) = (lower.min(upper), lower.max(upper));
        let rule = DelayRule::Random { lower, upper };
        Self {
            elapsed: 0,
            threshold: rule.next_threshold(rng),
            rule,
        }
    }

    /// Count one step. Returns true (and starts a new cycle) once `threshold` steps have
    /// been skipped since the last firing.
    pub fn ready<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.elapsed < self.threshold {
            self.elapsed += 1;
            return false;
        }
        self.threshold = self.rule.next_threshold(rng);
        self.elapsed = 0;
        true
    }

    /// Point a smoothness guard at a new smoothness. Takes effect the next time it fires.
    pub fn retune(&mut self, smoothness: f64) {
        if let DelayRule::Smoothness(current) = &mut self.rule {
            *current = smoothness;
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn rule(&self) -> DelayRule {
        self.rule
    }
}

impl DelayRule {
    fn next_threshold<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match *self {
            DelayRule::Smoothness(smoothness) => smoothness_delay(smoothness),
            DelayRule::Constant(delay) => delay,
            DelayRule::Random { lower, upper } => rng.gen_range(lower..=upper),
        }
    }
}

fn smoothness_delay(smoothness: f64) -> u32 {
    let smoothness = smoothness.clamp(0.0, 100.0);
    ((100.0 - smoothness) * MAX_TICK_DELAY as f64 / 100.0).floor() as u32
}
