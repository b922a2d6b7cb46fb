use std::time::Duration;

// defaults match the classic pthread carpark demo: two cars in, two cars out,
// arrivals up to one second apart, occupancy printed every two seconds.
pub const DEFAULT_PRODUCERS: usize = 2;
pub const DEFAULT_CONSUMERS: usize = 2;
pub const DEFAULT_PERIOD_SECS: u64 = 2;
pub const DEFAULT_MAX_DELAY_MS: u64 = 1000;
pub const DEFAULT_VALUE_RANGE: i32 = 10;

// upper bounds accepted on the command line
pub const MAX_RUN_SECONDS: u64 = 86_400;
pub const MAX_PERIOD_SECS: u64 = 3_600;
pub const MAX_DELAY_MS: u64 = 60_000;

/// How long `main` waits for actors to notice a stop request.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to build a running carpark graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CarparkConfig {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub period: Duration,
    /// Upper bound (exclusive) of the random pause before each arrival or departure.
    pub max_delay: Duration,
    /// Plates are drawn from `0..value_range`.
    pub value_range: i32,
}

impl CarparkConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        CarparkConfig { capacity, ..Default::default() }
    }

    /// Number of threads that meet at the startup barrier, the monitor is not one of them.
    pub fn barrier_participants(&self) -> usize {
        self.producers + self.consumers
    }
}

impl Default for CarparkConfig {
    fn default() -> Self {
        CarparkConfig {
            capacity: 1,
            producers: DEFAULT_PRODUCERS,
            consumers: DEFAULT_CONSUMERS,
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            value_range: DEFAULT_VALUE_RANGE,
        }
    }
}

/// Random pacing shared by arrival and departure actors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorPace {
    pub max_delay: Duration,
    pub value_range: i32,
}

impl CarparkConfig {
    pub fn pace(&self) -> ActorPace {
        ActorPace {
            max_delay: self.max_delay,
            value_range: self.value_range,
        }
    }
}

impl ActorPace {
    /// Draws the pause taken before the next car moves, in `[0, max_delay)`.
    pub fn next_delay<R: rand::Rng>(&self, rng: &mut R) -> Duration {
        let max_micros = u64::try_from(self.max_delay.as_micros()).unwrap_or(u64::MAX);
        if max_micros == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(rng.gen_range(0..max_micros))
        }
    }

    /// Draws a plate number in `[0, value_range)`.
    pub fn next_plate<R: rand::Rng>(&self, rng: &mut R) -> i32 {
        rng.gen_range(0..self.value_range.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn pace_stays_in_range() {
        let pace = CarparkConfig::with_capacity(3).pace();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1_000 {
            assert!(pace.next_delay(&mut rng) < Duration::from_millis(DEFAULT_MAX_DELAY_MS));
            let plate = pace.next_plate(&mut rng);
            assert!((0..DEFAULT_VALUE_RANGE).contains(&plate));
        }
    }

    #[test]
    fn huge_delay_is_clamped() {
        let pace = ActorPace { max_delay: Duration::MAX, value_range: 10 };
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..100 {
            assert!(pace.next_delay(&mut rng) <= Duration::from_micros(u64::MAX));
        }
        // a range that fits in u64 is used as is
        let pace = ActorPace { max_delay: Duration::from_micros(3), value_range: 10 };
        for _ in 0..100 {
            assert!(pace.next_delay(&mut rng) < Duration::from_micros(3));
        }
    }

    #[test]
    fn zero_delay_never_sleeps() {
        let pace = ActorPace { max_delay: Duration::ZERO, value_range: 1 };
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(pace.next_delay(&mut rng), Duration::ZERO);
        assert_eq!(pace.next_plate(&mut rng), 0);
    }
}
