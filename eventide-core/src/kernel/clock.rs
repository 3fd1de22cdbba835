//! Simulation time, clock control and random number generation.

use std::cmp::Ordering;
use std::fmt;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::SimulationError;

/// Point in simulated time.
///
/// Always finite and non-negative, which makes the total order over
/// `f64` agree with `PartialEq`. Deserialization goes through [`SimTime::new`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// Simulation start.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Creates a time value.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - Value is negative, NaN or infinite
    pub fn new(value: f64) -> Result<Self, SimulationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::InvalidTime {
                reason: format!("{value} is not a finite non-negative time"),
            });
        }
        // Normalizes -0.0 so ordering and equality agree.
        Ok(Self(value + 0.0))
    }

    /// Returns the raw time value.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns the instant `delay` after this one.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - The sum overflows to infinity
    pub fn after(self, delay: Delay) -> Result<SimTime, SimulationError> {
        SimTime::new(self.0 + delay.as_f64())
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimulationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SimTime::new(value)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> f64 {
        time.0
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Non-negative, finite span of simulated time.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Delay(f64);

impl Delay {
    /// Zero-length delay; resumes at the current instant.
    pub const ZERO: Delay = Delay(0.0);

    /// Creates a delay.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidDuration` - Value is negative, NaN or infinite
    pub fn new(value: f64) -> Result<Self, SimulationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::InvalidDuration { duration: value });
        }
        Ok(Self(value + 0.0))
    }

    /// Returns the raw delay value.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Delay {
    type Error = SimulationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Delay::new(value)
    }
}

impl From<Delay> for f64 {
    fn from(delay: Delay) -> f64 {
        delay.0
    }
}

/// Simulation clock.
///
/// Time can only move forward and is independent of wall-clock time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    current_time: SimTime,
}

impl SimClock {
    /// Creates a clock starting at simulation time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.current_time
    }

    /// Advances simulation time to a specific instant.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - If target time is in the past
    pub fn advance_to(&mut self, target: SimTime) -> Result<(), SimulationError> {
        if target < self.current_time {
            return Err(SimulationError::InvalidTime {
                reason: format!(
                    "cannot move clock backwards from {} to {}",
                    self.current_time, target
                ),
            });
        }
        self.current_time = target;
        Ok(())
    }
}

/// Deterministic random number generator for reproducible simulations.
///
/// Uses ChaCha8 algorithm for fast, high-quality pseudorandom numbers
/// with deterministic seed-based generation.
#[derive(Debug)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeterministicRng {
    /// Creates deterministic RNG from seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed used for this RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates random number in range [0, 1).
    pub fn random_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Generates a uniformly distributed value in [min, max).
    ///
    /// Returns `min` when the range is empty.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        min + (max - min) * self.random_f64()
    }

    /// Generates random number in range [min, max).
    pub fn random_range(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        min + (self.rng.next_u64() % (max - min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advancement() {
        let mut clock = SimClock::new();
        assert_eq!(clock.now(), SimTime::ZERO);

        clock.advance_to(SimTime::new(10.0).unwrap()).unwrap();
        assert_eq!(clock.now().as_f64(), 10.0);

        // Same instant is allowed
        clock.advance_to(SimTime::new(10.0).unwrap()).unwrap();
        assert_eq!(clock.now().as_f64(), 10.0);
    }

    #[test]
    fn test_clock_cannot_go_backwards() {
        let mut clock = SimClock::new();
        clock.advance_to(SimTime::new(10.0).unwrap()).unwrap();

        let result = clock.advance_to(SimTime::new(5.0).unwrap());
        assert!(matches!(result, Err(SimulationError::InvalidTime { .. })));
        assert_eq!(clock.now().as_f64(), 10.0);
    }

    #[test]
    fn test_time_rejects_invalid_values() {
        assert!(SimTime::new(-1.0).is_err());
        assert!(SimTime::new(f64::NAN).is_err());
        assert!(SimTime::new(f64::INFINITY).is_err());
        assert_eq!(SimTime::new(-0.0).unwrap(), SimTime::ZERO);
    }

    #[test]
    fn test_delay_rejects_negative_values() {
        let result = Delay::new(-0.5);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidDuration { duration }) if duration == -0.5
        ));
        assert!(Delay::new(f64::NAN).is_err());
        assert_eq!(Delay::new(0.0).unwrap(), Delay::ZERO);
    }

    #[test]
    fn test_time_after_delay() {
        let start = SimTime::new(2.5).unwrap();
        let later = start.after(Delay::new(1.5).unwrap()).unwrap();
        assert_eq!(later.as_f64(), 4.0);
        assert!(later > start);
    }

    #[test]
    fn test_deterministic_rng_reproducibility() {
        let seed = 12345;
        let mut rng1 = DeterministicRng::from_seed(seed);
        let mut rng2 = DeterministicRng::from_seed(seed);

        let values1: Vec<u64> = (0..10).map(|_| rng1.random_range(0, 100)).collect();
        let values2: Vec<u64> = (0..10).map(|_| rng2.random_range(0, 100)).collect();

        // Same seed should produce same sequence
        assert_eq!(values1, values2);
        assert_eq!(rng1.seed(), seed);
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = DeterministicRng::from_seed(42);
        for _ in 0..1000 {
            let value = rng.uniform(1.0, 5.0);
            assert!((1.0..5.0).contains(&value));
        }
        assert_eq!(rng.uniform(3.0, 3.0), 3.0);
    }

    #[test]
    fn test_time_after_rejects_overflow() {
        let last = SimTime::new(f64::MAX).unwrap();
        let result = last.after(Delay::new(f64::MAX).unwrap());
        assert!(matches!(result, Err(SimulationError::InvalidTime { .. })));

        assert_eq!(last.after(Delay::ZERO).unwrap(), last);
    }

    #[test]
    fn test_deserialization_validates_values() {
        let time: SimTime = serde_json::from_str("2.5").unwrap();
        assert_eq!(time.as_f64(), 2.5);
        assert_eq!(serde_json::to_string(&time).unwrap(), "2.5");

        assert!(serde_json::from_str::<SimTime>("-1.0").is_err());
        assert!(serde_json::from_str::<SimTime>("null").is_err());
        assert!(serde_json::from_str::<Delay>("-0.5").is_err());
        assert_eq!(serde_json::from_str::<Delay>("3.0").unwrap().as_f64(), 3.0);
    }
}
