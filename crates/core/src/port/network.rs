// Network Conditions Port (simulated unreliable remote calls)

use crate::error::{Result, TaskError};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Lower bound of the simulated creation latency (500ms)
pub const DEFAULT_MIN_LATENCY: Duration = Duration::from_millis(500);

/// Upper bound of the simulated creation latency (2.5s)
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_millis(2500);

/// Probability that a simulated remote call succeeds
pub const DEFAULT_SUCCESS_RATE: f64 = 0.75;

/// Source of latency and failure for simulated remote calls
///
/// Injected into `TaskService` so tests can force both outcomes
/// deterministically.
pub trait NetworkConditions: Send + Sync {
    /// How long the next call should take
    fn latency(&self) -> Duration;

    /// Whether the next call succeeds
    fn should_succeed(&self) -> bool;
}

/// Latency range and success probability of the simulated network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkProfile {
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub success_rate: f64,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            min_latency: DEFAULT_MIN_LATENCY,
            max_latency: DEFAULT_MAX_LATENCY,
            success_rate: DEFAULT_SUCCESS_RATE,
        }
    }
}

impl NetworkProfile {
    /// Reject ranges that cannot be sampled
    pub fn validate(&self) -> Result<()> {
        if self.min_latency > self.max_latency {
            return Err(TaskError::Config(format!(
                "min latency {}ms exceeds max latency {}ms",
                self.min_latency.as_millis(),
                self.max_latency.as_millis()
            )));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(TaskError::Config(format!(
                "success rate {} is outside [0, 1]",
                self.success_rate
            )));
        }
        Ok(())
    }
}

/// Random network (production)
///
/// Latency is uniform over `[min_latency, max_latency]` at millisecond
/// granularity; each call succeeds with probability `success_rate`.
pub struct RandomNetwork {
    profile: NetworkProfile,
    seeded: Option<Mutex<StdRng>>,
}

impl RandomNetwork {
    /// Draw from the thread-local RNG
    pub fn new(profile: NetworkProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            seeded: None,
        })
    }

    /// Draw from a seeded RNG, for reproducible runs
    pub fn seeded(profile: NetworkProfile, seed: u64) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        })
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        match &self.seeded {
            Some(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut *rng)
            }
            None => f(&mut rand::thread_rng()),
        }
    }
}

impl NetworkConditions for RandomNetwork {
    fn latency(&self) -> Duration {
        let min = self.profile.min_latency.as_millis() as u64;
        let max = self.profile.max_latency.as_millis() as u64;
        let millis = self.with_rng(|rng| rng.gen_range(min..=max));
        Duration::from_millis(millis)
    }

    fn should_succeed(&self) -> bool {
        let rate = self.profile.success_rate;
        self.with_rng(|rng| rng.gen_bool(rate))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Network that replays scripted outcomes, then falls back to a default
    pub struct ScriptedNetwork {
        outcomes: Mutex<VecDeque<bool>>,
        fallback: bool,
        latency: Duration,
        attempts: AtomicUsize,
    }

    impl ScriptedNetwork {
        pub fn new(outcomes: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                fallback,
                latency: Duration::ZERO,
                attempts: AtomicUsize::new(0),
            }
        }

        /// Every call succeeds
        pub fn succeed() -> Self {
            Self::new([], true)
        }

        /// Every call fails
        pub fn fail() -> Self {
            Self::new([], false)
        }

        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        /// Number of success/failure decisions taken so far
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl NetworkConditions for ScriptedNetwork {
        fn latency(&self) -> Duration {
            self.latency
        }

        fn should_succeed(&self) -> bool {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or(self.fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::ScriptedNetwork;
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = NetworkProfile::default();
        assert_eq!(profile.min_latency, Duration::from_millis(500));
        assert_eq!(profile.max_latency, Duration::from_millis(2500));
        assert_eq!(profile.success_rate, 0.75);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_invalid_profiles_are_rejected() {
        let inverted = NetworkProfile {
            min_latency: Duration::from_secs(3),
            ..NetworkProfile::default()
        };
        assert!(matches!(inverted.validate(), Err(TaskError::Config(_))));

        let impossible = NetworkProfile {
            success_rate: 1.5,
            ..NetworkProfile::default()
        };
        assert!(RandomNetwork::new(impossible).is_err());
    }

    #[test]
    fn test_latency_stays_in_range() {
        let network = RandomNetwork::new(NetworkProfile::default()).unwrap();
        for _ in 0..500 {
            let latency = network.latency();
            assert!(latency >= DEFAULT_MIN_LATENCY);
            assert!(latency <= DEFAULT_MAX_LATENCY);
        }
    }

    #[test]
    fn test_fixed_latency_when_range_is_empty() {
        let profile = NetworkProfile {
            min_latency: Duration::from_millis(10),
            max_latency: Duration::from_millis(10),
            success_rate: 1.0,
        };
        let network = RandomNetwork::new(profile).unwrap();
        assert_eq!(network.latency(), Duration::from_millis(10));
        assert!(network.should_succeed());
    }

    #[test]
    fn test_seeded_network_is_reproducible() {
        let a = RandomNetwork::seeded(NetworkProfile::default(), 7).unwrap();
        let b = RandomNetwork::seeded(NetworkProfile::default(), 7).unwrap();

        let draws_a: Vec<_> = (0..20).map(|_| (a.latency(), a.should_succeed())).collect();
        let draws_b: Vec<_> = (0..20).map(|_| (b.latency(), b.should_succeed())).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_success_rate_is_roughly_respected() {
        let network = RandomNetwork::seeded(NetworkProfile::default(), 2024).unwrap();
        let successes = (0..4000).filter(|_| network.should_succeed()).count();
        // 0.75 * 4000 = 3000; allow a wide band for the seeded sample
        assert!((2800..=3200).contains(&successes), "got {}", successes);
    }

    #[test]
    fn test_scripted_network() {
        let network = ScriptedNetwork::new([false, true], false);
        assert!(!network.should_succeed());
        assert!(network.should_succeed());
        assert!(!network.should_succeed());
        assert_eq!(network.attempts(), 3);
        assert_eq!(network.latency(), Duration::ZERO);
    }
}
