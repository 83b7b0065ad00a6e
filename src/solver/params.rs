use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Seed used when none is configured, and when an unrecognized seeding option
/// is encountered.
pub const DEFAULT_SEED: i64 = 985_456_376;

/// Seeding option for the per-walker generators: either a fixed integer seed
/// or the string `"random"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSeed", into = "RawSeed")]
pub enum SeedOption {
    /// Use the given seed verbatim.
    Fixed(i64),
    /// Draw a fresh seed on every resolution.
    Random,
}

impl SeedOption {
    /// Resolve to a concrete seed. `Fixed` returns its value; `Random` draws
    /// uniformly from `[0, i32::MAX]`, distinct with high probability across
    /// successive calls.
    pub fn resolve(self) -> i64 {
        match self {
            SeedOption::Fixed(seed) => seed,
            SeedOption::Random => rand::thread_rng().gen_range(0, i64::from(i32::MAX) + 1),
        }
    }
}

impl Default for SeedOption {
    fn default() -> Self {
        SeedOption::Fixed(DEFAULT_SEED)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSeed {
    Number(i64),
    Name(String),
}

impl From<RawSeed> for SeedOption {
    fn from(raw: RawSeed) -> Self {
        match raw {
            RawSeed::Number(seed) => SeedOption::Fixed(seed),
            RawSeed::Name(name) if name == "random" => SeedOption::Random,
            RawSeed::Name(name) => {
                log::warn!(
                    "unrecognized seeding option {:?}, falling back to the default seed",
                    name
                );
                SeedOption::Fixed(DEFAULT_SEED)
            }
        }
    }
}

impl From<SeedOption> for RawSeed {
    fn from(seed: SeedOption) -> Self {
        match seed {
            SeedOption::Fixed(seed) => RawSeed::Number(seed),
            SeedOption::Random => RawSeed::Name("random".to_string()),
        }
    }
}

/// Configuration of a threaded Monte Carlo integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MciParameters {
    /// Seeding option for the per-walker generators.
    pub seed: SeedOption,
    /// Sweeps discarded before measurement begins.
    pub warm_up_sweeps: usize,
    /// Total number of measurements, distributed across processes.
    pub measurements: usize,
    /// Number of walker threads.
    pub walkers: usize,
    /// Number of accumulator threads.
    pub accumulators: usize,
    /// Let the first `min(walkers, accumulators)` threads do both roles.
    pub shared_walk_and_accumulation_thread: bool,
    /// Give each walker a fixed private share of the measurements instead of
    /// a shared counter.
    pub fix_meas_per_walker: bool,
    /// Directory to load walker configurations from, if any.
    pub config_read_dir: Option<PathBuf>,
    /// Directory to store walker configurations in, if any.
    pub config_write_dir: Option<PathBuf>,
    /// Number of outer self-consistency iterations.
    pub dca_iterations: usize,
}

impl Default for MciParameters {
    fn default() -> Self {
        Self {
            seed: SeedOption::default(),
            warm_up_sweeps: 20,
            measurements: 100,
            walkers: 1,
            accumulators: 1,
            shared_walk_and_accumulation_thread: false,
            fix_meas_per_walker: false,
            config_read_dir: None,
            config_write_dir: None,
            dca_iterations: 1,
        }
    }
}

#[cfg(test)]
mod params_tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn default_values() {
        let pars = MciParameters::default();
        assert_eq!(pars.seed, SeedOption::Fixed(985_456_376));
        assert_eq!(pars.warm_up_sweeps, 20);
        assert_eq!(pars.measurements, 100);
        assert_eq!(pars.walkers, 1);
        assert_eq!(pars.accumulators, 1);
        assert!(!pars.shared_walk_and_accumulation_thread);
        assert!(!pars.fix_meas_per_walker);
        assert_eq!(pars.dca_iterations, 1);
    }

    #[test]
    fn integer_seeds_pass_through() {
        let encoded = serde_cbor::to_vec(&42i64).unwrap();
        let seed: SeedOption = serde_cbor::from_slice(&encoded).unwrap();
        assert_eq!(seed, SeedOption::Fixed(42));

        let encoded = serde_cbor::to_vec(&-1i64).unwrap();
        let seed: SeedOption = serde_cbor::from_slice(&encoded).unwrap();
        assert_eq!(seed, SeedOption::Fixed(-1));
    }

    #[test]
    fn random_seeding_option() {
        let encoded = serde_cbor::to_vec(&"random").unwrap();
        let seed: SeedOption = serde_cbor::from_slice(&encoded).unwrap();
        assert_eq!(seed, SeedOption::Random);

        let seeds: Vec<i64> = (0..5).map(|_| seed.resolve()).collect();
        for &s in &seeds {
            assert!(s >= 0);
            assert!(s <= i64::from(i32::MAX));
        }
        // Successive draws produce varying seeds.
        assert!(seeds.iter().unique().count() > 1);
    }

    #[test]
    fn invalid_seeding_option_falls_back() {
        let encoded = serde_cbor::to_vec(&"whatever").unwrap();
        let seed: SeedOption = serde_cbor::from_slice(&encoded).unwrap();
        assert_eq!(seed, SeedOption::Fixed(DEFAULT_SEED));
    }

    #[test]
    fn parameters_round_trip() {
        let mut pars = MciParameters::default();
        pars.walkers = 3;
        pars.accumulators = 5;
        pars.shared_walk_and_accumulation_thread = true;
        pars.config_write_dir = Some(PathBuf::from("/tmp/configs"));

        let encoded = serde_cbor::to_vec(&pars).unwrap();
        let decoded: MciParameters = serde_cbor::from_slice(&encoded).unwrap();
        assert_eq!(decoded.walkers, 3);
        assert_eq!(decoded.accumulators, 5);
        assert!(decoded.shared_walk_and_accumulation_thread);
        assert_eq!(decoded.config_write_dir, pars.config_write_dir);
    }
}
