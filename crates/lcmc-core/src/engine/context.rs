use crate::core::constants::NaturalConstants;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

/// Everything a run shares across phases: the physical constants and the
/// single random generator every proposal and acceptance draw comes from.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub constants: NaturalConstants,
    pub rng: Xoshiro256StarStar,
}

impl SimulationContext {
    /// Seeds the generator from `seed`, or from OS entropy when absent.
    pub fn new(constants: NaturalConstants, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Xoshiro256StarStar::seed_from_u64(seed),
            None => Xoshiro256StarStar::from_entropy(),
        };
        Self { constants, rng }
    }

    /// `k_B · T` for the given temperature.
    pub fn thermal_energy(&self, temperature: f64) -> f64 {
        self.constants.boltzmann * temperature
    }
}
