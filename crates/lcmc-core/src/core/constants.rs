//! Natural constants in CGS units.

/// Boltzmann constant in erg/K.
pub const BOLTZMANN: f64 = 1.3806488e-16;
/// Bohr magneton in erg/G.
pub const BOHR_MAGNETON: f64 = 9.274009820e-21;
/// g factor used for the spin dipole moment.
pub const G_FACTOR: f64 = 1.0;
/// Reduced Planck constant in erg·s.
pub const REDUCED_PLANCK: f64 = 1.0545726663e-27;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalConstants {
    pub boltzmann: f64,
    pub bohr_magneton: f64,
    pub g_factor: f64,
    pub reduced_planck: f64,
}

impl Default for NaturalConstants {
    fn default() -> Self {
        Self {
            boltzmann: BOLTZMANN,
            bohr_magneton: BOHR_MAGNETON,
            g_factor: G_FACTOR,
            reduced_planck: REDUCED_PLANCK,
        }
    }
}

impl NaturalConstants {
    pub fn with_boltzmann(mut self, boltzmann: f64) -> Self {
        self.boltzmann = boltzmann;
        self
    }

    /// Prefactor of the dipole–dipole interaction, `(g·μB/ħ)²`.
    pub fn dipole_strength(&self) -> f64 {
        let moment = -self.g_factor * self.bohr_magneton / self.reduced_planck;
        moment * moment
    }
}
