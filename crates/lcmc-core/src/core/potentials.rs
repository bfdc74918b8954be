use nalgebra::DVector;
use thiserror::Error;

/// Separations below this are treated as coincident particles.
const MIN_SEPARATION: f64 = 1e-12;
/// Denominators whose magnitude falls below this are treated as singular.
const MIN_DENOMINATOR: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PotentialError {
    #[error("Particles coincide (separation {separation:e}); the pair direction is undefined")]
    CoincidentParticles { separation: f64 },

    #[error("Degenerate anisotropy in {term}: value {value} makes the expression singular")]
    DegenerateAnisotropy { term: &'static str, value: f64 },

    #[error("Pair energy evaluated to a non-finite value ({value})")]
    NonFinite { value: f64 },
}

/// Parameters of the Gay–Berne potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GayBerneParameters {
    /// Well depth, `ε0`.
    pub epsilon_0: f64,
    /// Side-by-side contact distance, `σs`.
    pub sigma_s: f64,
    /// Length-to-breadth ratio, `κ`.
    pub kappa: f64,
    /// Side-by-side to end-to-end well depth ratio, `κ'`.
    pub kappa_prime: f64,
    /// Exponent `μ` on the orientation-and-direction well-depth term.
    pub mu: f64,
    /// Exponent `ν` on the orientation-only well-depth term.
    pub nu: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GayBerne {
    epsilon_0: f64,
    sigma_s: f64,
    mu: f64,
    nu: f64,
    chi: f64,
    chi_prime: f64,
}

impl GayBerne {
    pub fn new(params: GayBerneParameters) -> Self {
        let kappa_sq = params.kappa * params.kappa;
        let kappa_prime_root = params.kappa_prime.powf(1.0 / params.mu);
        Self {
            epsilon_0: params.epsilon_0,
            sigma_s: params.sigma_s,
            mu: params.mu,
            nu: params.nu,
            chi: (kappa_sq - 1.0) / (kappa_sq + 1.0),
            chi_prime: (kappa_prime_root - 1.0) / (kappa_prime_root + 1.0),
        }
    }

    pub fn chi(&self) -> f64 {
        self.chi
    }

    pub fn chi_prime(&self) -> f64 {
        self.chi_prime
    }

    fn energy(&self, geometry: &PairGeometry) -> Result<f64, PotentialError> {
        let PairGeometry { a, b, c, distance } = *geometry;

        let shape = symmetric_anisotropy(self.chi, a, b, c, "contact distance")?;
        let sigma = self.sigma_s / checked_sqrt(1.0 - 0.5 * self.chi * shape, "contact distance")?;

        let shifted = distance - sigma + self.sigma_s;
        if shifted.abs() < MIN_DENOMINATOR {
            return Err(PotentialError::DegenerateAnisotropy {
                term: "reduced distance",
                value: shifted,
            });
        }
        let reduced = self.sigma_s / shifted;

        let epsilon_nu = orientation_well_depth(self.chi, c)?.powf(self.nu);
        let direction = symmetric_anisotropy(self.chi_prime, a, b, c, "well depth")?;
        let epsilon_mu = (1.0 - 0.5 * self.chi_prime * direction).powf(self.mu);
        let epsilon = self.epsilon_0 * epsilon_nu * epsilon_mu;

        let r6 = reduced.powi(6);
        finite(4.0 * epsilon * (r6 * r6 - r6))
    }
}

/// Parameters of the Gay–Berne potential with a point-dipole correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GayBerneDipoleParameters {
    pub epsilon_0: f64,
    /// Contact distance, `σ0`.
    pub sigma_0: f64,
    pub kappa: f64,
    pub kappa_prime: f64,
    /// Prefactor of the dipole–dipole term.
    pub dipole_strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GayBerneDipole {
    epsilon_0: f64,
    sigma_0: f64,
    chi: f64,
    chi_prime: f64,
    dipole_strength: f64,
}

impl GayBerneDipole {
    pub fn new(params: GayBerneDipoleParameters) -> Self {
        let kappa_sq = params.kappa * params.kappa;
        Self {
            epsilon_0: params.epsilon_0,
            sigma_0: params.sigma_0,
            chi: (kappa_sq - 1.0) / (kappa_sq + 1.0),
            chi_prime: (params.kappa_prime - 1.0) / (params.kappa_prime + 1.0),
            dipole_strength: params.dipole_strength,
        }
    }

    pub fn dipole_strength(&self) -> f64 {
        self.dipole_strength
    }

    fn energy(
        &self,
        spin1: &DVector<f64>,
        spin2: &DVector<f64>,
        separation: &DVector<f64>,
        geometry: &PairGeometry,
    ) -> Result<f64, PotentialError> {
        let PairGeometry { a, b, c, distance } = *geometry;

        let shape = mixed_anisotropy(self.chi, a, b, c, "contact distance")?;
        let sigma = self.sigma_0 / checked_sqrt(1.0 - self.chi * shape, "contact distance")?;
        let reduced = (distance - sigma + self.sigma_0) / self.sigma_0;
        if reduced.abs() < MIN_DENOMINATOR {
            return Err(PotentialError::DegenerateAnisotropy {
                term: "reduced distance",
                value: reduced,
            });
        }

        let direction = mixed_anisotropy(self.chi_prime, a, b, c, "well depth")?;
        let epsilon = self.epsilon_0
            * orientation_well_depth(self.chi, c)?
            * (1.0 - self.chi_prime * direction);

        let inv6 = reduced.powi(-6);
        let gay_berne = 4.0 * epsilon * (inv6 * inv6 - inv6);
        let dipole = dipole_dipole(
            self.dipole_strength,
            spin1.dot(separation),
            spin2.dot(separation),
            c,
            distance,
        );
        finite(gay_berne + dipole)
    }
}

/// A pairwise interaction between two directors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Potential {
    /// Orientation-only coupling, `ε0 · P2(s1·s2)`.
    Legendre { epsilon_0: f64 },
    GayBerne(GayBerne),
    GayBerneDipole(GayBerneDipole),
}

impl Potential {
    pub fn legendre(epsilon_0: f64) -> Self {
        Self::Legendre { epsilon_0 }
    }

    pub fn gay_berne(params: GayBerneParameters) -> Self {
        Self::GayBerne(GayBerne::new(params))
    }

    pub fn gay_berne_dipole(params: GayBerneDipoleParameters) -> Self {
        Self::GayBerneDipole(GayBerneDipole::new(params))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Legendre { .. } => "legendre",
            Self::GayBerne(_) => "gay-berne",
            Self::GayBerneDipole(_) => "gay-berne-dipole",
        }
    }

    /// Interaction energy of two particles. Symmetric under exchanging them.
    pub fn energy(
        &self,
        spin1: &DVector<f64>,
        location1: &DVector<f64>,
        spin2: &DVector<f64>,
        location2: &DVector<f64>,
    ) -> Result<f64, PotentialError> {
        match self {
            Self::Legendre { epsilon_0 } => Ok(epsilon_0 * legendre_p2(spin1.dot(spin2))),
            Self::GayBerne(gb) => {
                let separation = location1 - location2;
                let geometry = PairGeometry::new(spin1, spin2, &separation)?;
                gb.energy(&geometry)
            }
            Self::GayBerneDipole(gbd) => {
                let separation = location1 - location2;
                let geometry = PairGeometry::new(spin1, spin2, &separation)?;
                gbd.energy(spin1, spin2, &separation, &geometry)
            }
        }
    }
}

/// Projections shared by the Gay–Berne forms: `a = s1·r̂`, `b = s2·r̂`,
/// `c = s1·s2`.
#[derive(Debug, Clone, Copy)]
struct PairGeometry {
    a: f64,
    b: f64,
    c: f64,
    distance: f64,
}

impl PairGeometry {
    fn new(
        spin1: &DVector<f64>,
        spin2: &DVector<f64>,
        separation: &DVector<f64>,
    ) -> Result<Self, PotentialError> {
        let distance = separation.norm();
        if !(distance >= MIN_SEPARATION) {
            return Err(PotentialError::CoincidentParticles {
                separation: distance,
            });
        }
        let unit = separation / distance;
        Ok(Self {
            a: spin1.dot(&unit),
            b: spin2.dot(&unit),
            c: spin1.dot(spin2),
            distance,
        })
    }
}

#[inline]
pub fn legendre_p2(x: f64) -> f64 {
    0.5 * (3.0 * x * x - 1.0)
}

/// `U = D · (c·d² − 3(s1·r)(s2·r)) / d⁵`.
#[inline]
pub fn dipole_dipole(strength: f64, s1_dot_r: f64, s2_dot_r: f64, c: f64, distance: f64) -> f64 {
    strength * (c * distance * distance - 3.0 * s1_dot_r * s2_dot_r) / distance.powi(5)
}

/// `(a+b)²/(1+χc) + (a−b)²/(1−χc)`.
fn symmetric_anisotropy(
    chi: f64,
    a: f64,
    b: f64,
    c: f64,
    term: &'static str,
) -> Result<f64, PotentialError> {
    let plus = nonzero(1.0 + chi * c, term)?;
    let minus = nonzero(1.0 - chi * c, term)?;
    Ok((a + b).powi(2) / plus + (a - b).powi(2) / minus)
}

/// `(a² + b² − 2χabc) / (1 − χ²c²)`.
fn mixed_anisotropy(
    chi: f64,
    a: f64,
    b: f64,
    c: f64,
    term: &'static str,
) -> Result<f64, PotentialError> {
    let denominator = nonzero(1.0 - chi * chi * c * c, term)?;
    Ok((a * a + b * b - 2.0 * chi * a * b * c) / denominator)
}

/// `1 / sqrt(1 − χ²c²)`.
fn orientation_well_depth(chi: f64, c: f64) -> Result<f64, PotentialError> {
    Ok(1.0 / checked_sqrt(1.0 - chi * chi * c * c, "orientation well depth")?)
}

#[inline]
fn nonzero(value: f64, term: &'static str) -> Result<f64, PotentialError> {
    if value.abs() < MIN_DENOMINATOR || !value.is_finite() {
        Err(PotentialError::DegenerateAnisotropy { term, value })
    } else {
        Ok(value)
    }
}

#[inline]
fn checked_sqrt(value: f64, term: &'static str) -> Result<f64, PotentialError> {
    if !(value > MIN_DENOMINATOR) {
        Err(PotentialError::DegenerateAnisotropy { term, value })
    } else {
        Ok(value.sqrt())
    }
}

#[inline]
fn finite(value: f64) -> Result<f64, PotentialError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PotentialError::NonFinite { value })
    }
}
