use super::{BoundaryCondition, Lattice, LatticeError};
use nalgebra::DVector;
use rand::Rng;
use rand_distr::StandardNormal;

/// Shape of a lattice: everything needed besides per-cell state.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeGeometry {
    pub dimensions: Vec<usize>,
    pub boundary_conditions: Vec<BoundaryCondition>,
    pub spacing: Vec<f64>,
}

impl LatticeGeometry {
    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    pub fn cell_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Restores a lattice from stored per-cell state.
    pub fn restore(
        &self,
        temperature: f64,
        spins: Vec<DVector<f64>>,
        locations: Vec<DVector<f64>>,
    ) -> Result<Lattice, LatticeError> {
        Lattice::new(
            self.dimensions.clone(),
            self.boundary_conditions.clone(),
            self.spacing.clone(),
            spins,
            locations,
            temperature,
        )
    }
}

/// Generates a fresh lattice with every particle at its grid point and every
/// spin along a common orientation, each jittered by a Gaussian.
#[derive(Default)]
pub struct LatticeBuilder {
    dimensions: Option<Vec<usize>>,
    boundary_conditions: Option<Vec<BoundaryCondition>>,
    spacing: Option<Vec<f64>>,
    spacing_stdev: Option<Vec<f64>>,
    spin_orientation: Option<Vec<f64>>,
    spin_orientation_stdev: Option<Vec<f64>>,
    temperature: Option<f64>,
}

impl LatticeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(mut self, geometry: LatticeGeometry) -> Self {
        self.dimensions = Some(geometry.dimensions);
        self.boundary_conditions = Some(geometry.boundary_conditions);
        self.spacing = Some(geometry.spacing);
        self
    }
    pub fn dimensions(mut self, dimensions: Vec<usize>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
    pub fn boundary_conditions(mut self, boundary_conditions: Vec<BoundaryCondition>) -> Self {
        self.boundary_conditions = Some(boundary_conditions);
        self
    }
    pub fn spacing(mut self, spacing: Vec<f64>) -> Self {
        self.spacing = Some(spacing);
        self
    }
    pub fn spacing_stdev(mut self, stdev: Vec<f64>) -> Self {
        self.spacing_stdev = Some(stdev);
        self
    }
    pub fn spin_orientation(mut self, orientation: Vec<f64>) -> Self {
        self.spin_orientation = Some(orientation);
        self
    }
    pub fn spin_orientation_stdev(mut self, stdev: Vec<f64>) -> Self {
        self.spin_orientation_stdev = Some(stdev);
        self
    }
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self, rng: &mut impl Rng) -> Result<Lattice, LatticeError> {
        let dimensions = self
            .dimensions
            .ok_or(LatticeError::MissingParameter("dimensions"))?;
        let boundary_conditions = self
            .boundary_conditions
            .ok_or(LatticeError::MissingParameter("boundary_conditions"))?;
        let spacing = self
            .spacing
            .ok_or(LatticeError::MissingParameter("spacing"))?;
        let spacing_stdev = self
            .spacing_stdev
            .ok_or(LatticeError::MissingParameter("spacing_stdev"))?;
        let orientation = self
            .spin_orientation
            .ok_or(LatticeError::MissingParameter("spin_orientation"))?;
        let orientation_stdev = self
            .spin_orientation_stdev
            .ok_or(LatticeError::MissingParameter("spin_orientation_stdev"))?;
        let temperature = self
            .temperature
            .ok_or(LatticeError::MissingParameter("temperature"))?;

        let ndim = dimensions.len();
        for (what, values) in [
            ("spacing values", &spacing),
            ("spacing stdev values", &spacing_stdev),
            ("spin orientation components", &orientation),
            ("spin orientation stdev values", &orientation_stdev),
        ] {
            if values.len() != ndim {
                return Err(LatticeError::LengthMismatch {
                    what,
                    expected: ndim,
                    found: values.len(),
                });
            }
        }
        for &value in spacing_stdev.iter().chain(&orientation_stdev) {
            if !value.is_finite() || value < 0.0 {
                return Err(LatticeError::InvalidValue {
                    what: "standard deviation",
                    value,
                    requirement: "non-negative",
                });
            }
        }

        let cells: usize = dimensions.iter().product();
        let mut spins = Vec::with_capacity(cells);
        let mut locations = Vec::with_capacity(cells);
        for offset in 0..cells {
            let indices = super::indexing::unravel_offset(offset, &dimensions);
            let location = DVector::from_fn(ndim, |axis, _| {
                indices[axis] as f64 * spacing[axis] + gaussian(rng, spacing_stdev[axis])
            });
            let spin = DVector::from_fn(ndim, |axis, _| {
                orientation[axis] + gaussian(rng, orientation_stdev[axis])
            });
            spins.push(spin);
            locations.push(location);
        }

        Lattice::new(
            dimensions,
            boundary_conditions,
            spacing,
            spins,
            locations,
            temperature,
        )
    }
}

#[inline]
pub(crate) fn gaussian(rng: &mut impl Rng, stdev: f64) -> f64 {
    if stdev == 0.0 {
        return 0.0;
    }
    let z: f64 = rng.sample(StandardNormal);
    z * stdev
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn builder() -> LatticeBuilder {
        LatticeBuilder::new()
            .dimensions(vec![3, 2])
            .boundary_conditions(vec![BoundaryCondition::Periodic, BoundaryCondition::Fixed])
            .spacing(vec![0.5, 2.0])
            .spacing_stdev(vec![0.0, 0.0])
            .spin_orientation(vec![0.0, 2.0])
            .spin_orientation_stdev(vec![0.0, 0.0])
            .temperature(3.0)
    }

    #[test]
    fn build_without_noise_places_particles_on_grid() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let lattice = builder().build(&mut rng).unwrap();
        assert_eq!(lattice.len(), 6);
        assert_eq!(lattice.temperature(), 3.0);
        assert_eq!(lattice.get(&[2, 1]).1, &DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(lattice.get(&[1, 0]).0, &DVector::from_vec(vec![0.0, 1.0]));
    }

    #[test]
    fn build_with_noise_keeps_spins_normalized() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        let lattice = builder()
            .spin_orientation_stdev(vec![0.7, 0.7])
            .spacing_stdev(vec![0.1, 0.1])
            .build(&mut rng)
            .unwrap();
        for spin in lattice.spins() {
            assert!((spin.norm() - 1.0).abs() < 1e-9);
        }
        assert!(lattice.orientation_variance() > 0.0);
    }

    #[test]
    fn build_is_deterministic_for_a_seed() {
        let noisy = || {
            builder()
                .spin_orientation_stdev(vec![0.5, 0.5])
                .spacing_stdev(vec![0.2, 0.2])
        };
        let a = noisy()
            .build(&mut Xoshiro256StarStar::seed_from_u64(99))
            .unwrap();
        let b = noisy()
            .build(&mut Xoshiro256StarStar::seed_from_u64(99))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn build_reports_missing_parameter() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let result = LatticeBuilder::new().dimensions(vec![2, 2]).build(&mut rng);
        assert_eq!(
            result.unwrap_err(),
            LatticeError::MissingParameter("boundary_conditions")
        );
    }

    #[test]
    fn build_rejects_mismatched_orientation_length() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let result = builder().spin_orientation(vec![1.0]).build(&mut rng);
        assert!(matches!(
            result,
            Err(LatticeError::LengthMismatch {
                what: "spin orientation components",
                ..
            })
        ));
    }

    #[test]
    fn build_rejects_negative_stdev() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let result = builder().spacing_stdev(vec![-0.1, 0.0]).build(&mut rng);
        assert!(matches!(result, Err(LatticeError::InvalidValue { .. })));
    }

    #[test]
    fn build_rejects_zero_or_negative_spacing() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for spacing in [vec![0.0, 1.0], vec![1.0, -1.0]] {
            let result = builder().spacing(spacing).build(&mut rng);
            assert!(matches!(
                result,
                Err(LatticeError::InvalidValue {
                    what: "spacing",
                    requirement: "positive",
                    ..
                })
            ));
        }
    }

    #[test]
    fn geometry_restores_stored_state() {
        let geometry = LatticeGeometry {
            dimensions: vec![1, 2],
            boundary_conditions: vec![BoundaryCondition::Fixed; 2],
            spacing: vec![1.0, 1.0],
        };
        let lattice = geometry
            .restore(
                2.5,
                vec![DVector::from_vec(vec![1.0, 0.0]); 2],
                vec![DVector::zeros(2), DVector::from_vec(vec![0.0, 1.0])],
            )
            .unwrap();
        assert_eq!(lattice.temperature(), 2.5);
        assert_eq!(geometry.cell_count(), 2);
    }
}
