use crate::core::lattice::Lattice;
use crate::core::neighbours::NeighbourStrategy;
use crate::core::potentials::{Potential, PotentialError};
use tracing::instrument;

/// A pair potential together with the strategy that decides which pairs
/// interact.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyModel {
    pub potential: Potential,
    pub neighbours: NeighbourStrategy,
}

impl EnergyModel {
    pub fn new(potential: Potential, neighbours: NeighbourStrategy) -> Self {
        Self {
            potential,
            neighbours,
        }
    }

    #[inline]
    pub fn cell_energy(&self, lattice: &Lattice, indices: &[isize]) -> Result<f64, PotentialError> {
        self.neighbours.cell_energy(lattice, &self.potential, indices)
    }

    /// Sum of every cell's halved contribution, so each interacting pair is
    /// counted once.
    #[instrument(level = "trace", skip_all)]
    pub fn total_energy(&self, lattice: &Lattice) -> Result<f64, PotentialError> {
        let mut total = 0.0;
        for cell in lattice.cell_indices() {
            total += self.cell_energy(lattice, &cell)?;
        }
        Ok(total)
    }

    pub fn prepare_sweep(&mut self, lattice: &Lattice) -> bool {
        self.neighbours.prepare_sweep(lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::BoundaryCondition;
    use crate::core::neighbours::SphereNeighbours;
    use crate::core::potentials::GayBerneParameters;
    use nalgebra::DVector;

    const TOLERANCE: f64 = 1e-9;

    fn parallel_2x2(spacing: f64) -> Lattice {
        let locations = vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![0.0, spacing]),
            DVector::from_vec(vec![spacing, 0.0]),
            DVector::from_vec(vec![spacing, spacing]),
        ];
        Lattice::new(
            vec![2, 2],
            vec![BoundaryCondition::Fixed; 2],
            vec![spacing; 2],
            vec![DVector::from_vec(vec![0.0, 1.0]); 4],
            locations,
            1.0,
        )
        .unwrap()
    }

    fn unordered_pair_sum(lattice: &Lattice, potential: &Potential, pairs: &[(usize, usize)]) -> f64 {
        pairs
            .iter()
            .map(|&(i, j)| {
                potential
                    .energy(
                        lattice.spin(i),
                        lattice.location(i),
                        lattice.spin(j),
                        lattice.location(j),
                    )
                    .unwrap()
            })
            .sum()
    }

    #[test]
    fn nearest_total_counts_each_edge_once() {
        let lattice = parallel_2x2(1.0);
        let model = EnergyModel::new(Potential::legendre(1.0), NeighbourStrategy::Nearest);
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let expected = unordered_pair_sum(&lattice, &model.potential, &edges);
        assert!((model.total_energy(&lattice).unwrap() - expected).abs() < TOLERANCE);
        assert!((expected - 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn window_total_counts_each_unordered_pair_once() {
        let lattice = parallel_2x2(1.0);
        let potential = Potential::gay_berne(GayBerneParameters {
            epsilon_0: 1.0,
            sigma_s: 0.2,
            kappa: 3.0,
            kappa_prime: 5.0,
            mu: 1.0,
            nu: 3.0,
        });
        let model = EnergyModel::new(potential, NeighbourStrategy::FixedWindow { range: 1 });
        let all_pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let expected = unordered_pair_sum(&lattice, &model.potential, &all_pairs);
        let total = lattice.total_potential_energy(&model).unwrap();
        assert!((total - expected).abs() < TOLERANCE * expected.abs().max(1.0));
    }

    #[test]
    fn sphere_total_matches_window_total_when_radius_covers_window() {
        let lattice = parallel_2x2(1.0);
        let mut sphere = EnergyModel::new(
            Potential::legendre(0.5),
            NeighbourStrategy::Sphere(SphereNeighbours::new(2.0, 1, 1).unwrap()),
        );
        let window = EnergyModel::new(
            Potential::legendre(0.5),
            NeighbourStrategy::FixedWindow { range: 1 },
        );
        sphere.prepare_sweep(&lattice);
        assert!(
            (sphere.total_energy(&lattice).unwrap() - window.total_energy(&lattice).unwrap())
                .abs()
                < TOLERANCE
        );
    }
}
