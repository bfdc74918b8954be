use crate::core::lattice::Lattice;
use crate::core::potentials::{Potential, PotentialError};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NeighbourError {
    #[error("Neighbour radius must be finite and positive, got {0}")]
    InvalidRadius(f64),

    #[error("Neighbour list update cycles must be at least 1")]
    ZeroUpdateCycles,

    #[error(
        "Index window on axis {axis} reaches {reach} but the neighbour radius is {radius}; \
         neighbours inside the sphere would be missed"
    )]
    InsufficientWindow { axis: usize, reach: f64, radius: f64 },
}

/// Neighbour lists of every cell within a sphere, refreshed every
/// `update_cycles` sweeps. Between refreshes queries use the lists from the
/// last rebuild even when particles have since moved.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereNeighbours {
    radius: f64,
    index_range: usize,
    update_cycles: usize,
    cache: Vec<Vec<Vec<isize>>>,
    sweeps_since_rebuild: usize,
    rebuilds: usize,
}

impl SphereNeighbours {
    pub fn new(radius: f64, index_range: usize, update_cycles: usize) -> Result<Self, NeighbourError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(NeighbourError::InvalidRadius(radius));
        }
        if update_cycles == 0 {
            return Err(NeighbourError::ZeroUpdateCycles);
        }
        Ok(Self {
            radius,
            index_range,
            update_cycles,
            cache: Vec::new(),
            sweeps_since_rebuild: 0,
            rebuilds: 0,
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn index_range(&self) -> usize {
        self.index_range
    }

    pub fn sweeps_since_rebuild(&self) -> usize {
        self.sweeps_since_rebuild
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn is_built(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Rejects windows too narrow to contain the whole sphere on some axis.
    pub fn validate_window(&self, spacing: &[f64]) -> Result<(), NeighbourError> {
        for (axis, &step) in spacing.iter().enumerate() {
            let reach = self.index_range as f64 * step;
            if reach < self.radius {
                return Err(NeighbourError::InsufficientWindow {
                    axis,
                    reach,
                    radius: self.radius,
                });
            }
        }
        Ok(())
    }

    fn within_sphere(&self, lattice: &Lattice, indices: &[isize]) -> Vec<Vec<isize>> {
        let center = lattice.location(lattice.offset(indices));
        let radius_sq = self.radius * self.radius;
        let window = vec![self.index_range; lattice.ndim()];
        without_self_images(lattice, indices, lattice.neighbour_indices(indices, &window))
            .into_iter()
            .filter(|n| (lattice.location_at(n) - center).norm_squared() <= radius_sq)
            .collect()
    }

    fn rebuild(&mut self, lattice: &Lattice) {
        self.cache = lattice
            .cell_indices()
            .map(|cell| self.within_sphere(lattice, &cell))
            .collect();
        self.rebuilds += 1;
        trace!(
            rebuilds = self.rebuilds,
            cells = self.cache.len(),
            "Rebuilt sphere neighbour lists."
        );
    }

    fn cached(&self, lattice: &Lattice, offset: usize) -> Option<&[Vec<isize>]> {
        if self.cache.len() == lattice.len() {
            self.cache.get(offset).map(Vec::as_slice)
        } else {
            None
        }
    }
}

/// Drops periodic images of the centre cell itself. They appear on periodic
/// axes no longer than the window, and a cell never interacts with itself.
fn without_self_images(
    lattice: &Lattice,
    indices: &[isize],
    candidates: Vec<Vec<isize>>,
) -> Vec<Vec<isize>> {
    let center = lattice.offset(indices);
    candidates
        .into_iter()
        .filter(|n| lattice.offset(n) != center)
        .collect()
}

/// Which cells contribute to a cell's local energy.
#[derive(Debug, Clone, PartialEq)]
pub enum NeighbourStrategy {
    /// The immediate ±1 neighbour along each axis.
    Nearest,
    /// Every cell within `range` indices on every axis.
    FixedWindow { range: usize },
    /// Cells within a Euclidean radius, from periodically rebuilt lists.
    Sphere(SphereNeighbours),
}

impl NeighbourStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::FixedWindow { .. } => "fixed-window",
            Self::Sphere(_) => "sphere",
        }
    }

    /// Sweep-start transition. Rebuilds the sphere lists when they are empty
    /// or `update_cycles` sweeps have passed since the last rebuild, then
    /// counts the sweep. Returns whether a rebuild happened.
    pub fn prepare_sweep(&mut self, lattice: &Lattice) -> bool {
        let Self::Sphere(sphere) = self else {
            return false;
        };
        let rebuild = !sphere.is_built()
            || sphere.cache.len() != lattice.len()
            || sphere.sweeps_since_rebuild >= sphere.update_cycles;
        if rebuild {
            sphere.rebuild(lattice);
            sphere.sweeps_since_rebuild = 0;
        }
        sphere.sweeps_since_rebuild += 1;
        rebuild
    }

    pub fn validate(&self, spacing: &[f64]) -> Result<(), NeighbourError> {
        match self {
            Self::Sphere(sphere) => sphere.validate_window(spacing),
            _ => Ok(()),
        }
    }

    /// Raw index tuples of the cells interacting with `indices`.
    pub fn neighbours(&self, lattice: &Lattice, indices: &[isize]) -> Vec<Vec<isize>> {
        self.with_neighbours(lattice, indices, <[Vec<isize>]>::to_vec)
    }

    fn with_neighbours<R>(
        &self,
        lattice: &Lattice,
        indices: &[isize],
        f: impl FnOnce(&[Vec<isize>]) -> R,
    ) -> R {
        match self {
            Self::Nearest => f(&without_self_images(
                lattice,
                indices,
                lattice.axis_neighbour_indices(indices),
            )),
            Self::FixedWindow { range } => f(&without_self_images(
                lattice,
                indices,
                lattice.neighbour_indices(indices, &vec![*range; lattice.ndim()]),
            )),
            Self::Sphere(sphere) => match sphere.cached(lattice, lattice.offset(indices)) {
                Some(list) => f(list),
                None => f(&sphere.within_sphere(lattice, indices)),
            },
        }
    }

    /// The cell's share of the lattice energy: the pair energy against every
    /// resolved neighbour, halved because each pair is seen from both ends.
    pub fn cell_energy(
        &self,
        lattice: &Lattice,
        potential: &Potential,
        indices: &[isize],
    ) -> Result<f64, PotentialError> {
        let offset = lattice.offset(indices);
        let spin = lattice.spin(offset);
        let location = lattice.location(offset);
        self.with_neighbours(lattice, indices, |neighbours| -> Result<f64, PotentialError> {
            let mut total = 0.0;
            for n in neighbours {
                let (n_spin, _) = lattice.get(n);
                total += potential.energy(spin, location, n_spin, &lattice.location_at(n))?;
            }
            Ok(total / 2.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::BoundaryCondition::{self, Fixed, Periodic};
    use nalgebra::DVector;

    fn grid(dims: [usize; 2], boundaries: [BoundaryCondition; 2], spacing: f64) -> Lattice {
        let cells = dims[0] * dims[1];
        let locations = (0..cells)
            .map(|o| {
                DVector::from_vec(vec![
                    (o / dims[1]) as f64 * spacing,
                    (o % dims[1]) as f64 * spacing,
                ])
            })
            .collect();
        Lattice::new(
            dims.to_vec(),
            boundaries.to_vec(),
            vec![spacing; 2],
            vec![DVector::from_vec(vec![0.0, 1.0]); cells],
            locations,
            1.0,
        )
        .unwrap()
    }

    fn sorted(mut v: Vec<Vec<isize>>) -> Vec<Vec<isize>> {
        v.sort();
        v
    }

    #[test]
    fn nearest_strategy_uses_axis_neighbours() {
        let lattice = grid([3, 3], [Fixed, Fixed], 1.0);
        let result = NeighbourStrategy::Nearest.neighbours(&lattice, &[1, 1]);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn fixed_window_strategy_includes_diagonals() {
        let lattice = grid([4, 4], [Periodic, Periodic], 1.0);
        let result = NeighbourStrategy::FixedWindow { range: 1 }.neighbours(&lattice, &[0, 0]);
        assert_eq!(result.len(), 8);
        assert!(result.contains(&vec![-1, -1]));
    }

    #[test]
    fn sphere_strategy_filters_window_by_distance() {
        let lattice = grid([5, 5], [Periodic, Periodic], 1.0);
        let strategy = NeighbourStrategy::Sphere(SphereNeighbours::new(1.0, 2, 10).unwrap());
        let result = sorted(strategy.neighbours(&lattice, &[0, 0]));
        assert_eq!(result, vec![vec![-1, 0], vec![0, -1], vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn sphere_distances_use_periodic_images() {
        let lattice = grid([5, 5], [Periodic, Periodic], 1.0);
        let strategy = NeighbourStrategy::Sphere(SphereNeighbours::new(1.5, 2, 10).unwrap());
        let result = strategy.neighbours(&lattice, &[0, 0]);
        assert_eq!(result.len(), 8);
        assert!(result.contains(&vec![-1, -1]));
    }

    #[test]
    fn sphere_lists_rebuild_every_update_cycles_sweeps() {
        let lattice = grid([3, 3], [Periodic, Periodic], 1.0);
        let mut strategy = NeighbourStrategy::Sphere(SphereNeighbours::new(1.0, 1, 3).unwrap());

        let rebuilt: Vec<bool> = (0..7).map(|_| strategy.prepare_sweep(&lattice)).collect();
        assert_eq!(rebuilt, vec![true, false, false, true, false, false, true]);

        let NeighbourStrategy::Sphere(sphere) = &strategy else {
            unreachable!()
        };
        assert_eq!(sphere.rebuilds(), 3);
        assert_eq!(sphere.sweeps_since_rebuild(), 1);
    }

    #[test]
    fn sphere_lists_are_stale_between_rebuilds() {
        let mut lattice = grid([3, 3], [Fixed, Fixed], 1.0);
        let mut strategy = NeighbourStrategy::Sphere(SphereNeighbours::new(1.0, 2, 5).unwrap());
        strategy.prepare_sweep(&lattice);
        let before = strategy.neighbours(&lattice, &[0, 0]);

        // Move the particle at [2, 2] right next to [0, 0].
        lattice
            .set(
                &[2, 2],
                DVector::from_vec(vec![0.0, 1.0]),
                DVector::from_vec(vec![0.5, 0.5]),
            )
            .unwrap();
        assert_eq!(strategy.neighbours(&lattice, &[0, 0]), before);

        strategy.prepare_sweep(&lattice);
        for _ in 0..3 {
            strategy.prepare_sweep(&lattice);
        }
        assert!(strategy.prepare_sweep(&lattice));
        assert!(strategy.neighbours(&lattice, &[0, 0]).contains(&vec![2, 2]));
    }

    #[test]
    fn other_strategies_never_rebuild() {
        let lattice = grid([2, 2], [Fixed, Fixed], 1.0);
        assert!(!NeighbourStrategy::Nearest.prepare_sweep(&lattice));
        assert!(!NeighbourStrategy::FixedWindow { range: 1 }.prepare_sweep(&lattice));
    }

    #[test]
    fn sphere_rejects_invalid_parameters() {
        assert_eq!(
            SphereNeighbours::new(0.0, 1, 1),
            Err(NeighbourError::InvalidRadius(0.0))
        );
        assert_eq!(
            SphereNeighbours::new(1.0, 1, 0),
            Err(NeighbourError::ZeroUpdateCycles)
        );
    }

    #[test]
    fn window_too_small_for_radius_is_rejected() {
        let strategy = NeighbourStrategy::Sphere(SphereNeighbours::new(2.0, 2, 1).unwrap());
        assert!(strategy.validate(&[1.0, 1.0]).is_ok());
        assert!(matches!(
            strategy.validate(&[1.0, 0.8]),
            Err(NeighbourError::InsufficientWindow { axis: 1, .. })
        ));
        assert!(NeighbourStrategy::Nearest.validate(&[0.1, 0.1]).is_ok());
    }

    #[test]
    fn periodic_images_of_the_cell_itself_are_not_neighbours() {
        let lattice = grid([3, 1], [Periodic, Periodic], 1.0);
        let nearest = sorted(NeighbourStrategy::Nearest.neighbours(&lattice, &[1, 0]));
        assert_eq!(nearest, vec![vec![0, 0], vec![2, 0]]);

        let window = NeighbourStrategy::FixedWindow { range: 3 }.neighbours(&lattice, &[0, 0]);
        assert!(window.iter().all(|n| lattice.offset(n) != 0));

        let sphere = NeighbourStrategy::Sphere(SphereNeighbours::new(3.0, 3, 1).unwrap());
        let result = sphere.neighbours(&lattice, &[0, 0]);
        assert!(!result.is_empty());
        assert!(result.iter().all(|n| lattice.offset(n) != 0));
    }

    #[test]
    fn cell_energy_halves_the_neighbour_sum() {
        let lattice = grid([3, 3], [Fixed, Fixed], 1.0);
        let potential = Potential::legendre(1.0);
        let energy = NeighbourStrategy::Nearest
            .cell_energy(&lattice, &potential, &[1, 1])
            .unwrap();
        assert!((energy - 2.0).abs() < 1e-12);
    }
}
