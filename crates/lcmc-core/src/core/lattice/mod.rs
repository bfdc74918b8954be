//! The director lattice: an N-dimensional grid of particles, each with a unit
//! orientation vector (spin) and a spatial location.
//!
//! Cells are stored in flat arrays addressed by a row-major linear offset.
//! Index tuples passed to [`Lattice::get`], [`Lattice::set`] and
//! [`Lattice::location_at`] are *raw*: components outside `[0, dim)` are
//! reduced modulo the axis size for storage access, while
//! [`Lattice::location_at`] additionally shifts the coordinate by whole
//! lattice lengths on periodic axes so distances across the seam are correct.

pub mod builder;
pub(crate) mod indexing;

use crate::core::energy::EnergyModel;
use crate::core::potentials::PotentialError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use itertools::Itertools;
use std::str::FromStr;
use thiserror::Error;

const MIN_SPIN_NORM: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Lattice must have at least one axis")]
    NoAxes,

    #[error("Axis {axis} has zero size")]
    EmptyAxis { axis: usize },

    #[error("Expected {expected} {what}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Spin vector has zero norm and cannot be normalized")]
    ZeroNormSpin,

    #[error("Unknown boundary condition '{0}' (expected 'P' or 'F')")]
    UnknownBoundaryCondition(String),

    #[error("Missing required lattice parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid {what}: {value} (must be finite and {requirement})")]
    InvalidValue {
        what: &'static str,
        value: f64,
        requirement: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryCondition {
    Periodic,
    Fixed,
}

impl FromStr for BoundaryCondition {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "periodic" => Ok(Self::Periodic),
            "f" | "fixed" => Ok(Self::Fixed),
            _ => Err(LatticeError::UnknownBoundaryCondition(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    dimensions: Vec<usize>,
    boundary_conditions: Vec<BoundaryCondition>,
    spacing: Vec<f64>,
    spins: Vec<DVector<f64>>,
    locations: Vec<DVector<f64>>,
    original_locations: Vec<DVector<f64>>,
    temperature: f64,
}

impl Lattice {
    /// Creates a lattice from per-cell spins and locations given in row-major
    /// order. Spins are normalized; the given locations become the original
    /// locations used by the displacement cutoff.
    pub fn new(
        dimensions: Vec<usize>,
        boundary_conditions: Vec<BoundaryCondition>,
        spacing: Vec<f64>,
        spins: Vec<DVector<f64>>,
        locations: Vec<DVector<f64>>,
        temperature: f64,
    ) -> Result<Self, LatticeError> {
        if dimensions.is_empty() {
            return Err(LatticeError::NoAxes);
        }
        if let Some(axis) = dimensions.iter().position(|&d| d == 0) {
            return Err(LatticeError::EmptyAxis { axis });
        }
        let ndim = dimensions.len();
        check_len("boundary conditions", ndim, boundary_conditions.len())?;
        check_len("spacing values", ndim, spacing.len())?;
        if let Some(&value) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(LatticeError::InvalidValue {
                what: "spacing",
                value,
                requirement: "positive",
            });
        }

        let cells: usize = dimensions.iter().product();
        check_len("spins", cells, spins.len())?;
        check_len("locations", cells, locations.len())?;

        let spins = spins
            .into_iter()
            .map(|s| {
                check_len("spin components", ndim, s.len())?;
                normalize(s)
            })
            .collect::<Result<Vec<_>, _>>()?;
        for location in &locations {
            check_len("location coordinates", ndim, location.len())?;
        }

        Ok(Self {
            dimensions,
            boundary_conditions,
            spacing,
            spins,
            original_locations: locations.clone(),
            locations,
            temperature,
        })
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn boundary_conditions(&self) -> &[BoundaryCondition] {
        &self.boundary_conditions
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.spins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature;
    }

    pub fn spins(&self) -> &[DVector<f64>] {
        &self.spins
    }

    pub fn locations(&self) -> &[DVector<f64>] {
        &self.locations
    }

    #[inline]
    pub fn offset(&self, indices: &[isize]) -> usize {
        indexing::linear_offset(indices, &self.dimensions)
    }

    pub fn indices_of(&self, offset: usize) -> Vec<isize> {
        indexing::unravel_offset(offset, &self.dimensions)
    }

    /// All cell index tuples in row-major order.
    pub fn cell_indices(&self) -> impl Iterator<Item = Vec<isize>> + '_ {
        (0..self.len()).map(|offset| self.indices_of(offset))
    }

    pub fn get(&self, indices: &[isize]) -> (&DVector<f64>, &DVector<f64>) {
        let offset = self.offset(indices);
        (&self.spins[offset], &self.locations[offset])
    }

    pub fn set(
        &mut self,
        indices: &[isize],
        spin: DVector<f64>,
        location: DVector<f64>,
    ) -> Result<(), LatticeError> {
        let offset = self.offset(indices);
        self.set_at(offset, spin, location)
    }

    pub fn spin(&self, offset: usize) -> &DVector<f64> {
        &self.spins[offset]
    }

    pub fn location(&self, offset: usize) -> &DVector<f64> {
        &self.locations[offset]
    }

    pub fn original_location(&self, offset: usize) -> &DVector<f64> {
        &self.original_locations[offset]
    }

    pub fn set_at(
        &mut self,
        offset: usize,
        spin: DVector<f64>,
        location: DVector<f64>,
    ) -> Result<(), LatticeError> {
        check_len("spin components", self.ndim(), spin.len())?;
        check_len("location coordinates", self.ndim(), location.len())?;
        self.spins[offset] = normalize(spin)?;
        self.locations[offset] = location;
        Ok(())
    }

    /// Puts back a spin and location previously read from this lattice,
    /// bypassing renormalization so a rejected move leaves no trace.
    pub(crate) fn restore_at(&mut self, offset: usize, spin: DVector<f64>, location: DVector<f64>) {
        self.spins[offset] = spin;
        self.locations[offset] = location;
    }

    /// Location of the (possibly out-of-range) cell, shifted onto the
    /// periodic image the raw indices refer to.
    ///
    /// Out-of-range components on fixed axes are not validated; callers must
    /// not request them.
    pub fn location_at(&self, indices: &[isize]) -> DVector<f64> {
        let mut location = self.locations[self.offset(indices)].clone();
        for (axis, &raw) in indices.iter().enumerate() {
            if self.boundary_conditions[axis] != BoundaryCondition::Periodic {
                continue;
            }
            let size = self.dimensions[axis] as isize;
            let wraps = raw.div_euclid(size);
            if wraps != 0 {
                location[axis] += wraps as f64 * self.spacing[axis] * size as f64;
            }
        }
        location
    }

    /// Every index tuple within `radius[axis]` of `indices` on each axis,
    /// excluding the cell itself.
    pub fn neighbour_indices(&self, indices: &[isize], radius: &[usize]) -> Vec<Vec<isize>> {
        let dims = &self.dimensions;
        let boundaries = &self.boundary_conditions;
        match self.ndim() {
            2 => indexing::window_2d(indices, radius, dims, boundaries),
            3 => indexing::window_3d(indices, radius, dims, boundaries),
            _ => indexing::window_nd(indices, radius, dims, boundaries),
        }
    }

    /// The ±1 neighbour along each axis.
    pub fn axis_neighbour_indices(&self, indices: &[isize]) -> Vec<Vec<isize>> {
        indexing::axis_neighbours(indices, &self.dimensions, &self.boundary_conditions)
    }

    pub fn average_orientation(&self) -> DVector<f64> {
        let mut sum = DVector::zeros(self.ndim());
        for spin in &self.spins {
            sum += spin;
        }
        sum / self.len() as f64
    }

    /// Mean squared deviation of the spins from their average orientation.
    pub fn orientation_variance(&self) -> f64 {
        let mean = self.average_orientation();
        self.spins
            .iter()
            .map(|spin| (spin - &mean).norm_squared())
            .sum::<f64>()
            / self.len() as f64
    }

    pub fn total_potential_energy(&self, model: &EnergyModel) -> Result<f64, PotentialError> {
        model.total_energy(self)
    }

    /// Equipartition kinetic energy, `d/2 · N · k_B · T`.
    pub fn thermal_energy(&self, boltzmann_constant: f64) -> f64 {
        self.ndim() as f64 * 0.5 * self.len() as f64 * boltzmann_constant * self.temperature
    }

    /// Renders a 2D lattice as a grid of spin angles in units of π.
    pub fn spin_angle_grid(&self) -> Option<String> {
        if self.ndim() != 2 {
            return None;
        }
        let columns = self.dimensions[1];
        let grid = self
            .spins
            .chunks(columns)
            .map(|row| {
                row.iter()
                    .map(|spin| format!("{:+.3}", spin[1].atan2(spin[0]) / std::f64::consts::PI))
                    .join(" ")
            })
            .join("\n");
        Some(grid)
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), LatticeError> {
    if expected == found {
        Ok(())
    } else {
        Err(LatticeError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}

fn normalize(spin: DVector<f64>) -> Result<DVector<f64>, LatticeError> {
    let norm = spin.norm();
    if !norm.is_finite() || norm < MIN_SPIN_NORM {
        return Err(LatticeError::ZeroNormSpin);
    }
    Ok(spin / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use BoundaryCondition::{Fixed, Periodic};

    const TOLERANCE: f64 = 1e-9;

    fn uniform_lattice(dims: &[usize], boundaries: Vec<BoundaryCondition>) -> Lattice {
        let ndim = dims.len();
        let cells: usize = dims.iter().product();
        let mut spin = DVector::zeros(ndim);
        spin[ndim - 1] = 1.0;
        let locations = (0..cells)
            .map(|o| {
                let idx = indexing::unravel_offset(o, dims);
                DVector::from_iterator(ndim, idx.iter().map(|&i| i as f64))
            })
            .collect();
        Lattice::new(
            dims.to_vec(),
            boundaries,
            vec![1.0; ndim],
            vec![spin; cells],
            locations,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn boundary_condition_parses_short_and_long_tags() {
        assert_eq!("P".parse::<BoundaryCondition>().unwrap(), Periodic);
        assert_eq!("f".parse::<BoundaryCondition>().unwrap(), Fixed);
        assert_eq!("Periodic".parse::<BoundaryCondition>().unwrap(), Periodic);
        assert!(matches!(
            "X".parse::<BoundaryCondition>(),
            Err(LatticeError::UnknownBoundaryCondition(_))
        ));
    }

    #[test]
    fn new_rejects_mismatched_cell_count() {
        let result = Lattice::new(
            vec![2, 2],
            vec![Periodic, Periodic],
            vec![1.0, 1.0],
            vec![DVector::from_vec(vec![1.0, 0.0]); 3],
            vec![DVector::zeros(2); 4],
            1.0,
        );
        assert_eq!(
            result.unwrap_err(),
            LatticeError::LengthMismatch {
                what: "spins",
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn new_rejects_boundary_count_mismatch() {
        let result = Lattice::new(
            vec![2, 2],
            vec![Periodic],
            vec![1.0, 1.0],
            vec![DVector::from_vec(vec![1.0, 0.0]); 4],
            vec![DVector::zeros(2); 4],
            1.0,
        );
        assert!(matches!(result, Err(LatticeError::LengthMismatch { .. })));
    }

    #[test]
    fn new_rejects_non_positive_spacing() {
        for spacing in [0.0, -1.0, f64::NAN] {
            let result = Lattice::new(
                vec![2, 2],
                vec![Periodic, Periodic],
                vec![1.0, spacing],
                vec![DVector::from_vec(vec![1.0, 0.0]); 4],
                vec![DVector::zeros(2); 4],
                1.0,
            );
            assert!(matches!(
                result,
                Err(LatticeError::InvalidValue { what: "spacing", .. })
            ));
        }
    }

    #[test]
    fn new_normalizes_spins() {
        let lattice = Lattice::new(
            vec![1, 2],
            vec![Fixed, Fixed],
            vec![1.0, 1.0],
            vec![DVector::from_vec(vec![3.0, 4.0]); 2],
            vec![DVector::zeros(2); 2],
            1.0,
        )
        .unwrap();
        for spin in lattice.spins() {
            assert!((spin.norm() - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn set_keeps_spins_at_unit_norm() {
        let mut lattice = uniform_lattice(&[3, 3], vec![Periodic, Periodic]);
        lattice
            .set(&[1, 2], DVector::from_vec(vec![0.3, -7.0]), DVector::zeros(2))
            .unwrap();
        lattice
            .set(&[-1, 4], DVector::from_vec(vec![1e-3, 1e-3]), DVector::zeros(2))
            .unwrap();
        for spin in lattice.spins() {
            assert!((spin.norm() - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn set_rejects_zero_spin() {
        let mut lattice = uniform_lattice(&[2, 2], vec![Fixed, Fixed]);
        let result = lattice.set(&[0, 0], DVector::zeros(2), DVector::zeros(2));
        assert_eq!(result, Err(LatticeError::ZeroNormSpin));
    }

    #[test]
    fn get_and_set_wrap_storage_indices() {
        let mut lattice = uniform_lattice(&[3, 3], vec![Fixed, Fixed]);
        let spin = DVector::from_vec(vec![1.0, 0.0]);
        lattice
            .set(&[3, -1], spin.clone(), DVector::from_vec(vec![9.0, 9.0]))
            .unwrap();
        let (stored_spin, stored_location) = lattice.get(&[0, 2]);
        assert_eq!(stored_spin, &spin);
        assert_eq!(stored_location, &DVector::from_vec(vec![9.0, 9.0]));
    }

    #[test]
    fn location_at_shifts_by_lattice_length_on_periodic_axis() {
        let lattice = uniform_lattice(&[4, 3], vec![Periodic, Periodic]);
        let base = lattice.location_at(&[0, 0]);
        let wrapped = lattice.location_at(&[4, 0]);
        let expected = &base + DVector::from_vec(vec![4.0, 0.0]);
        assert!((wrapped - expected).norm() < TOLERANCE);
    }

    #[test]
    fn location_at_handles_negative_wraps() {
        let lattice = uniform_lattice(&[4, 3], vec![Periodic, Periodic]);
        let image = lattice.location_at(&[-1, 5]);
        let expected = DVector::from_vec(vec![3.0 - 4.0, 2.0 + 3.0]);
        assert!((image - expected).norm() < TOLERANCE);
    }

    #[test]
    fn location_at_leaves_in_range_indices_unchanged() {
        let lattice = uniform_lattice(&[3, 3], vec![Fixed, Periodic]);
        assert_eq!(&lattice.location_at(&[2, 1]), lattice.get(&[2, 1]).1);
    }

    #[test]
    fn neighbour_fast_paths_match_general_enumeration() {
        for boundaries in [vec![Periodic, Periodic], vec![Fixed, Fixed]] {
            let lattice = uniform_lattice(&[3, 4], boundaries.clone());
            for cell in lattice.cell_indices() {
                let mut fast = lattice.neighbour_indices(&cell, &[1, 2]);
                let mut general = indexing::window_nd(
                    &cell,
                    &[1, 2],
                    lattice.dimensions(),
                    lattice.boundary_conditions(),
                );
                fast.sort();
                general.sort();
                assert_eq!(fast, general);
            }
        }
        for boundaries in [vec![Periodic; 3], vec![Fixed; 3]] {
            let lattice = uniform_lattice(&[2, 3, 2], boundaries);
            for cell in lattice.cell_indices() {
                let mut fast = lattice.neighbour_indices(&cell, &[1, 1, 1]);
                let mut general = indexing::window_nd(
                    &cell,
                    &[1, 1, 1],
                    lattice.dimensions(),
                    lattice.boundary_conditions(),
                );
                fast.sort();
                general.sort();
                assert_eq!(fast, general);
            }
        }
    }

    #[test]
    fn neighbour_indices_work_in_four_dimensions() {
        let lattice = uniform_lattice(&[2, 2, 2, 2], vec![Fixed; 4]);
        assert_eq!(lattice.neighbour_indices(&[0, 0, 0, 0], &[1; 4]).len(), 15);
    }

    #[test]
    fn aligned_lattice_has_zero_variance() {
        let lattice = uniform_lattice(&[3, 3], vec![Periodic, Periodic]);
        assert!(lattice.orientation_variance().abs() < TOLERANCE);
        let average = lattice.average_orientation();
        assert!((average - DVector::from_vec(vec![0.0, 1.0])).norm() < TOLERANCE);
    }

    #[test]
    fn antiparallel_pair_has_unit_variance() {
        let lattice = Lattice::new(
            vec![1, 2],
            vec![Fixed, Fixed],
            vec![1.0, 1.0],
            vec![
                DVector::from_vec(vec![1.0, 0.0]),
                DVector::from_vec(vec![-1.0, 0.0]),
            ],
            vec![DVector::zeros(2), DVector::from_vec(vec![0.0, 1.0])],
            1.0,
        )
        .unwrap();
        assert!(lattice.average_orientation().norm() < TOLERANCE);
        assert!((lattice.orientation_variance() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn clone_is_independent_of_the_original() {
        let lattice = uniform_lattice(&[2, 2], vec![Periodic, Periodic]);
        let mut copy = lattice.clone();
        copy.set(&[0, 0], DVector::from_vec(vec![1.0, 0.0]), DVector::zeros(2))
            .unwrap();
        copy.set_temperature(42.0);
        assert_ne!(lattice.get(&[0, 0]).0, copy.get(&[0, 0]).0);
        assert_eq!(lattice.temperature(), 1.0);
    }

    #[test]
    fn thermal_energy_follows_equipartition() {
        let mut lattice = uniform_lattice(&[2, 3], vec![Fixed, Fixed]);
        lattice.set_temperature(4.0);
        assert!((lattice.thermal_energy(0.5) - 2.0 * 0.5 * 6.0 * 0.5 * 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn spin_angle_grid_is_only_rendered_for_two_dimensions() {
        let lattice = uniform_lattice(&[2, 2], vec![Fixed, Fixed]);
        let grid = lattice.spin_angle_grid().unwrap();
        assert_eq!(grid.lines().count(), 2);
        assert_eq!(grid.lines().next(), Some("+0.500 +0.500"));
        assert!(grid.contains("+0.500"));
        assert!(uniform_lattice(&[2, 2, 2], vec![Fixed; 3]).spin_angle_grid().is_none());
    }
}
