use super::BoundaryCondition;
use itertools::Itertools;
use std::ops::RangeInclusive;

/// Raw range of indices along one axis within `radius` of `center`.
///
/// Fixed axes are clamped to the lattice; periodic axes keep the unwrapped
/// range so that storage lookups and image locations can wrap it later.
#[inline]
pub(crate) fn axis_window(
    center: isize,
    radius: usize,
    size: usize,
    boundary: BoundaryCondition,
) -> RangeInclusive<isize> {
    let radius = radius as isize;
    match boundary {
        BoundaryCondition::Periodic => (center - radius)..=(center + radius),
        BoundaryCondition::Fixed => {
            (center - radius).max(0)..=(center + radius).min(size as isize - 1)
        }
    }
}

pub(crate) fn window_2d(
    center: &[isize],
    radius: &[usize],
    dimensions: &[usize],
    boundaries: &[BoundaryCondition],
) -> Vec<Vec<isize>> {
    let xs = axis_window(center[0], radius[0], dimensions[0], boundaries[0]);
    let ys = axis_window(center[1], radius[1], dimensions[1], boundaries[1]);

    let mut result = Vec::with_capacity(xs.clone().count() * ys.clone().count());
    for x in xs {
        for y in ys.clone() {
            if x == center[0] && y == center[1] {
                continue;
            }
            result.push(vec![x, y]);
        }
    }
    result
}

pub(crate) fn window_3d(
    center: &[isize],
    radius: &[usize],
    dimensions: &[usize],
    boundaries: &[BoundaryCondition],
) -> Vec<Vec<isize>> {
    let xs = axis_window(center[0], radius[0], dimensions[0], boundaries[0]);
    let ys = axis_window(center[1], radius[1], dimensions[1], boundaries[1]);
    let zs = axis_window(center[2], radius[2], dimensions[2], boundaries[2]);

    let mut result = Vec::new();
    for x in xs {
        for y in ys.clone() {
            for z in zs.clone() {
                if x == center[0] && y == center[1] && z == center[2] {
                    continue;
                }
                result.push(vec![x, y, z]);
            }
        }
    }
    result
}

pub(crate) fn window_nd(
    center: &[isize],
    radius: &[usize],
    dimensions: &[usize],
    boundaries: &[BoundaryCondition],
) -> Vec<Vec<isize>> {
    (0..center.len())
        .map(|axis| axis_window(center[axis], radius[axis], dimensions[axis], boundaries[axis]))
        .multi_cartesian_product()
        .filter(|candidate| candidate.as_slice() != center)
        .collect()
}

/// The immediate ±1 neighbour on each axis, omitted past a fixed edge.
pub(crate) fn axis_neighbours(
    center: &[isize],
    dimensions: &[usize],
    boundaries: &[BoundaryCondition],
) -> Vec<Vec<isize>> {
    let mut result = Vec::with_capacity(2 * center.len());
    for axis in 0..center.len() {
        for step in [-1, 1] {
            let raw = center[axis] + step;
            if boundaries[axis] == BoundaryCondition::Fixed
                && (raw < 0 || raw >= dimensions[axis] as isize)
            {
                continue;
            }
            let mut neighbour = center.to_vec();
            neighbour[axis] = raw;
            result.push(neighbour);
        }
    }
    result
}

/// Row-major linear offset of an index tuple, wrapping every component.
#[inline]
pub(crate) fn linear_offset(indices: &[isize], dimensions: &[usize]) -> usize {
    indices
        .iter()
        .zip(dimensions)
        .fold(0usize, |acc, (&raw, &size)| {
            acc * size + raw.rem_euclid(size as isize) as usize
        })
}

/// Inverse of [`linear_offset`] for in-range offsets.
pub(crate) fn unravel_offset(mut offset: usize, dimensions: &[usize]) -> Vec<isize> {
    let mut indices = vec![0isize; dimensions.len()];
    for axis in (0..dimensions.len()).rev() {
        indices[axis] = (offset % dimensions[axis]) as isize;
        offset /= dimensions[axis];
    }
    indices
}
