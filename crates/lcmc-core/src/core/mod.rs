//! # Core Module
//!
//! Stateless building blocks of the simulation: the director lattice, the
//! pairwise potentials, the strategies that decide which pairs interact, and
//! file formats for persisting and visualizing lattice states.
//!
//! - **Lattice** ([`lattice`]) - Spins and locations on an N-dimensional grid with
//!   periodic or fixed boundaries
//! - **Potentials** ([`potentials`]) - Legendre and Gay–Berne pair energies
//! - **Neighbours** ([`neighbours`]) - Nearest, fixed-window and cached sphere
//!   neighbour resolution
//! - **Energy** ([`energy`]) - A potential paired with a neighbour strategy
//! - **File I/O** ([`io`]) - State repository and AViz snapshot export
//! - **Constants** ([`constants`]) - Natural constants in CGS units

pub mod constants;
pub mod energy;
pub mod io;
pub mod lattice;
pub mod neighbours;
pub mod potentials;
