//! # LCMC Core Library
//!
//! Metropolis Monte Carlo relaxation of liquid-crystal director lattices.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** The lattice, pair potentials, neighbour
//!   resolution and file formats. Nothing here holds simulation state beyond
//!   the lattice itself and the neighbour-list cache.
//!
//! - **[`engine`]: The Logic Core.** The Metropolis stepper, state selectors
//!   and the annealing controller that walks a temperature schedule, along
//!   with typed configuration and the injected random source.
//!
//! - **[`workflows`]: The Public API.** Chains a heating phase and a cooling
//!   phase over a lattice, reporting progress and emitting snapshots.

pub mod core;
pub mod engine;
pub mod workflows;
