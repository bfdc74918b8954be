//! # Workflows Module
//!
//! Top-level entry points that take a configured lattice through a complete
//! simulation.
//!
//! - **Simulation Workflow** ([`simulate`]) - An optional heating phase followed
//!   by an optional cooling phase, each a full annealing schedule.

pub mod simulate;
