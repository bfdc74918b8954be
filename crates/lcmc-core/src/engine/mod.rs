//! # Engine Module
//!
//! The Monte Carlo engine that moves a lattice towards equilibrium.
//!
//! ## Architecture
//!
//! - **Parameters** ([`parameters`]) - The flat, named parameter set read from a model file
//! - **Configuration** ([`config`]) - Validated, typed settings built from the parameter set
//! - **Context** ([`context`]) - Physical constants and the seedable random generator of a run
//! - **Metropolis Stepper** ([`metropolis`]) - Single moves and full lattice sweeps
//! - **State Selection** ([`selector`]) - Decides whether a swept candidate replaces the current state
//! - **Annealing** ([`annealing`]) - The per-phase temperature schedule state machine
//! - **State Tracking** ([`state`]) - Accepted-state records and the sinks that persist them
//! - **Progress Monitoring** ([`progress`]) - Progress callbacks for user interfaces
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod annealing;
pub mod config;
pub mod context;
pub mod error;
pub mod metropolis;
pub mod parameters;
pub mod progress;
pub mod selector;
pub mod state;
