use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::aviz::AvizError;
use crate::core::io::state::StateError;
use crate::core::lattice::LatticeError;
use crate::core::potentials::PotentialError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Energy evaluation failed: {source}")]
    Potential {
        #[from]
        source: PotentialError,
    },

    #[error("Lattice update failed: {source}")]
    Lattice {
        #[from]
        source: LatticeError,
    },

    #[error("Thermal energy k_B*T must be positive and finite, got {0}")]
    NonPositiveTemperature(f64),

    #[error("Energy change evaluated to a non-finite value: {0}")]
    NonFiniteEnergy(f64),

    #[error("Failed to write snapshot: {0}")]
    Snapshot(#[from] AvizError),

    #[error("Failed to write state record: {0}")]
    Record(#[from] csv::Error),

    #[error("State repository error: {0}")]
    State(#[from] StateError),

    #[error("Phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: String, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
