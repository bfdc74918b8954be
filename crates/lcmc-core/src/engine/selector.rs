use super::config::ConfigError;
use crate::core::energy::EnergyModel;
use crate::core::lattice::Lattice;
use crate::core::potentials::PotentialError;
use std::fmt;
use std::str::FromStr;

/// Decides whether a freshly swept candidate replaces the current lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSelector {
    /// Every candidate is adopted.
    AlwaysNewer,
    /// Adopt when the total potential energy strictly decreases.
    LowerEnergy,
    /// Adopt when the orientation variance strictly increases.
    HigherVariance,
}

impl StateSelector {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AlwaysNewer => "always-newer",
            Self::LowerEnergy => "lower-energy",
            Self::HigherVariance => "higher-variance",
        }
    }

    pub fn is_better(
        &self,
        before: &Lattice,
        after: &Lattice,
        model: &EnergyModel,
    ) -> Result<bool, PotentialError> {
        Ok(match self {
            Self::AlwaysNewer => true,
            Self::LowerEnergy => model.total_energy(after)? < model.total_energy(before)?,
            Self::HigherVariance => after.orientation_variance() > before.orientation_variance(),
        })
    }
}

impl fmt::Display for StateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "always-newer" => Ok(Self::AlwaysNewer),
            "lower-energy" => Ok(Self::LowerEnergy),
            "higher-variance" => Ok(Self::HigherVariance),
            _ => Err(ConfigError::invalid(
                "SELECTOR",
                format!("unknown selector '{s}'"),
            )),
        }
    }
}
