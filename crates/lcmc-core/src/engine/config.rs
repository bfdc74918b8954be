use super::parameters::{ParameterSet, keys};
use super::selector::StateSelector;
use crate::core::constants::NaturalConstants;
use crate::core::lattice::builder::{LatticeBuilder, LatticeGeometry};
use crate::core::lattice::{BoundaryCondition, LatticeError};
use crate::core::neighbours::{NeighbourError, NeighbourStrategy, SphereNeighbours};
use crate::core::potentials::{GayBerneDipoleParameters, GayBerneParameters, Potential};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Failed to parse parameters: {0}")]
    Parse(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Temperature schedule is empty")]
    EmptySchedule,

    #[error(
        "Phase '{phase}' uses the always-newer selector without a maximum step count and would never finish"
    )]
    UnboundedPhase { phase: String },

    #[error("Invalid neighbour configuration: {0}")]
    Neighbours(#[from] NeighbourError),

    #[error("Invalid lattice configuration: {0}")]
    Lattice(#[from] LatticeError),
}

impl ConfigError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Proposal widths and repetition count of one Metropolis sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct MetropolisConfig {
    /// Standard deviation of the Gaussian added to each spin component.
    pub spin_stdev: f64,
    /// Standard deviation of the Gaussian added to each coordinate.
    pub spacing_stdev: f64,
    /// Maximum distance a particle may drift from its original location.
    pub displacement_cutoff: Option<f64>,
    /// Proposals attempted per cell per sweep.
    pub steps_per_cell: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseConfig {
    pub name: String,
    pub metropolis: MetropolisConfig,
    pub temperatures: Vec<f64>,
    pub max_non_improving_steps: usize,
    /// Ceiling on sweeps spent at a single temperature.
    pub max_steps: Option<usize>,
    pub selector: StateSelector,
}

#[derive(Default)]
pub struct PhaseConfigBuilder {
    name: Option<String>,
    spin_stdev: Option<f64>,
    spacing_stdev: Option<f64>,
    displacement_cutoff: Option<f64>,
    steps_per_cell: Option<usize>,
    temperatures: Option<Vec<f64>>,
    max_non_improving_steps: Option<usize>,
    max_steps: Option<usize>,
    selector: Option<StateSelector>,
}

impl PhaseConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn spin_stdev(mut self, stdev: f64) -> Self {
        self.spin_stdev = Some(stdev);
        self
    }
    pub fn spacing_stdev(mut self, stdev: f64) -> Self {
        self.spacing_stdev = Some(stdev);
        self
    }
    pub fn displacement_cutoff(mut self, cutoff: Option<f64>) -> Self {
        self.displacement_cutoff = cutoff;
        self
    }
    pub fn steps_per_cell(mut self, steps: usize) -> Self {
        self.steps_per_cell = Some(steps);
        self
    }
    pub fn temperatures(mut self, temperatures: Vec<f64>) -> Self {
        self.temperatures = Some(temperatures);
        self
    }
    pub fn max_non_improving_steps(mut self, steps: usize) -> Self {
        self.max_non_improving_steps = Some(steps);
        self
    }
    pub fn max_steps(mut self, steps: Option<usize>) -> Self {
        self.max_steps = steps;
        self
    }
    pub fn selector(mut self, selector: StateSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn build(self) -> Result<PhaseConfig, ConfigError> {
        let missing = |name: &str| ConfigError::MissingParameter(name.to_string());
        let name = self.name.ok_or_else(|| missing("name"))?;
        let metropolis = MetropolisConfig {
            spin_stdev: non_negative("spin_stdev", self.spin_stdev.ok_or_else(|| missing("spin_stdev"))?)?,
            spacing_stdev: non_negative(
                "spacing_stdev",
                self.spacing_stdev.ok_or_else(|| missing("spacing_stdev"))?,
            )?,
            displacement_cutoff: self
                .displacement_cutoff
                .map(|c| positive("displacement_cutoff", c))
                .transpose()?,
            steps_per_cell: at_least_one(
                "steps_per_cell",
                self.steps_per_cell.ok_or_else(|| missing("steps_per_cell"))?,
            )?,
        };

        let temperatures = self.temperatures.ok_or_else(|| missing("temperatures"))?;
        if temperatures.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        for &t in &temperatures {
            positive("temperatures", t)?;
        }

        let max_non_improving_steps = at_least_one(
            "max_non_improving_steps",
            self.max_non_improving_steps
                .ok_or_else(|| missing("max_non_improving_steps"))?,
        )?;
        let max_steps = self
            .max_steps
            .map(|s| at_least_one("max_steps", s))
            .transpose()?;
        let selector = self.selector.ok_or_else(|| missing("selector"))?;
        if selector == StateSelector::AlwaysNewer && max_steps.is_none() {
            return Err(ConfigError::UnboundedPhase { phase: name });
        }

        Ok(PhaseConfig {
            name,
            metropolis,
            temperatures,
            max_non_improving_steps,
            max_steps,
            selector,
        })
    }
}

/// How the initial lattice is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeConfig {
    pub geometry: LatticeGeometry,
    pub spacing_stdev: Vec<f64>,
    pub spin_orientation: Vec<f64>,
    pub spin_orientation_stdev: Vec<f64>,
    pub temperature: f64,
}

impl LatticeConfig {
    pub fn builder(&self) -> LatticeBuilder {
        LatticeBuilder::new()
            .geometry(self.geometry.clone())
            .spacing_stdev(self.spacing_stdev.clone())
            .spin_orientation(self.spin_orientation.clone())
            .spin_orientation_stdev(self.spin_orientation_stdev.clone())
            .temperature(self.temperature)
    }
}

/// Where a run writes its snapshots and states.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub heating_aviz_prefix: String,
    pub cooling_aviz_prefix: String,
    pub heating_state_name: String,
    pub cooling_state_name: String,
    pub repository_location: String,
    pub repository_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            heating_aviz_prefix: "output/lqs_1_heat".to_string(),
            cooling_aviz_prefix: "output/lqs_2_cool".to_string(),
            heating_state_name: "heated".to_string(),
            cooling_state_name: "cooled".to_string(),
            repository_location: "states".to_string(),
            repository_suffix: "dat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    pub potential: Potential,
    pub neighbours: NeighbourStrategy,
    pub constants: NaturalConstants,
    pub heating: Option<PhaseConfig>,
    pub cooling: Option<PhaseConfig>,
    pub output: OutputConfig,
    pub seed: Option<u64>,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    lattice: Option<LatticeConfig>,
    potential: Option<Potential>,
    neighbours: Option<NeighbourStrategy>,
    constants: Option<NaturalConstants>,
    heating: Option<PhaseConfig>,
    cooling: Option<PhaseConfig>,
    output: Option<OutputConfig>,
    seed: Option<u64>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lattice(mut self, lattice: LatticeConfig) -> Self {
        self.lattice = Some(lattice);
        self
    }
    pub fn potential(mut self, potential: Potential) -> Self {
        self.potential = Some(potential);
        self
    }
    pub fn neighbours(mut self, neighbours: NeighbourStrategy) -> Self {
        self.neighbours = Some(neighbours);
        self
    }
    pub fn constants(mut self, constants: NaturalConstants) -> Self {
        self.constants = Some(constants);
        self
    }
    pub fn heating(mut self, phase: Option<PhaseConfig>) -> Self {
        self.heating = phase;
        self
    }
    pub fn cooling(mut self, phase: Option<PhaseConfig>) -> Self {
        self.cooling = phase;
        self
    }
    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let lattice = self
            .lattice
            .ok_or_else(|| ConfigError::MissingParameter("lattice".to_string()))?;
        let neighbours = self
            .neighbours
            .ok_or_else(|| ConfigError::MissingParameter("neighbours".to_string()))?;
        neighbours.validate(&lattice.geometry.spacing)?;

        Ok(SimulationConfig {
            potential: self
                .potential
                .ok_or_else(|| ConfigError::MissingParameter("potential".to_string()))?,
            lattice,
            neighbours,
            constants: self.constants.unwrap_or_default(),
            heating: self.heating,
            cooling: self.cooling,
            output: self.output.unwrap_or_default(),
            seed: self.seed,
        })
    }
}

impl SimulationConfig {
    /// Builds and validates a full configuration from named model parameters.
    ///
    /// Physical parameters are required. Output locations, the seed, the
    /// selectors and the Boltzmann constant fall back to defaults. The heating
    /// phase runs only when `USE_MC_HEATER` is set; the cooling phase runs
    /// unless `USE_MC_COOLER` is false.
    pub fn from_parameters(params: &ParameterSet) -> Result<Self, ConfigError> {
        let dimensions = params.usize_list(keys::DIMENSIONS)?;
        let ndim = dimensions.len();
        let boundary_conditions = params
            .string_list(keys::BOUNDARY_CONDITIONS)?
            .iter()
            .map(|tag| tag.parse())
            .collect::<Result<Vec<BoundaryCondition>, LatticeError>>()?;

        let lattice = LatticeConfig {
            geometry: LatticeGeometry {
                dimensions,
                boundary_conditions,
                spacing: params.f64_list(keys::INITIAL_SPACING, ndim)?,
            },
            spacing_stdev: params.f64_list(keys::INITIAL_SPACING_STDEV, ndim)?,
            spin_orientation: params.f64_list(keys::INITIAL_SPIN_ORIENTATION, ndim)?,
            spin_orientation_stdev: params.f64_list(keys::INITIAL_SPIN_ORIENTATION_STDEV, ndim)?,
            temperature: params.f64(keys::INITIAL_TEMPERATURE)?,
        };

        let constants = match params.optional_f64(keys::BOLTZMANN_CONSTANT)? {
            Some(k_b) => NaturalConstants::default().with_boltzmann(positive(keys::BOLTZMANN_CONSTANT, k_b)?),
            None => NaturalConstants::default(),
        };

        let heating = params
            .bool_or(keys::USE_MC_HEATER, false)?
            .then(|| phase_from(params, keys::HEATER_PREFIX, "heating", StateSelector::HigherVariance))
            .transpose()?;
        let cooling = params
            .bool_or(keys::USE_MC_COOLER, true)?
            .then(|| phase_from(params, keys::COOLER_PREFIX, "cooling", StateSelector::LowerEnergy))
            .transpose()?;

        let defaults = OutputConfig::default();
        let prefixed = |prefix: &str, key: &str| format!("{prefix}{key}");
        let output = OutputConfig {
            heating_aviz_prefix: params
                .string_or(&prefixed(keys::HEATER_PREFIX, keys::AVIZ_OUTPUT_PATH), &defaults.heating_aviz_prefix)?
                .to_string(),
            cooling_aviz_prefix: params
                .string_or(&prefixed(keys::COOLER_PREFIX, keys::AVIZ_OUTPUT_PATH), &defaults.cooling_aviz_prefix)?
                .to_string(),
            heating_state_name: params
                .string_or(&prefixed(keys::HEATER_PREFIX, keys::STATE_PREFIX), &defaults.heating_state_name)?
                .to_string(),
            cooling_state_name: params
                .string_or(&prefixed(keys::COOLER_PREFIX, keys::STATE_PREFIX), &defaults.cooling_state_name)?
                .to_string(),
            repository_location: params
                .string_or(keys::LCS_REPOSITORY_LOCATION, &defaults.repository_location)?
                .to_string(),
            repository_suffix: params
                .string_or(keys::LCS_REPOSITORY_SUFFIX, &defaults.repository_suffix)?
                .to_string(),
        };

        SimulationConfigBuilder::new()
            .potential(potential_from(params, &constants)?)
            .neighbours(neighbours_from(params)?)
            .lattice(lattice)
            .constants(constants)
            .heating(heating)
            .cooling(cooling)
            .output(output)
            .seed(params.optional_u64(keys::SEED)?)
            .build()
    }
}

fn normalized_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

fn potential_from(params: &ParameterSet, constants: &NaturalConstants) -> Result<Potential, ConfigError> {
    let name = params.string(keys::TWO_SPIN_POTENTIAL)?;
    let epsilon_0 = params.f64(keys::EPSILON_0)?;
    match normalized_name(name).as_str() {
        "legendre" => Ok(Potential::legendre(epsilon_0)),
        "gay-berne" => Ok(Potential::gay_berne(GayBerneParameters {
            epsilon_0,
            sigma_s: positive(keys::SIGMA_S, params.f64(keys::SIGMA_S)?)?,
            kappa: positive(keys::KAPPA, params.f64(keys::KAPPA)?)?,
            kappa_prime: positive(keys::KAPPA_TAG, params.f64(keys::KAPPA_TAG)?)?,
            mu: positive(keys::MIU, params.f64(keys::MIU)?)?,
            nu: params.f64(keys::NI)?,
        })),
        "gay-berne-dipole" => Ok(Potential::gay_berne_dipole(GayBerneDipoleParameters {
            epsilon_0,
            sigma_0: positive(keys::SIGMA_S, params.f64(keys::SIGMA_S)?)?,
            kappa: positive(keys::KAPPA, params.f64(keys::KAPPA)?)?,
            kappa_prime: positive(keys::KAPPA_TAG, params.f64(keys::KAPPA_TAG)?)?,
            dipole_strength: params
                .optional_f64(keys::DIPOLE_STRENGTH)?
                .unwrap_or_else(|| constants.dipole_strength()),
        })),
        _ => Err(ConfigError::invalid(
            keys::TWO_SPIN_POTENTIAL,
            format!("unknown pair potential '{name}' (expected legendre, gay-berne or gay-berne-dipole)"),
        )),
    }
}

fn neighbours_from(params: &ParameterSet) -> Result<NeighbourStrategy, ConfigError> {
    let name = params.string(keys::POTENTIAL)?;
    match normalized_name(name).as_str() {
        "nearest" => Ok(NeighbourStrategy::Nearest),
        "fixed-window" => Ok(NeighbourStrategy::FixedWindow {
            range: at_least_one(
                keys::NEAREST_NEIGHBOURS_MAX_INDEX_RANGE,
                params.usize(keys::NEAREST_NEIGHBOURS_MAX_INDEX_RANGE)?,
            )?,
        }),
        "sphere" => Ok(NeighbourStrategy::Sphere(SphereNeighbours::new(
            params.f64(keys::NEAREST_NEIGHBOURS_MAX_RADIUS)?,
            params.usize(keys::NEAREST_NEIGHBOURS_MAX_INDEX_RANGE)?,
            params.usize(keys::NEAREST_NEIGHBOURS_UPDATE_CYCLES)?,
        )?)),
        _ => Err(ConfigError::invalid(
            keys::POTENTIAL,
            format!("unknown neighbour strategy '{name}' (expected nearest, fixed-window or sphere)"),
        )),
    }
}

fn phase_from(
    params: &ParameterSet,
    prefix: &str,
    name: &str,
    default_selector: StateSelector,
) -> Result<PhaseConfig, ConfigError> {
    let key = |suffix: &str| format!("{prefix}{suffix}");
    let selector = match params.get(&key(keys::SELECTOR)) {
        Some(_) => params.string(&key(keys::SELECTOR))?.parse()?,
        None => default_selector,
    };
    PhaseConfigBuilder::new()
        .name(name)
        .spin_stdev(params.f64(&key(keys::SPIN_STDEV))?)
        .spacing_stdev(params.f64(&key(keys::SPACING_STDEV))?)
        .displacement_cutoff(params.optional_f64(&key(keys::SPACING_FROM_ORIGINAL_LOCATION_CUTOFF))?)
        .steps_per_cell(params.usize(&key(keys::METROPOLIS_NUM_STEPS))?)
        .temperatures(params.temperatures(&key(keys::TEMPERATURES))?)
        .max_non_improving_steps(params.usize(&key(keys::MAX_NON_IMPROVING_STEPS))?)
        .max_steps(params.optional_usize(&key(keys::MAX_STEPS))?)
        .selector(selector)
        .build()
}

fn non_negative(name: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(name, format!("{value} must be finite and non-negative")))
    }
}

fn positive(name: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(name, format!("{value} must be finite and positive")))
    }
}

fn at_least_one(name: &str, value: usize) -> Result<usize, ConfigError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(name, "must be at least 1"))
    }
}
