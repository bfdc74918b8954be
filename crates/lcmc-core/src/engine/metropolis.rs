use super::config::MetropolisConfig;
use super::context::SimulationContext;
use super::error::EngineError;
use crate::core::energy::EnergyModel;
use crate::core::lattice::Lattice;
use crate::core::lattice::builder::gaussian;
use nalgebra::DVector;
use rand::Rng;
use tracing::{debug, instrument};

const MIN_PROPOSAL_NORM: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub accepted: bool,
    /// Change of the moved cell's halved contribution.
    pub delta_e: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepOutcome {
    pub attempted: usize,
    pub accepted: usize,
    /// Change of the lattice's total potential energy over the sweep.
    pub energy_change: f64,
}

impl SweepOutcome {
    pub fn acceptance_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempted as f64
        }
    }
}

/// Metropolis acceptance probability of a move changing the energy by
/// `delta_e` at thermal energy `k_B · T`.
pub fn acceptance_probability(delta_e: f64, thermal_energy: f64) -> Result<f64, EngineError> {
    if !(thermal_energy.is_finite() && thermal_energy > 0.0) {
        return Err(EngineError::NonPositiveTemperature(thermal_energy));
    }
    if !delta_e.is_finite() {
        return Err(EngineError::NonFiniteEnergy(delta_e));
    }
    if delta_e < 0.0 {
        return Ok(1.0);
    }
    Ok((-delta_e / thermal_energy).exp().min(1.0))
}

/// Perturbs every spin component by `N(0, stdev)`. A proposal that lands on
/// the origin falls back to the current spin.
pub fn propose_spin(rng: &mut impl Rng, spin: &DVector<f64>, stdev: f64) -> DVector<f64> {
    let proposal = spin.map(|c| c + gaussian(rng, stdev));
    if proposal.norm() < MIN_PROPOSAL_NORM {
        spin.clone()
    } else {
        proposal
    }
}

/// Perturbs every coordinate by `N(0, stdev)`, reverting to `current` when the
/// result drifts further than `cutoff` from `original`.
pub fn propose_location(
    rng: &mut impl Rng,
    current: &DVector<f64>,
    original: &DVector<f64>,
    stdev: f64,
    cutoff: Option<f64>,
) -> DVector<f64> {
    let proposal = current.map(|c| c + gaussian(rng, stdev));
    match cutoff {
        Some(cutoff) if (&proposal - original).norm_squared() > cutoff * cutoff => current.clone(),
        _ => proposal,
    }
}

/// Tentatively places `spin` and `location` at `offset` and keeps them iff
/// `draw` falls below the acceptance probability.
pub fn try_move(
    lattice: &mut Lattice,
    model: &EnergyModel,
    offset: usize,
    spin: DVector<f64>,
    location: DVector<f64>,
    thermal_energy: f64,
    draw: f64,
) -> Result<MoveOutcome, EngineError> {
    let indices = lattice.indices_of(offset);
    let old_spin = lattice.spin(offset).clone();
    let old_location = lattice.location(offset).clone();

    let before = model.cell_energy(lattice, &indices)?;
    lattice.set_at(offset, spin, location)?;
    let after = match model.cell_energy(lattice, &indices) {
        Ok(energy) => energy,
        Err(e) => {
            lattice.restore_at(offset, old_spin, old_location);
            return Err(e.into());
        }
    };

    let delta_e = after - before;
    let alpha = match acceptance_probability(delta_e, thermal_energy) {
        Ok(alpha) => alpha,
        Err(e) => {
            lattice.restore_at(offset, old_spin, old_location);
            return Err(e);
        }
    };

    let accepted = draw < alpha;
    if !accepted {
        lattice.restore_at(offset, old_spin, old_location);
    }
    Ok(MoveOutcome { accepted, delta_e })
}

/// One sweep: every cell in row-major order receives `steps_per_cell`
/// proposals, each followed by exactly one uniform draw.
#[instrument(level = "debug", skip_all)]
pub fn sweep(
    lattice: &mut Lattice,
    model: &mut EnergyModel,
    config: &MetropolisConfig,
    ctx: &mut SimulationContext,
) -> Result<SweepOutcome, EngineError> {
    let thermal_energy = ctx.thermal_energy(lattice.temperature());
    if !(thermal_energy.is_finite() && thermal_energy > 0.0) {
        return Err(EngineError::NonPositiveTemperature(thermal_energy));
    }
    model.prepare_sweep(lattice);

    let mut outcome = SweepOutcome::default();
    for offset in 0..lattice.len() {
        for _ in 0..config.steps_per_cell {
            let spin = propose_spin(&mut ctx.rng, lattice.spin(offset), config.spin_stdev);
            let location = propose_location(
                &mut ctx.rng,
                lattice.location(offset),
                lattice.original_location(offset),
                config.spacing_stdev,
                config.displacement_cutoff,
            );
            let draw: f64 = ctx.rng.r#gen();

            let result = try_move(lattice, model, offset, spin, location, thermal_energy, draw)?;
            outcome.attempted += 1;
            if result.accepted {
                outcome.accepted += 1;
                // Each pair term sits in the halved contributions of both endpoints.
                outcome.energy_change += 2.0 * result.delta_e;
            }
        }
    }

    debug!(
        temperature = lattice.temperature(),
        attempted = outcome.attempted,
        accepted = outcome.accepted,
        energy_change = outcome.energy_change,
        "Sweep finished."
    );
    Ok(outcome)
}
