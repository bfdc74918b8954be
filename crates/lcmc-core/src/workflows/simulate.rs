use crate::core::energy::EnergyModel;
use crate::core::lattice::Lattice;
use crate::engine::annealing::{AnnealingController, PhaseSummary};
use crate::engine::config::{PhaseConfig, SimulationConfig};
use crate::engine::context::SimulationContext;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::SnapshotSink;
use tracing::{debug, info, instrument};

/// The lattice a phase ended with, and how it got there.
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub summary: PhaseSummary,
    pub lattice: Lattice,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub heating: Option<PhaseOutcome>,
    pub cooling: Option<PhaseOutcome>,
    pub lattice: Lattice,
}

/// Where each phase sends its adopted states.
pub struct PhaseSinks<'s> {
    pub heating: &'s mut dyn SnapshotSink,
    pub cooling: &'s mut dyn SnapshotSink,
}

/// Generates the starting lattice described by the configuration.
pub fn initial_lattice(
    config: &SimulationConfig,
    ctx: &mut SimulationContext,
) -> Result<Lattice, EngineError> {
    Ok(config.lattice.builder().build(&mut ctx.rng)?)
}

#[instrument(skip_all, name = "simulation_workflow")]
pub fn run(
    lattice: Lattice,
    config: &SimulationConfig,
    ctx: &mut SimulationContext,
    sinks: PhaseSinks<'_>,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    let mut model = EnergyModel::new(config.potential, config.neighbours.clone());
    info!(
        dimensions = ?lattice.dimensions(),
        cells = lattice.len(),
        potential = config.potential.name(),
        neighbours = config.neighbours.name(),
        initial_energy = model.total_energy(&lattice)?,
        "Starting simulation."
    );

    let mut lattice = lattice;
    let heating = match &config.heating {
        Some(phase) => {
            let outcome = run_phase(phase, lattice, &mut model, ctx, sinks.heating, reporter)?;
            lattice = outcome.lattice.clone();
            Some(outcome)
        }
        None => None,
    };
    let cooling = match &config.cooling {
        Some(phase) => {
            let outcome = run_phase(phase, lattice, &mut model, ctx, sinks.cooling, reporter)?;
            lattice = outcome.lattice.clone();
            Some(outcome)
        }
        None => None,
    };

    info!(
        final_energy = model.total_energy(&lattice)?,
        variance = lattice.orientation_variance(),
        "Simulation finished."
    );
    if let Some(grid) = lattice.spin_angle_grid() {
        debug!("Final spin angles (units of pi):\n{grid}");
    }

    Ok(SimulationResult {
        heating,
        cooling,
        lattice,
    })
}

fn run_phase(
    phase: &PhaseConfig,
    lattice: Lattice,
    model: &mut EnergyModel,
    ctx: &mut SimulationContext,
    sink: &mut dyn SnapshotSink,
    reporter: &ProgressReporter,
) -> Result<PhaseOutcome, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: phase.name.clone(),
        temperatures: phase.temperatures.len() + 1,
    });
    info!(
        phase = %phase.name,
        selector = phase.selector.name(),
        temperatures = ?phase.temperatures,
        "Starting annealing phase."
    );

    let mut controller = AnnealingController::new(phase, lattice)?;
    let summary = controller
        .run(model, ctx, sink, reporter)
        .map_err(|e| match e {
            EngineError::Internal(reason) => EngineError::PhaseFailed {
                phase: phase.name.clone(),
                reason,
            },
            other => other,
        })?;

    info!(
        phase = %summary.name,
        sweeps = summary.sweeps,
        adopted = summary.adopted_states,
        final_energy = summary.final_energy,
        "Annealing phase finished."
    );
    reporter.report(Progress::PhaseFinish);

    Ok(PhaseOutcome {
        summary,
        lattice: controller.into_lattice(),
    })
}
