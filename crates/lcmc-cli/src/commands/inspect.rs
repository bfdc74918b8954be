use crate::cli::InspectArgs;
use crate::config;
use crate::error::Result;
use itertools::Itertools;
use lcmc::{
    core::{energy::EnergyModel, io::state::StateRepository, lattice::Lattice},
    engine::{config::SimulationConfig, error::EngineError},
};
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let mut params = config::load_parameters(&args.model)?;
    config::apply_set_values(&mut params, &args.set_values)?;

    let mut sim_config = SimulationConfig::from_parameters(&params)?;
    if let Some(dir) = &args.output_dir {
        config::relocate_outputs(&mut sim_config.output, dir);
    }
    let repository = StateRepository::open(
        &sim_config.output.repository_location,
        &sim_config.output.repository_suffix,
    )?;

    match &args.name {
        None => {
            println!("States in {}:", repository.root().display());
            for name in repository.state_names() {
                println!("  {}", name);
            }
        }
        Some(name) => {
            info!("Summarizing state '{}'", name);
            let lattice = repository
                .load(name)?
                .restore(&sim_config.lattice.geometry)?;
            let model = EnergyModel::new(sim_config.potential, sim_config.neighbours.clone());
            println!("{}", summarize(name, &lattice, &model)?);
        }
    }
    Ok(())
}

/// Renders the observables of a stored lattice under the model's potential.
fn summarize(name: &str, lattice: &Lattice, model: &EnergyModel) -> Result<String> {
    let energy = model
        .total_energy(lattice)
        .map_err(|source| EngineError::Potential { source })?;
    let orientation = lattice
        .average_orientation()
        .iter()
        .map(|c| format!("{c:.6}"))
        .join(", ");

    let mut lines = vec![
        format!("State '{}'", name),
        format!("  dimensions:          {:?}", lattice.dimensions()),
        format!("  temperature:         {}", lattice.temperature()),
        format!("  energy:              {:.6e}", energy),
        format!("  variance:            {:.6}", lattice.orientation_variance()),
        format!("  average orientation: [{}]", orientation),
    ];
    if let Some(grid) = lattice.spin_angle_grid() {
        lines.push("  spin angles:".to_string());
        lines.extend(grid.lines().map(|line| format!("    {}", line)));
    }
    Ok(lines.join("\n"))
}
