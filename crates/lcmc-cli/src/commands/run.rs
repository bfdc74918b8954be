use crate::cli::RunArgs;
use crate::config::{self, FINAL_STATE_NAME};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use lcmc::{
    core::io::state::StateRepository,
    engine::{
        config::SimulationConfig, context::SimulationContext, progress::ProgressReporter,
        state::FileSnapshotSink,
    },
    workflows::simulate::{self, PhaseOutcome, PhaseSinks},
};
use std::path::PathBuf;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let mut params = config::load_parameters(&args.model)?;
    info!("Merging model parameters with CLI overrides...");
    config::apply_run_overrides(&mut params, &args)?;

    let mut sim_config = SimulationConfig::from_parameters(&params)?;
    if let Some(dir) = &args.output_dir {
        config::relocate_outputs(&mut sim_config.output, dir);
    }
    let output = sim_config.output.clone();

    let mut ctx = SimulationContext::new(sim_config.constants, sim_config.seed);
    let mut repository =
        StateRepository::open(&output.repository_location, &output.repository_suffix)?;

    let lattice = match &args.from_state {
        Some(name) => {
            info!("Restoring starting lattice from state '{}'", name);
            repository
                .load(name)?
                .restore(&sim_config.lattice.geometry)?
        }
        None => simulate::initial_lattice(&sim_config, &mut ctx)?,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut heating_sink = FileSnapshotSink::new(output.heating_aviz_prefix.as_str());
    let mut cooling_sink = FileSnapshotSink::new(output.cooling_aviz_prefix.as_str());

    println!(
        "Starting simulation of a {:?} lattice ({} cells)...",
        lattice.dimensions(),
        lattice.len()
    );
    info!("Invoking the core simulation workflow...");

    let result = simulate::run(
        lattice,
        &sim_config,
        &mut ctx,
        PhaseSinks {
            heating: &mut heating_sink,
            cooling: &mut cooling_sink,
        },
        &reporter,
    )?;

    let mut saved: Vec<(String, PathBuf)> = Vec::new();
    for (outcome, name) in [
        (&result.heating, &output.heating_state_name),
        (&result.cooling, &output.cooling_state_name),
    ] {
        if let Some(PhaseOutcome { summary, lattice }) = outcome {
            let path = repository.save(name, lattice)?;
            println!(
                "  Phase '{}': {} sweeps, {} states adopted, final energy {:.6e}",
                summary.name, summary.sweeps, summary.adopted_states, summary.final_energy
            );
            saved.push((name.clone(), path));
        }
    }
    let path = repository.save(FINAL_STATE_NAME, &result.lattice)?;
    saved.push((FINAL_STATE_NAME.to_string(), path));

    for (name, path) in &saved {
        println!("✓ State '{}' written to: {}", name, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    const MODEL: &str = r#"
        DIMENSIONS = [3, 3]
        BOUNDARY_CONDITIONS = ["P", "P"]
        INITIAL_SPACING = 1.0
        INITIAL_SPACING_STDEV = 0.0
        INITIAL_SPIN_ORIENTATION = [1.0, 0.0]
        INITIAL_SPIN_ORIENTATION_STDEV = 0.2
        INITIAL_TEMPERATURE = 1.0
        BOLTZMANN_CONSTANT = 1.0

        POTENTIAL = "nearest"
        TWO_SPIN_POTENTIAL = "legendre"
        EPSILON_0 = -1.0

        USE_MC_HEATER = true
        MC_HEATER_SPIN_STDEV = 0.5
        MC_HEATER_SPACING_STDEV = 0.0
        MC_HEATER_METROPOLIS_NUM_STEPS = 1
        MC_HEATER_MAX_NON_IMPROVING_STEPS = 2
        MC_HEATER_MAX_STEPS = 3
        MC_HEATER_TEMPERATURES = [3.0]
        MC_HEATER_AVIZ_OUTPUT_PATH = "aviz/heat_"

        MC_COOLER_SPIN_STDEV = 0.5
        MC_COOLER_SPACING_STDEV = 0.0
        MC_COOLER_METROPOLIS_NUM_STEPS = 1
        MC_COOLER_MAX_NON_IMPROVING_STEPS = 2
        MC_COOLER_MAX_STEPS = 3
        MC_COOLER_TEMPERATURES = { start = 2.0, stop = 0.5, step = -0.5 }
        MC_COOLER_AVIZ_OUTPUT_PATH = "aviz/cool_"
        SEED = 12
    "#;

    fn run_args(model: &Path, out: &Path, extra: &[&str]) -> RunArgs {
        let model = model.to_str().unwrap();
        let out = out.to_str().unwrap();
        let mut argv = vec!["lcmc", "run", "-m", model, "-o", out];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => panic!("expected run command"),
        }
    }

    fn write_model(dir: &Path) -> PathBuf {
        let path = dir.join("model.toml");
        fs::write(&path, MODEL).unwrap();
        path
    }

    #[test]
    fn run_writes_snapshots_info_logs_and_states() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());

        run(run_args(&model, dir.path(), &[])).unwrap();

        let aviz = dir.path().join("aviz");
        assert!(aviz.join("heat_00000000.xyz").is_file());
        assert!(aviz.join("cool_00000000.xyz").is_file());
        assert!(aviz.join("heat_info.csv").is_file());
        assert!(aviz.join("cool_info.csv").is_file());

        let repository = StateRepository::open(dir.path().join("states"), "dat").unwrap();
        let names: Vec<&str> = repository.state_names().collect();
        assert_eq!(names, vec!["cooled", "final", "heated"]);
        assert_eq!(repository.load("final").unwrap().temperature, 1.0);
    }

    #[test]
    fn run_can_resume_from_a_stored_state() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        run(run_args(&model, dir.path(), &["--no-heater"])).unwrap();

        run(run_args(
            &model,
            dir.path(),
            &["--from-state", "final", "--no-heater", "-S", "MC_COOLER_STATE_PREFIX=recooled"],
        ))
        .unwrap();

        let repository = StateRepository::open(dir.path().join("states"), "dat").unwrap();
        assert!(repository.contains("recooled"));
        assert!(!repository.contains("heated"));
    }

    #[test]
    fn unknown_starting_state_fails_before_simulating() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let result = run(run_args(&model, dir.path(), &["--from-state", "missing"]));
        assert!(result.is_err());
        assert!(!dir.path().join("aviz").exists());
    }

    #[test]
    fn invalid_model_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let result = run(run_args(
            &model,
            dir.path(),
            &["-S", "MC_COOLER_MAX_STEPS=0"],
        ));
        assert!(matches!(result, Err(crate::error::CliError::Config(_))));
    }
}
