use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use lcmc::engine::config::OutputConfig;
use lcmc::engine::parameters::{ParameterSet, keys};
use std::path::Path;
use tracing::debug;

/// Name under which the lattice of a completed run is stored.
pub const FINAL_STATE_NAME: &str = "final";

pub fn load_parameters(path: &Path) -> Result<ParameterSet> {
    debug!("Loading model parameters from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;
    ParameterSet::from_toml_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Applies `KEY=VALUE` overrides. Each value is read as a TOML value and
/// kept as a plain string when it is not one.
pub fn apply_set_values(params: &mut ParameterSet, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Argument(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Argument(format!(
                "Invalid --set format: '{}'. The key is empty.",
                kv_pair
            )));
        }
        let value = parse_value(value_str.trim());
        debug!("Overriding parameter {} = {}", key, value);
        params.set(key, value);
    }
    Ok(())
}

fn parse_value(text: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {text}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(text.to_string()))
}

/// Folds the dedicated `run` flags into the parameter set. Flags win over
/// both the model file and `--set`.
pub fn apply_run_overrides(params: &mut ParameterSet, args: &RunArgs) -> Result<()> {
    apply_set_values(params, &args.set_values)?;
    if let Some(seed) = args.seed {
        let seed = i64::try_from(seed)
            .map_err(|_| CliError::Argument(format!("Seed {seed} is too large.")))?;
        params.set(keys::SEED, toml::Value::Integer(seed));
    }
    if args.no_heater {
        params.set(keys::USE_MC_HEATER, toml::Value::Boolean(false));
    }
    if args.no_cooler {
        params.set(keys::USE_MC_COOLER, toml::Value::Boolean(false));
    }
    Ok(())
}

/// Resolves relative snapshot prefixes and the repository location against `dir`.
pub fn relocate_outputs(output: &mut OutputConfig, dir: &Path) {
    let relocate = |path: &mut String| {
        if Path::new(path.as_str()).is_relative() {
            *path = dir.join(path.as_str()).to_string_lossy().into_owned();
        }
    };
    relocate(&mut output.heating_aviz_prefix);
    relocate(&mut output.cooling_aviz_prefix);
    relocate(&mut output.repository_location);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["lcmc", "run", "-m", "model.toml"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn set_values_are_parsed_as_toml() {
        let mut params = ParameterSet::new();
        apply_set_values(
            &mut params,
            &[
                "A=3".to_string(),
                "B = 2.5".to_string(),
                "C=[1, 2]".to_string(),
                "D=true".to_string(),
                "E=sphere".to_string(),
                "F=\"quoted\"".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(params.usize("A").unwrap(), 3);
        assert_eq!(params.f64("B").unwrap(), 2.5);
        assert_eq!(params.usize_list("C").unwrap(), vec![1, 2]);
        assert!(params.bool_or("D", false).unwrap());
        assert_eq!(params.string("E").unwrap(), "sphere");
        assert_eq!(params.string("F").unwrap(), "quoted");
    }

    #[test]
    fn set_value_without_equals_is_rejected() {
        let mut params = ParameterSet::new();
        let result = apply_set_values(&mut params, &["SEED".to_string()]);
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn run_flags_override_set_values() {
        let mut params = ParameterSet::new();
        let args = run_args(&["--seed", "9", "--no-cooler", "-S", "SEED=1"]);
        apply_run_overrides(&mut params, &args).unwrap();
        assert_eq!(params.optional_u64(keys::SEED).unwrap(), Some(9));
        assert!(!params.bool_or(keys::USE_MC_COOLER, true).unwrap());
        assert!(!params.contains(keys::USE_MC_HEATER));
    }

    #[test]
    fn load_parameters_reads_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        fs::write(&path, "DIMENSIONS = [2, 2]\nEPSILON_0 = 1.0\n").unwrap();
        let params = load_parameters(&path).unwrap();
        assert_eq!(params.usize_list(keys::DIMENSIONS).unwrap(), vec![2, 2]);
    }

    #[test]
    fn malformed_model_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "DIMENSIONS = [").unwrap();
        match load_parameters(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_model_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_parameters(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[test]
    fn relative_outputs_move_under_output_dir() {
        let mut output = OutputConfig {
            cooling_aviz_prefix: "/abs/cool_".to_string(),
            ..OutputConfig::default()
        };
        relocate_outputs(&mut output, Path::new("/runs/a"));
        assert_eq!(output.cooling_aviz_prefix, "/abs/cool_");
        assert!(output.heating_aviz_prefix.starts_with("/runs/a/"));
        assert_eq!(output.repository_location, "/runs/a/states");
    }
}
