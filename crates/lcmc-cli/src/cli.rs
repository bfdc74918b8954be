use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "LCMC Developers",
    version,
    about = "LCMC CLI - Metropolis Monte Carlo annealing of liquid-crystal director lattices.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Append logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anneal a lattice through the heating and cooling phases of a model file.
    Run(RunArgs),
    /// List the states in a model's repository, or summarize one of them.
    Inspect(InspectArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the model parameter file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Directory that relative snapshot and repository paths are resolved against.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override the random seed from the model file.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Start from a state stored in the repository instead of a fresh lattice.
    #[arg(long, value_name = "NAME")]
    pub from_state: Option<String>,

    /// Skip the heating phase, even if the model file enables it.
    #[arg(long)]
    pub no_heater: bool,

    /// Skip the cooling phase, even if the model file enables it.
    #[arg(long)]
    pub no_cooler: bool,

    /// Set a model parameter, overriding the model file.
    /// Can be used multiple times. Example: -S MC_COOLER_MAX_STEPS=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the model parameter file whose repository and geometry are used.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Name of the state to summarize. Lists all states when omitted.
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Directory that a relative repository location is resolved against.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Set a model parameter, overriding the model file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
