use crate::error::{CliError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Maps `-q` and the `-v` count to the maximum level that is printed.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(CliError::Io)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(CliError::Io)
}

/// Installs the global subscriber. Successive runs sharing a `log_file`
/// append to it.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let file_layer = log_file
        .as_deref()
        .map(open_log_file)
        .transpose()?
        .map(|file| {
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
        });

    tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(file_layer)
        .init();

    Ok(())
}
