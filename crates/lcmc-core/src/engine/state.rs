use super::error::EngineError;
use crate::core::io::aviz::AvizWriter;
use crate::core::lattice::Lattice;
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

/// Summary of a lattice state adopted during annealing. One row of the
/// info log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRecord {
    pub phase: String,
    pub snapshot: usize,
    pub temperature: f64,
    pub energy: f64,
    pub variance: f64,
    /// Components of the average orientation, space separated.
    pub average_orientation: String,
}

impl StateRecord {
    pub fn describe(phase: &str, snapshot: usize, lattice: &Lattice, energy: f64) -> Self {
        let average_orientation = lattice
            .average_orientation()
            .iter()
            .map(|c| format!("{c:.6}"))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            phase: phase.to_string(),
            snapshot,
            temperature: lattice.temperature(),
            energy,
            variance: lattice.orientation_variance(),
            average_orientation,
        }
    }
}

/// Receives every state the annealing controller adopts.
pub trait SnapshotSink {
    fn emit(&mut self, lattice: &Lattice, record: &StateRecord) -> Result<(), EngineError>;

    /// Called once the phase is done.
    fn finish(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Writes each adopted state as a numbered AViz frame and appends its record
/// to `{prefix}info.csv`.
pub struct FileSnapshotSink {
    aviz: AvizWriter,
    info_path: PathBuf,
    info: Option<csv::Writer<File>>,
}

impl FileSnapshotSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            info_path: PathBuf::from(format!("{prefix}info.csv")),
            aviz: AvizWriter::new(prefix),
            info: None,
        }
    }

    pub fn info_path(&self) -> &PathBuf {
        &self.info_path
    }

    pub fn frames_written(&self) -> usize {
        self.aviz.written()
    }
}

impl SnapshotSink for FileSnapshotSink {
    fn emit(&mut self, lattice: &Lattice, record: &StateRecord) -> Result<(), EngineError> {
        let comment = format!(
            "phase={} T={} E={:e}",
            record.phase, record.temperature, record.energy
        );
        let path = self.aviz.write(lattice, &comment)?;
        debug!(path = %path.display(), snapshot = record.snapshot, "Wrote snapshot.");

        // The AViz write above has created the parent directory.
        if self.info.is_none() {
            self.info = Some(csv::Writer::from_path(&self.info_path)?);
        }
        if let Some(writer) = &mut self.info {
            writer.serialize(record)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        if let Some(writer) = &mut self.info {
            writer.flush().map_err(csv::Error::from)?;
        }
        Ok(())
    }
}

/// Keeps every record and adopted lattice in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<StateRecord>,
    pub lattices: Vec<Lattice>,
    pub finished: bool,
}

impl SnapshotSink for RecordingSink {
    fn emit(&mut self, lattice: &Lattice, record: &StateRecord) -> Result<(), EngineError> {
        self.records.push(record.clone());
        self.lattices.push(lattice.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        self.finished = true;
        Ok(())
    }
}
