use crate::core::lattice::builder::LatticeGeometry;
use crate::core::lattice::{Lattice, LatticeError};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("State '{0}' not found in repository")]
    NotFound(String),

    #[error("Invalid state name '{0}'")]
    InvalidName(String),

    #[error("State has dimensions {found:?} but the model expects {expected:?}")]
    DimensionMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Stored state does not form a valid lattice: {0}")]
    Lattice(#[from] LatticeError),
}

/// Everything about a lattice that changes during a run. Together with the
/// model's [`LatticeGeometry`] it reconstructs the lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeState {
    pub temperature: f64,
    pub dimensions: Vec<usize>,
    pub spins: Vec<Vec<f64>>,
    pub locations: Vec<Vec<f64>>,
}

impl LatticeState {
    pub fn capture(lattice: &Lattice) -> Self {
        let rows = |vectors: &[DVector<f64>]| -> Vec<Vec<f64>> {
            vectors.iter().map(|v| v.as_slice().to_vec()).collect()
        };
        Self {
            temperature: lattice.temperature(),
            dimensions: lattice.dimensions().to_vec(),
            spins: rows(lattice.spins()),
            locations: rows(lattice.locations()),
        }
    }

    pub fn restore(self, geometry: &LatticeGeometry) -> Result<Lattice, StateError> {
        if self.dimensions != geometry.dimensions {
            return Err(StateError::DimensionMismatch {
                expected: geometry.dimensions.clone(),
                found: self.dimensions,
            });
        }
        let to_vectors = |rows: Vec<Vec<f64>>| -> Vec<DVector<f64>> {
            rows.into_iter().map(DVector::from_vec).collect()
        };
        Ok(geometry.restore(
            self.temperature,
            to_vectors(self.spins),
            to_vectors(self.locations),
        )?)
    }
}

/// A directory of named lattice states stored as `<name>.<suffix>` TOML
/// files.
#[derive(Debug)]
pub struct StateRepository {
    root: PathBuf,
    suffix: String,
    states: BTreeMap<String, PathBuf>,
}

impl StateRepository {
    /// Opens (creating if needed) the repository directory and indexes the
    /// states already in it.
    pub fn open(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Result<Self, StateError> {
        let root = root.into();
        let suffix = suffix.into();
        let io_err = |source| StateError::Io {
            path: root.clone(),
            source,
        };
        fs::create_dir_all(&root).map_err(io_err)?;

        let mut states = BTreeMap::new();
        for entry in fs::read_dir(&root).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let matches_suffix = path.extension().and_then(|e| e.to_str()) == Some(suffix.as_str());
            if !path.is_file() || !matches_suffix {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                states.insert(name.to_string(), path.clone());
            }
        }
        info!(
            location = %root.display(),
            states = states.len(),
            "Opened state repository."
        );
        Ok(Self {
            root,
            suffix,
            states,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn load(&self, name: &str) -> Result<LatticeState, StateError> {
        let path = self
            .states
            .get(name)
            .ok_or_else(|| StateError::NotFound(name.to_string()))?;
        let text = fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })?;
        let state = toml::from_str(&text).map_err(|source| StateError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(name, path = %path.display(), "Loaded lattice state.");
        Ok(state)
    }

    /// Saves the lattice under `name`, replacing any existing state.
    pub fn save(&mut self, name: &str, lattice: &Lattice) -> Result<PathBuf, StateError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StateError::InvalidName(name.to_string()));
        }
        let path = self.root.join(format!("{}.{}", name, self.suffix));
        let text = toml::to_string(&LatticeState::capture(lattice))?;
        fs::write(&path, text).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })?;
        self.states.insert(name.to_string(), path.clone());
        info!(name, path = %path.display(), "Saved lattice state.");
        Ok(path)
    }
}
