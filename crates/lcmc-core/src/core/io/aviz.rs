use crate::core::lattice::Lattice;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Particle type tag written in front of every record.
const PARTICLE_TYPE: &str = "LC";

#[derive(Debug, Error)]
pub enum AvizError {
    #[error("I/O error writing '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes the lattice as an AViz point cloud: the particle count, a comment
/// line, then one `LC x y z sx sy sz` record per cell. Coordinates and spins
/// of lattices with fewer than three axes are padded with zeros.
pub fn write_xyz<W: Write>(writer: &mut W, lattice: &Lattice, comment: &str) -> io::Result<()> {
    writeln!(writer, "{}", lattice.len())?;
    writeln!(writer, "{}", comment.replace('\n', " "))?;
    for (spin, location) in lattice.spins().iter().zip(lattice.locations()) {
        let [x, y, z] = pad3(location.as_slice());
        let [sx, sy, sz] = pad3(spin.as_slice());
        writeln!(
            writer,
            "{PARTICLE_TYPE} {x:.6} {y:.6} {z:.6} {sx:.6} {sy:.6} {sz:.6}"
        )?;
    }
    Ok(())
}

fn pad3(values: &[f64]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = *value;
    }
    out
}

/// Writes numbered snapshots `{prefix}{n:08}.xyz`, starting from zero.
#[derive(Debug)]
pub struct AvizWriter {
    prefix: String,
    next_index: usize,
}

impl AvizWriter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_index: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.next_index
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}{:08}.xyz", self.prefix, index))
    }

    pub fn write(&mut self, lattice: &Lattice, comment: &str) -> Result<PathBuf, AvizError> {
        let path = self.path_for(self.next_index);
        let io_err = |source| AvizError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut writer = BufWriter::new(File::create(&path).map_err(io_err)?);
        write_xyz(&mut writer, lattice, comment).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        self.next_index += 1;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::BoundaryCondition;
    use nalgebra::DVector;

    fn lattice_2d() -> Lattice {
        Lattice::new(
            vec![1, 2],
            vec![BoundaryCondition::Fixed; 2],
            vec![1.0, 1.0],
            vec![
                DVector::from_vec(vec![0.0, 1.0]),
                DVector::from_vec(vec![1.0, 0.0]),
            ],
            vec![DVector::zeros(2), DVector::from_vec(vec![0.0, 1.5])],
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn write_xyz_pads_two_dimensional_vectors() {
        let mut buffer = Vec::new();
        write_xyz(&mut buffer, &lattice_2d(), "T=2").unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "2");
        assert_eq!(lines[1], "T=2");
        assert_eq!(
            lines[3],
            "LC 0.000000 1.500000 0.000000 1.000000 0.000000 0.000000"
        );
    }

    #[test]
    fn write_xyz_keeps_comment_on_one_line() {
        let mut buffer = Vec::new();
        write_xyz(&mut buffer, &lattice_2d(), "a\nb").unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().nth(1), Some("a b"));
    }

    #[test]
    fn writer_numbers_files_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("run/heat_").to_string_lossy().into_owned();
        let mut writer = AvizWriter::new(prefix);
        let lattice = lattice_2d();

        let first = writer.write(&lattice, "first").unwrap();
        let second = writer.write(&lattice, "second").unwrap();

        assert!(first.ends_with("heat_00000000.xyz"));
        assert!(second.ends_with("heat_00000001.xyz"));
        assert!(second.exists());
        assert_eq!(writer.written(), 2);
    }
}
