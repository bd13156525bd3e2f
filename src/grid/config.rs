//! Serializable grid parameters.

use crate::grid_error::GridError;
use serde::{Deserialize, Serialize};

fn default_keep() -> bool {
    true
}

/// Parameters of an equidistant grid.
///
/// Per-axis values are vectors so one config type serves every dimension;
/// [`GridConfig::validate`] checks them against the grid's dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Physical extent of the domain per axis.
    pub lengths: Vec<f64>,
    /// Coarse cells per axis.
    pub cells: Vec<usize>,
    /// Periodic axes; empty means none.
    #[serde(default)]
    pub periodic: Vec<bool>,
    /// Ghost cell layers.
    #[serde(default)]
    pub overlap: usize,
    /// Double the overlap on refinement so it keeps its physical width.
    #[serde(default = "default_keep")]
    pub keep_physical_overlap: bool,
}

impl GridConfig {
    pub fn new(lengths: Vec<f64>, cells: Vec<usize>) -> Self {
        Self {
            lengths,
            cells,
            periodic: Vec::new(),
            overlap: 0,
            keep_physical_overlap: true,
        }
    }

    pub fn with_periodic(mut self, periodic: Vec<bool>) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_keep_physical_overlap(mut self, keep: bool) -> Self {
        self.keep_physical_overlap = keep;
        self
    }

    /// Check the config for a `D`-dimensional grid and return lengths,
    /// cells and periodicity as arrays.
    pub fn validate<const D: usize>(&self) -> Result<([f64; D], [usize; D], [bool; D]), GridError> {
        let lengths: [f64; D] = self.lengths.as_slice().try_into().map_err(|_| {
            GridError::InvalidConfig(format!(
                "expected {D} lengths, got {}",
                self.lengths.len()
            ))
        })?;
        let cells: [usize; D] = self.cells.as_slice().try_into().map_err(|_| {
            GridError::InvalidConfig(format!("expected {D} cell counts, got {}", self.cells.len()))
        })?;
        let periodic: [bool; D] = if self.periodic.is_empty() {
            [false; D]
        } else {
            self.periodic.as_slice().try_into().map_err(|_| {
                GridError::InvalidConfig(format!(
                    "expected {D} periodic flags, got {}",
                    self.periodic.len()
                ))
            })?
        };
        if let Some(axis) = (0..D).find(|&i| cells[i] == 0) {
            return Err(GridError::EmptyDomain { axis });
        }
        if let Some(axis) = (0..D).find(|&i| !(lengths[i] > 0.0)) {
            return Err(GridError::InvalidConfig(format!(
                "length along axis {axis} must be positive, got {}",
                lengths[axis]
            )));
        }
        Ok((lengths, cells, periodic))
    }
}
