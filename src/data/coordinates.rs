//! Coordinate containers of a structured grid level.
//!
//! A container maps local vertex indices along each axis to physical
//! coordinates. It covers exactly the cells stored on this process on one
//! level (interior plus overlap); local index 0 is the first vertex of the
//! overlap-front box.
//!
//! Two variants exist: [`EquidistantCoordinates`] with a constant mesh width
//! per axis, and [`TensorProductCoordinates`] with an arbitrary strictly
//! increasing coordinate vector per axis.

use crate::grid_error::GridError;
use std::fmt::Debug;

/// Coordinate lookup and refinement for one grid level.
pub trait CoordinateContainer<const D: usize>: Clone + Debug + Send + Sync {
    /// Number of cells along `axis`.
    fn size(&self, axis: usize) -> usize;

    /// Position of local vertex `i` (in `0..=size(axis)`) along `axis`.
    fn coordinate(&self, axis: usize, i: i64) -> f64;

    /// Width of local cell `i` along `axis`.
    fn meshsize(&self, axis: usize, i: i64) -> f64 {
        self.coordinate(axis, i + 1) - self.coordinate(axis, i)
    }

    /// Container of the next finer level.
    ///
    /// Every cell is bisected. When `keep_physical_overlap` is false the
    /// overlap keeps its cell count, so `overlap` cells are dropped on each
    /// side flagged in `overlap_low` / `overlap_up`.
    fn refine(
        &self,
        overlap_low: [bool; D],
        overlap_up: [bool; D],
        keep_physical_overlap: bool,
        overlap: usize,
    ) -> Self;
}

/// Constant mesh width per axis.
#[derive(Clone, Debug, PartialEq)]
pub struct EquidistantCoordinates<const D: usize> {
    origin: [f64; D],
    h: [f64; D],
    size: [usize; D],
}

impl<const D: usize> EquidistantCoordinates<D> {
    /// `origin` is the position of local vertex 0, `h` the mesh width and
    /// `size` the number of cells per axis.
    pub fn new(origin: [f64; D], h: [f64; D], size: [usize; D]) -> Self {
        Self { origin, h, size }
    }

    pub fn meshwidth(&self) -> [f64; D] {
        self.h
    }

    pub fn origin(&self) -> [f64; D] {
        self.origin
    }
}

impl<const D: usize> CoordinateContainer<D> for EquidistantCoordinates<D> {
    fn size(&self, axis: usize) -> usize {
        self.size[axis]
    }

    fn coordinate(&self, axis: usize, i: i64) -> f64 {
        self.origin[axis] + i as f64 * self.h[axis]
    }

    fn meshsize(&self, axis: usize, _i: i64) -> f64 {
        self.h[axis]
    }

    fn refine(
        &self,
        overlap_low: [bool; D],
        overlap_up: [bool; D],
        keep_physical_overlap: bool,
        overlap: usize,
    ) -> Self {
        let mut refined = self.clone();
        for i in 0..D {
            refined.h[i] = self.h[i] / 2.0;
            refined.size[i] = 2 * self.size[i];
            if !keep_physical_overlap {
                if overlap_low[i] {
                    refined.size[i] -= overlap;
                    refined.origin[i] += overlap as f64 * refined.h[i];
                }
                if overlap_up[i] {
                    refined.size[i] -= overlap;
                }
            }
        }
        refined
    }
}

/// Arbitrary strictly increasing coordinates per axis.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorProductCoordinates<const D: usize> {
    coords: [Vec<f64>; D],
    offset: [i64; D],
}

impl<const D: usize> TensorProductCoordinates<D> {
    /// `offset` is the global index of the first coordinate of each axis.
    pub fn try_new(coords: [Vec<f64>; D], offset: [i64; D]) -> Result<Self, GridError> {
        check_monotonic(&coords)?;
        Ok(Self { coords, offset })
    }

    pub fn offset(&self) -> [i64; D] {
        self.offset
    }

    pub fn axis(&self, axis: usize) -> &[f64] {
        &self.coords[axis]
    }
}

impl<const D: usize> CoordinateContainer<D> for TensorProductCoordinates<D> {
    fn size(&self, axis: usize) -> usize {
        self.coords[axis].len().saturating_sub(1)
    }

    fn coordinate(&self, axis: usize, i: i64) -> f64 {
        let c = &self.coords[axis];
        match usize::try_from(i) {
            Ok(i) if i < c.len() => c[i],
            // Outside the stored range: extrapolate with the boundary width.
            _ if c.len() >= 2 => {
                let n = c.len() as i64 - 1;
                if i < 0 {
                    c[0] + i as f64 * (c[1] - c[0])
                } else {
                    c[n as usize] + (i - n) as f64 * (c[n as usize] - c[n as usize - 1])
                }
            }
            _ => c.first().copied().unwrap_or(0.0),
        }
    }

    fn refine(
        &self,
        overlap_low: [bool; D],
        overlap_up: [bool; D],
        keep_physical_overlap: bool,
        overlap: usize,
    ) -> Self {
        let mut refined = self.clone();
        for i in 0..D {
            let old = &self.coords[i];
            let mut fine = Vec::with_capacity(2 * old.len());
            for w in old.windows(2) {
                fine.push(w[0]);
                fine.push(0.5 * (w[0] + w[1]));
            }
            if let Some(&last) = old.last() {
                fine.push(last);
            }
            let mut offset = 2 * self.offset[i];
            if !keep_physical_overlap {
                if overlap_low[i] {
                    fine.drain(..overlap.min(fine.len()));
                    offset += overlap as i64;
                }
                if overlap_up[i] {
                    fine.truncate(fine.len().saturating_sub(overlap));
                }
            }
            refined.coords[i] = fine;
            refined.offset[i] = offset;
        }
        refined
    }
}

/// Every axis needs at least two strictly increasing coordinates.
pub fn check_monotonic<const D: usize>(coords: &[Vec<f64>; D]) -> Result<(), GridError> {
    for (axis, c) in coords.iter().enumerate() {
        if c.len() < 2 {
            return Err(GridError::TooFewCoordinates { axis });
        }
        if c.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(GridError::NonMonotonicCoordinates { axis });
        }
    }
    Ok(())
}
