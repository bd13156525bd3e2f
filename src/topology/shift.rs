//! Entity orientation encoding for structured grids.
//!
//! Every entity of a `D`-dimensional Cartesian grid is spanned by a subset of
//! the unit vectors. A [`Shift`] stores that subset as a bitmask: bit `i` set
//! means the entity extends along axis `i` ("whole cell" direction), a clear
//! bit means the entity sits on a grid plane orthogonal to axis `i`.
//!
//! An entity of codimension `c` is spanned by exactly `D - c` unit vectors.
//! Within one codimension the orientations are enumerated in increasing
//! bitmask order, which fixes the component numbering used by every level,
//! index and communication list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitmask of the axes an entity extends along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shift(u32);

impl Shift {
    /// Wraps a raw bitmask.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Shift of a `dim`-dimensional cell (all axes set).
    #[inline]
    pub const fn cell(dim: usize) -> Self {
        Self(((1u64 << dim) - 1) as u32)
    }

    /// Shift of a vertex (no axis set).
    #[inline]
    pub const fn vertex() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Does the entity extend along `axis`?
    #[inline]
    pub const fn is_set(self, axis: usize) -> bool {
        (self.0 >> axis) & 1 == 1
    }

    /// Number of axes the entity extends along (its topological dimension).
    #[inline]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Codimension of the entity in a `dim`-dimensional grid.
    #[inline]
    pub const fn codim(self, dim: usize) -> usize {
        dim - self.count()
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// All orientations of codimension `codim` in a `dim`-dimensional grid,
/// in increasing bitmask order.
///
/// Returns an empty vector when `codim > dim`.
pub fn entity_shifts(dim: usize, codim: usize) -> Vec<Shift> {
    if codim > dim {
        return Vec::new();
    }
    (0..1u32 << dim)
        .map(Shift::from_bits)
        .filter(|s| s.count() == dim - codim)
        .collect()
}

/// Binomial coefficient `n choose k`; the number of orientations of
/// codimension `k` in an `n`-dimensional grid.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_in_2d() {
        // cells, edges (x-extended then y-extended), vertices
        assert_eq!(entity_shifts(2, 0), vec![Shift::from_bits(0b11)]);
        assert_eq!(
            entity_shifts(2, 1),
            vec![Shift::from_bits(0b01), Shift::from_bits(0b10)]
        );
        assert_eq!(entity_shifts(2, 2), vec![Shift::vertex()]);
        assert!(entity_shifts(2, 3).is_empty());
    }

    #[test]
    fn shift_counts_match_binomials() {
        for dim in 0..=4 {
            let mut total = 0;
            for codim in 0..=dim {
                let shifts = entity_shifts(dim, codim);
                assert_eq!(shifts.len(), binomial(dim, codim));
                assert!(shifts.iter().all(|s| s.codim(dim) == codim));
                total += shifts.len();
            }
            assert_eq!(total, 1 << dim);
        }
    }

    #[test]
    fn cell_shift_sets_every_axis() {
        let c = Shift::cell(3);
        assert!((0..3).all(|i| c.is_set(i)));
        assert_eq!(c.codim(3), 0);
        assert_eq!(Shift::vertex().codim(3), 3);
    }
}
