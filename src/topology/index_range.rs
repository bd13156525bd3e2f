//! Axis-aligned integer boxes in a global index space.
//!
//! An [`IndexRange`] is the basic building block of a grid level: every
//! partition family (interior, interior+border, overlap, overlap+front) and
//! every neighbor intersection is one such box per entity orientation.
//! Indices are global (finest-level-of-this-level) entity indices and may be
//! negative or exceed the global extent when a box has been moved across a
//! periodic boundary.
//!
//! Iteration order is lexicographic with axis 0 running fastest. Gather and
//! scatter passes rely on this order being identical on every process.

use crate::topology::shift::Shift;
use std::fmt;

/// Origin and extent per axis, plus the orientation of the entities covered.
///
/// Invariant: `size[i] >= 0`; the range is empty iff some `size[i] == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange<const D: usize> {
    origin: [i64; D],
    size: [i64; D],
    shift: Shift,
}

impl<const D: usize> Default for IndexRange<D> {
    fn default() -> Self {
        Self::empty(Shift::default())
    }
}

impl<const D: usize> IndexRange<D> {
    /// Build a range; negative extents are clamped to zero.
    pub fn new(origin: [i64; D], size: [i64; D], shift: Shift) -> Self {
        Self {
            origin,
            size: size.map(|s| s.max(0)),
            shift,
        }
    }

    /// The empty range with the given orientation.
    pub fn empty(shift: Shift) -> Self {
        Self {
            origin: [0; D],
            size: [0; D],
            shift,
        }
    }

    #[inline]
    pub fn origin(&self) -> [i64; D] {
        self.origin
    }

    #[inline]
    pub fn size(&self) -> [i64; D] {
        self.size
    }

    #[inline]
    pub fn shift(&self) -> Shift {
        self.shift
    }

    /// Last index covered along `axis` (`origin - 1` when empty).
    #[inline]
    pub fn max(&self, axis: usize) -> i64 {
        self.origin[axis] + self.size[axis] - 1
    }

    /// One past the last index along `axis`.
    #[inline]
    pub fn end(&self, axis: usize) -> i64 {
        self.origin[axis] + self.size[axis]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size.iter().any(|&s| s == 0)
    }

    /// Number of entities covered.
    pub fn total_size(&self) -> usize {
        self.size.iter().map(|&s| s as usize).product()
    }

    /// Translated copy; used to express a neighbor's box across a periodic wrap.
    pub fn move_by(&self, displacement: &[i64; D]) -> Self {
        let mut origin = self.origin;
        for (o, d) in origin.iter_mut().zip(displacement) {
            *o += d;
        }
        Self {
            origin,
            size: self.size,
            shift: self.shift,
        }
    }

    /// Component-wise overlap with `other`. Keeps the orientation of `self`.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut origin = [0; D];
        let mut size = [0; D];
        for i in 0..D {
            let lo = self.origin[i].max(other.origin[i]);
            let hi = self.end(i).min(other.end(i));
            origin[i] = lo;
            size[i] = (hi - lo).max(0);
        }
        Self {
            origin,
            size,
            shift: self.shift,
        }
    }

    pub fn contains(&self, coord: &[i64; D]) -> bool {
        (0..D).all(|i| coord[i] >= self.origin[i] && coord[i] < self.end(i))
    }

    /// Position of `coord` in iteration order, if covered.
    pub fn linear_index(&self, coord: &[i64; D]) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let mut index = 0usize;
        let mut stride = 1usize;
        for i in 0..D {
            index += (coord[i] - self.origin[i]) as usize * stride;
            stride *= self.size[i] as usize;
        }
        Some(index)
    }

    /// Iterate all covered index tuples, axis 0 fastest.
    pub fn iter(&self) -> RangeIter<D> {
        RangeIter {
            range: *self,
            next: if self.is_empty() { None } else { Some(self.origin) },
        }
    }
}

impl<const D: usize> fmt::Display for IndexRange<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shift={} ", self.shift)?;
        for i in 0..D {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "[{},{})", self.origin[i], self.end(i))?;
        }
        Ok(())
    }
}

/// Lexicographic iterator over an [`IndexRange`].
#[derive(Clone, Debug)]
pub struct RangeIter<const D: usize> {
    range: IndexRange<D>,
    next: Option<[i64; D]>,
}

impl<const D: usize> Iterator for RangeIter<D> {
    type Item = [i64; D];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let mut succ = current;
        let mut axis = 0;
        loop {
            if axis == D {
                self.next = None;
                break;
            }
            succ[axis] += 1;
            if succ[axis] < self.range.end(axis) {
                self.next = Some(succ);
                break;
            }
            succ[axis] = self.range.origin[axis];
            axis += 1;
        }
        Some(current)
    }
}

impl<'a, const D: usize> IntoIterator for &'a IndexRange<D> {
    type Item = [i64; D];
    type IntoIter = RangeIter<D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
