//! Entity handles.
//!
//! An [`Entity`] never points into level storage. It names a level, an
//! orientation component and a global index tuple, and is resolved against
//! the owning [`GridLevel`](crate::grid::level::GridLevel) on demand, so
//! levels can be pushed, popped and moved freely.

use crate::topology::shift::Shift;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entity<const D: usize> {
    pub level: usize,
    pub codim: usize,
    /// Orientation component within the codimension.
    pub component: usize,
    pub shift: Shift,
    /// Global index tuple on `level`.
    pub coord: [i64; D],
}

impl<const D: usize> Entity<D> {
    /// Dimension of the entity itself.
    #[inline]
    pub fn dim(&self) -> usize {
        D - self.codim
    }
}
