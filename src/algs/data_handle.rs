//! User callbacks of a halo exchange.
//!
//! A [`DataHandle`] decides which codimensions take part in an exchange,
//! how many values each entity carries, and how values are packed into and
//! unpacked from a [`MessageBuffer`]. Values are plain-old-data so they can
//! be shipped as raw bytes.

use crate::grid::entity::Entity;
use bytemuck::Pod;

/// Append-only buffer with a separate read cursor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageBuffer<T> {
    data: Vec<T>,
    read_pos: usize,
}

impl<T: Copy> MessageBuffer<T> {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            data: Vec::with_capacity(n),
            read_pos: 0,
        }
    }

    /// Wrap received values for reading.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data, read_pos: 0 }
    }

    #[inline]
    pub fn write(&mut self, value: T) {
        self.data.push(value);
    }

    /// Next unread value, or `None` once the buffer is drained.
    #[inline]
    pub fn read(&mut self) -> Option<T> {
        let v = self.data.get(self.read_pos).copied()?;
        self.read_pos += 1;
        Some(v)
    }

    /// Values written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

/// Packs and unpacks per-entity data for [`communicate`](crate::grid::yasp::YaspGrid::communicate).
pub trait DataHandle<const D: usize> {
    /// Unit of data on the wire.
    type Data: Pod;

    /// Whether entities of codimension `codim` in a `dim`-dimensional grid
    /// take part.
    fn contains(&self, dim: usize, codim: usize) -> bool;

    /// Whether every entity of `codim` carries the same number of values.
    /// Lets the exchange skip the size phase.
    fn fixed_size(&self, dim: usize, codim: usize) -> bool;

    /// Number of values `entity` carries.
    fn size(&self, entity: &Entity<D>) -> usize;

    /// Write exactly `size(entity)` values for `entity`.
    fn gather(&mut self, buf: &mut MessageBuffer<Self::Data>, entity: &Entity<D>);

    /// Read the `n` values received for `entity`.
    fn scatter(&mut self, buf: &mut MessageBuffer<Self::Data>, entity: &Entity<D>, n: usize);
}
